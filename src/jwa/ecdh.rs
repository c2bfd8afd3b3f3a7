//! # ECDH-ES
//!
//! Elliptic Curve Diffie-Hellman Ephemeral Static key agreement ([RFC7518]
//! section 4.6). The shared secret `Z` is the x-coordinate of the product
//! point for NIST curves and the raw X25519 output for `OKP` keys. `Z` is fed
//! to the Concat KDF to produce either the CEK (`ECDH-ES`) or a key
//! encryption key (`ECDH-ES+A*KW`).
//!
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use elliptic_curve::generic_array::typenum::Unsigned;
use elliptic_curve::generic_array::GenericArray;
use elliptic_curve::sec1::{EncodedPoint, FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, PublicKey, SecretKey};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::jwa::kdf;
use crate::jwk::{Curve, Jwk};

/// Derive a `key_len`-bit key from the agreement between `private` and
/// `public`, using `alg` and the `apu`/`apv` parameters of `header` as KDF
/// inputs.
///
/// # Errors
///
/// Returns [`Error::CurveMismatch`] when the keys are on different curves,
/// and a precondition error when either key is unusable.
pub fn agreement_key(
    key_len: usize, alg: &str, private: &Jwk, public: &Jwk, header: &Header,
) -> Result<Zeroizing<Vec<u8>>> {
    let z = shared_secret(private, public)?;
    let apu = header.bytes("apu")?.unwrap_or_default();
    let apv = header.bytes("apv")?.unwrap_or_default();

    kdf::concat_kdf(&z, alg, &apu, &apv, key_len)
}

/// Agree a key with `recipient` using a freshly generated ephemeral key pair.
/// Returns the derived key and the public part of the ephemeral key, to be
/// sent as `epk`.
pub(crate) fn ephemeral_agreement(
    key_len: usize, alg: &str, recipient: &Jwk, header: &Header,
) -> Result<(Zeroizing<Vec<u8>>, Jwk)> {
    let ephemeral = Jwk::generate_ec(recipient.crv()?)?;
    let key = agreement_key(key_len, alg, &ephemeral, recipient, header)?;
    Ok((key, ephemeral.to_public()))
}

/// Agree a key using the recipient's static private key and the `epk` header
/// parameter.
pub(crate) fn static_agreement(
    key_len: usize, alg: &str, private: &Jwk, header: &Header,
) -> Result<Zeroizing<Vec<u8>>> {
    let value = header.get("epk").ok_or_else(|| Error::MissingParameter("epk".into()))?;
    let epk =
        Jwk::from_value(value.clone()).map_err(|e| Error::invalid_param("epk", e.to_string()))?;

    let expected = private.crv()?;
    let found = epk.crv().map_err(|e| Error::invalid_param("epk", e.to_string()))?;
    if expected != found {
        return Err(Error::CurveMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    check_point(&epk).map_err(|e| Error::invalid_param("epk", e.to_string()))?;

    agreement_key(key_len, alg, private, &epk, header)
}

fn shared_secret(private: &Jwk, public: &Jwk) -> Result<Zeroizing<Vec<u8>>> {
    let curve = private.crv()?;
    let found = public.crv()?;
    if curve != found {
        return Err(Error::CurveMismatch { expected: curve.to_string(), found: found.to_string() });
    }
    if private.kty()? != curve.key_type() || public.kty()? != curve.key_type() {
        return Err(Error::InvalidKey(format!("`{curve}` requires `{}` keys", curve.key_type())));
    }

    match curve {
        Curve::P256 => ec_shared::<p256::NistP256>(private, public),
        Curve::P384 => ec_shared::<p384::NistP384>(private, public),
        Curve::P521 => ec_shared::<p521::NistP521>(private, public),
        Curve::X25519 => x25519_shared(private, public),
        Curve::X448 => Err(Error::Unavailable("X448 key agreement".into())),
        Curve::Ed25519 => Err(Error::InvalidKey("Ed25519 keys cannot be used for ECDH".into())),
    }
}

fn check_point(public: &Jwk) -> Result<()> {
    match public.crv()? {
        Curve::P256 => ec_public::<p256::NistP256>(public).map(|_| ()),
        Curve::P384 => ec_public::<p384::NistP384>(public).map(|_| ()),
        Curve::P521 => ec_public::<p521::NistP521>(public).map(|_| ()),
        Curve::X25519 => x25519_public(public).map(|_| ()),
        Curve::X448 => Err(Error::Unavailable("X448 key agreement".into())),
        Curve::Ed25519 => Err(Error::InvalidKey("Ed25519 keys cannot be used for ECDH".into())),
    }
}

fn ec_public<C>(jwk: &Jwk) -> Result<PublicKey<C>>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let x = jwk.decode("x")?;
    let y = jwk.decode("y")?;
    let size = FieldBytesSize::<C>::USIZE;
    if x.len() != size || y.len() != size {
        return Err(Error::InvalidKey(format!("coordinates must be {size} bytes")));
    }

    let point = EncodedPoint::<C>::from_affine_coordinates(
        GenericArray::from_slice(&x),
        GenericArray::from_slice(&y),
        false,
    );
    Option::<PublicKey<C>>::from(PublicKey::<C>::from_encoded_point(&point))
        .ok_or_else(|| Error::InvalidKey("point is not on the curve".into()))
}

fn ec_shared<C>(private: &Jwk, public: &Jwk) -> Result<Zeroizing<Vec<u8>>>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let public = ec_public::<C>(public)?;
    let d = Zeroizing::new(private.decode("d")?);
    let secret = SecretKey::<C>::from_slice(&d)
        .map_err(|_| Error::InvalidKey("invalid private scalar".into()))?;

    let shared =
        elliptic_curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
}

fn x25519_public(jwk: &Jwk) -> Result<x25519_dalek::PublicKey> {
    let x: [u8; 32] = jwk
        .decode("x")?
        .try_into()
        .map_err(|_| Error::InvalidKey("X25519 public key must be 32 bytes".into()))?;
    Ok(x25519_dalek::PublicKey::from(x))
}

fn x25519_shared(private: &Jwk, public: &Jwk) -> Result<Zeroizing<Vec<u8>>> {
    let public = x25519_public(public)?;
    let d: [u8; 32] = private
        .decode("d")?
        .try_into()
        .map_err(|_| Error::InvalidKey("X25519 private key must be 32 bytes".into()))?;
    let secret = x25519_dalek::StaticSecret::from(d);

    let shared = secret.diffie_hellman(&public);
    if !shared.was_contributory() {
        return Err(Error::InvalidKey("X25519 agreement produced a low-order result".into()));
    }
    Ok(Zeroizing::new(shared.as_bytes().to_vec()))
}

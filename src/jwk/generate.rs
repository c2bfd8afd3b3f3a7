//! Key generation helpers.

use base64ct::{Base64UrlUnpadded as Base64, Encoding};
use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::RsaPrivateKey;

use super::{Curve, Jwk, KeyType};
use crate::error::{Error, Result};

/// Smallest RSA modulus, in bits, the key factory will produce.
const MIN_RSA_BITS: usize = 2048;

impl Jwk {
    /// Generate a random symmetric key of `bits` length.
    ///
    /// # Errors
    ///
    /// Returns an error if `bits` is zero or not a multiple of 8.
    pub fn generate_oct(bits: usize) -> Result<Self> {
        if bits == 0 || bits % 8 != 0 {
            return Err(Error::InvalidKey(format!("invalid key size: {bits} bits")));
        }
        let mut secret = vec![0u8; bits / 8];
        OsRng.fill_bytes(&mut secret);
        Ok(Self::oct(&secret))
    }

    /// Generate an elliptic curve key pair.
    ///
    /// # Errors
    ///
    /// Returns an error for curves that cannot be generated by this crate.
    pub fn generate_ec(curve: Curve) -> Result<Self> {
        match curve {
            Curve::P256 => Ok(generate_ec::<p256::NistP256>(curve)),
            Curve::P384 => Ok(generate_ec::<p384::NistP384>(curve)),
            Curve::P521 => Ok(generate_ec::<p521::NistP521>(curve)),
            Curve::X25519 => Ok(Self::generate_x25519()),
            Curve::X448 => Err(Error::Unavailable("X448 key generation".into())),
            Curve::Ed25519 => Err(Error::InvalidKey("Ed25519 keys are for signing".into())),
        }
    }

    /// Generate an X25519 key pair.
    #[must_use]
    pub fn generate_x25519() -> Self {
        let secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
        let public = x25519_dalek::PublicKey::from(&secret);
        Self::default()
            .with("kty", KeyType::Okp.as_str())
            .with("crv", Curve::X25519.as_str())
            .with("x", Base64::encode_string(public.as_bytes()))
            .with("d", Base64::encode_string(secret.as_bytes()))
    }

    /// Generate an RSA key pair with a modulus of `bits` length.
    ///
    /// # Errors
    ///
    /// Returns an error if `bits` is below 2048 or generation fails.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_BITS {
            return Err(Error::InvalidKey(format!("RSA keys must be at least {MIN_RSA_BITS} bits")));
        }
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| Error::InvalidKey(format!("issue generating RSA key: {e}")))?;
        let primes = key.primes();
        if primes.len() != 2 {
            return Err(Error::InvalidKey("unexpected number of RSA primes".into()));
        }

        Ok(Self::default()
            .with("kty", KeyType::Rsa.as_str())
            .with("n", Base64::encode_string(&key.n().to_bytes_be()))
            .with("e", Base64::encode_string(&key.e().to_bytes_be()))
            .with("d", Base64::encode_string(&key.d().to_bytes_be()))
            .with("p", Base64::encode_string(&primes[0].to_bytes_be()))
            .with("q", Base64::encode_string(&primes[1].to_bytes_be())))
    }

    /// Build a public `EC` or `OKP` key from raw coordinates.
    pub(crate) fn from_coordinates(curve: Curve, x: &[u8], y: Option<&[u8]>) -> Self {
        let jwk = Self::default()
            .with("kty", curve.key_type().as_str())
            .with("crv", curve.as_str())
            .with("x", Base64::encode_string(x));
        match y {
            Some(y) => jwk.with("y", Base64::encode_string(y)),
            None => jwk,
        }
    }
}

fn generate_ec<C>(curve: Curve) -> Jwk
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let secret = SecretKey::<C>::random(&mut OsRng);
    let point = secret.public_key().to_encoded_point(false);
    let x = point.x().map(|x| x.to_vec()).unwrap_or_default();
    let y = point.y().map(|y| y.to_vec()).unwrap_or_default();

    Jwk::from_coordinates(curve, &x, Some(&y))
        .with("d", Base64::encode_string(&secret.to_bytes()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generates_ec_keys() {
        for curve in [Curve::P256, Curve::P384, Curve::P521] {
            let jwk = Jwk::generate_ec(curve).expect("should generate");
            assert_eq!(jwk.crv().expect("curve"), curve);
            assert_eq!(jwk.kty().expect("kty"), KeyType::Ec);
            assert!(jwk.is_private());
            assert!(jwk.has("y"));
        }
    }

    #[test]
    fn generates_x25519() {
        let jwk = Jwk::generate_ec(Curve::X25519).expect("should generate");
        assert_eq!(jwk.kty().expect("kty"), KeyType::Okp);
        assert_eq!(jwk.decode("x").expect("x").len(), 32);
        assert_eq!(jwk.decode("d").expect("d").len(), 32);
    }

    #[test]
    fn rejects_unsupported() {
        assert!(matches!(Jwk::generate_ec(Curve::X448), Err(Error::Unavailable(_))));
        assert!(Jwk::generate_oct(0).is_err());
        assert!(Jwk::generate_oct(12).is_err());
        assert!(Jwk::generate_rsa(1024).is_err());
    }

    #[test]
    fn generates_oct() {
        let jwk = Jwk::generate_oct(256).expect("should generate");
        assert_eq!(jwk.decode("k").expect("k").len(), 32);
    }
}

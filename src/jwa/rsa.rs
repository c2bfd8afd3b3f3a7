//! # RSA Key Encryption
//!
//! `RSA1_5` (RSAES-PKCS1-v1_5), `RSA-OAEP` (SHA-1, MGF1 with SHA-1) and
//! `RSA-OAEP-256` (SHA-256, MGF1 with SHA-256) from [RFC7518] sections 4.2 and
//! 4.3.
//!
//! Decryption failures are not reported directly. A random CEK of the
//! expected size is returned instead so that the failure surfaces as a
//! content authentication error, indistinguishable from any other
//! ([RFC7516] section 11.5).
//!
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use rand::rngs::OsRng;
use rsa::{BigUint, Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::jwa::random_bytes;
use crate::jwk::Jwk;

/// RSA encryption padding schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Padding {
    Pkcs1v15,
    OaepSha1,
    OaepSha256,
}

/// Encrypt `cek` to the RSA public key `jwk`.
pub(crate) fn encrypt(padding: Padding, jwk: &Jwk, cek: &[u8]) -> Result<Vec<u8>> {
    let key = public_key(jwk)?;
    let encrypted = match padding {
        Padding::Pkcs1v15 => key.encrypt(&mut OsRng, Pkcs1v15Encrypt, cek),
        Padding::OaepSha1 => key.encrypt(&mut OsRng, Oaep::new::<Sha1>(), cek),
        Padding::OaepSha256 => key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), cek),
    };
    encrypted.map_err(|e| Error::InvalidKey(format!("issue encrypting key: {e}")))
}

/// Decrypt `encrypted_key` with the RSA private key `jwk`.
///
/// When decryption fails, or the result is not `cek_len` bytes, a random
/// value of `cek_len` bytes is returned.
pub(crate) fn decrypt(
    padding: Padding, jwk: &Jwk, encrypted_key: &[u8], cek_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let key = private_key(jwk)?;

    // generated before decrypting so both paths do the same work
    let fallback = Zeroizing::new(random_bytes(cek_len));
    let decrypted = match padding {
        Padding::Pkcs1v15 => key.decrypt(Pkcs1v15Encrypt, encrypted_key),
        Padding::OaepSha1 => key.decrypt(Oaep::new::<Sha1>(), encrypted_key),
        Padding::OaepSha256 => key.decrypt(Oaep::new::<Sha256>(), encrypted_key),
    };

    match decrypted {
        Ok(cek) if cek.len() == cek_len => Ok(Zeroizing::new(cek)),
        _ => {
            tracing::debug!("RSA key decryption failed, substituting a random CEK");
            Ok(fallback)
        }
    }
}

fn public_key(jwk: &Jwk) -> Result<RsaPublicKey> {
    let n = BigUint::from_bytes_be(&jwk.decode("n")?);
    let e = BigUint::from_bytes_be(&jwk.decode("e")?);
    RsaPublicKey::new(n, e).map_err(|e| Error::InvalidKey(format!("invalid RSA public key: {e}")))
}

fn private_key(jwk: &Jwk) -> Result<RsaPrivateKey> {
    let n = BigUint::from_bytes_be(&jwk.decode("n")?);
    let e = BigUint::from_bytes_be(&jwk.decode("e")?);
    let d = BigUint::from_bytes_be(&Zeroizing::new(jwk.decode("d")?));

    // primes are optional in a JWK; without them the key is recovered from
    // n, e and d
    let primes = match (jwk.has("p"), jwk.has("q")) {
        (true, true) => vec![
            BigUint::from_bytes_be(&Zeroizing::new(jwk.decode("p")?)),
            BigUint::from_bytes_be(&Zeroizing::new(jwk.decode("q")?)),
        ],
        _ => vec![],
    };

    let key = RsaPrivateKey::from_components(n, e, d, primes)
        .map_err(|e| Error::InvalidKey(format!("invalid RSA private key: {e}")))?;
    key.validate().map_err(|e| Error::InvalidKey(format!("invalid RSA private key: {e}")))?;
    Ok(key)
}

#[cfg(test)]
mod test {
    use super::*;

    fn rsa_key() -> Jwk {
        Jwk::from_json(include_str!("../../tests/data/rsa_2048.json")).expect("should parse")
    }

    #[test]
    fn round_trip() {
        let key = rsa_key();
        for padding in [Padding::Pkcs1v15, Padding::OaepSha1, Padding::OaepSha256] {
            let encrypted = encrypt(padding, &key.to_public(), &[4u8; 32]).expect("should encrypt");
            assert_eq!(encrypted.len(), 256);

            let cek = decrypt(padding, &key, &encrypted, 32).expect("should decrypt");
            assert_eq!(*cek, [4u8; 32]);
        }
    }

    #[test]
    fn failure_substitutes_random_cek() {
        let key = rsa_key();
        let encrypted =
            encrypt(Padding::OaepSha256, &key.to_public(), &[4u8; 32]).expect("encrypt");

        // wrong padding
        let cek = decrypt(Padding::OaepSha1, &key, &encrypted, 32).expect("should not error");
        assert_eq!(cek.len(), 32);
        assert_ne!(*cek, [4u8; 32]);

        // wrong length
        let cek = decrypt(Padding::OaepSha256, &key, &encrypted, 16).expect("should not error");
        assert_eq!(cek.len(), 16);
    }

    #[test]
    fn requires_private_key() {
        let key = rsa_key().to_public();
        assert!(matches!(
            decrypt(Padding::Pkcs1v15, &key, &[0u8; 256], 32),
            Err(Error::InvalidKey(_))
        ));
    }
}

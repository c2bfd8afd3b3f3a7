//! # HMAC
//!
//! HMAC with SHA-2 backs the `HS*` MAC algorithms, the AES-CBC-HMAC content
//! encryption algorithms, and PBES2 key derivation.

use std::fmt::{self, Display};
use std::str::FromStr;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::{Error, Result};
use crate::jwk::{Jwk, KeyType};

/// SHA-2 hash functions used with HMAC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Hash {
    Sha256,
    Sha384,
    Sha512,
}

impl Hash {
    /// HMAC output size in bytes.
    pub(crate) const fn output_size(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Compute `HMAC(key, data)`.
    pub(crate) fn hmac(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let tag = match self {
            Self::Sha256 => {
                let mut mac = hmac_key::<Hmac<Sha256>>(key)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Self::Sha384 => {
                let mut mac = hmac_key::<Hmac<Sha384>>(key)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Self::Sha512 => {
                let mut mac = hmac_key::<Hmac<Sha512>>(key)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        };
        Ok(tag)
    }

    /// Verify, in constant time, that `tag` equals the leftmost `tag.len()`
    /// bytes of `HMAC(key, data)`. Callers check the tag length.
    pub(crate) fn verify_truncated(self, key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
        let verified = match self {
            Self::Sha256 => {
                let mut mac = hmac_key::<Hmac<Sha256>>(key)?;
                mac.update(data);
                mac.verify_truncated_left(tag).is_ok()
            }
            Self::Sha384 => {
                let mut mac = hmac_key::<Hmac<Sha384>>(key)?;
                mac.update(data);
                mac.verify_truncated_left(tag).is_ok()
            }
            Self::Sha512 => {
                let mut mac = hmac_key::<Hmac<Sha512>>(key)?;
                mac.update(data);
                mac.verify_truncated_left(tag).is_ok()
            }
        };
        Ok(verified)
    }

    /// PBKDF2 with HMAC using this hash, writing `out.len()` bytes.
    pub(crate) fn pbkdf2(self, password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) {
        match self {
            Self::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, rounds, out),
            Self::Sha384 => pbkdf2::pbkdf2_hmac::<Sha384>(password, salt, rounds, out),
            Self::Sha512 => pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, rounds, out),
        }
    }
}

fn hmac_key<M: Mac + hmac::digest::KeyInit>(key: &[u8]) -> Result<M> {
    <M as Mac>::new_from_slice(key).map_err(|e| Error::InvalidKey(format!("invalid HMAC key: {e}")))
}

/// HMAC-based JWS algorithms.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// HMAC using SHA-256
    #[serde(rename = "HS256")]
    Hs256,

    /// HMAC using SHA-384
    #[serde(rename = "HS384")]
    Hs384,

    /// HMAC using SHA-512
    #[serde(rename = "HS512")]
    Hs512,
}

impl SignatureAlgorithm {
    /// All supported signature algorithms.
    pub const ALL: [Self; 3] = [Self::Hs256, Self::Hs384, Self::Hs512];

    /// The algorithm identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    const fn hash(self) -> Hash {
        match self {
            Self::Hs256 => Hash::Sha256,
            Self::Hs384 => Hash::Sha384,
            Self::Hs512 => Hash::Sha512,
        }
    }

    /// Compute the MAC of `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is not a usable `oct` key.
    pub fn sign(self, key: &Jwk, data: &[u8]) -> Result<Vec<u8>> {
        let secret = self.secret(key)?;
        self.hash().hmac(&secret, data)
    }

    /// Verify the MAC of `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is not a usable `oct` key.
    pub fn verify(self, key: &Jwk, data: &[u8], signature: &[u8]) -> Result<bool> {
        let secret = self.secret(key)?;
        if signature.len() != self.hash().output_size() {
            return Ok(false);
        }
        self.hash().verify_truncated(&secret, data, signature)
    }

    fn secret(self, key: &Jwk) -> Result<Vec<u8>> {
        if key.kty()? != KeyType::Oct {
            return Err(Error::InvalidKey(format!("{} requires an `oct` key", self.name())));
        }
        if key.key_use() == Some("enc") {
            return Err(Error::InvalidKey("key is intended for encryption".into()));
        }
        if let Some(alg) = key.alg() {
            if alg != self.name() {
                return Err(Error::InvalidKey(format!("key is restricted to `{alg}`")));
            }
        }
        key.decode("k")
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| Error::UnsupportedAlgorithm(s.to_string()))
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

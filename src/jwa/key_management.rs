//! # Key Management
//!
//! Algorithms that determine the Content Encryption Key (CEK) for each
//! recipient ([RFC7518] section 4). Every algorithm employs exactly one of
//! four modes:
//!
//! - Direct Encryption: the shared symmetric key is the CEK.
//! - Key Wrapping: a random CEK is wrapped with a symmetric key, or with a
//!   key derived by key agreement (`ECDH-ES+A*KW`).
//! - Key Encryption: a random CEK is encrypted to an RSA public key.
//! - Key Agreement: the CEK is derived with ECDH-ES.
//!
//! Operations that write header parameters (`epk`, `iv`, `tag`, `p2s`,
//! `p2c`) return them as a separate [`Header`] of additions for the caller to
//! place.
//!
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::jwa::content::ContentEncryptionAlgorithm;
use crate::jwa::mac::Hash;
use crate::jwa::rsa::{self, Padding};
use crate::jwa::{ecdh, wrap};
use crate::jwk::{Jwk, KeyType};

/// The strategy by which a key management algorithm establishes the CEK.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeyManagementMode {
    /// The shared symmetric key is used directly as the CEK.
    Direct,

    /// A random CEK is wrapped with a symmetric key.
    KeyWrapping,

    /// A random CEK is encrypted to an asymmetric key.
    KeyEncryption,

    /// The CEK is derived by key agreement.
    KeyAgreement,
}

impl KeyManagementMode {
    /// Whether recipients using `self` and `other` can share one message.
    /// Only modes that transport a randomly generated CEK can be mixed.
    #[must_use]
    pub const fn is_compatible_with(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::KeyWrapping | Self::KeyEncryption, Self::KeyWrapping | Self::KeyEncryption)
        )
    }

    /// Whether the mode establishes the CEK itself rather than transporting
    /// a random one.
    #[must_use]
    pub const fn determines_cek(self) -> bool {
        matches!(self, Self::Direct | Self::KeyAgreement)
    }

    /// Resolve the single mode shared by every recipient of a message.
    ///
    /// # Errors
    ///
    /// Returns an error when `modes` is empty or contains a pair of modes
    /// that cannot be combined.
    pub fn resolve(modes: &[Self]) -> Result<Self> {
        let (&first, rest) =
            modes.split_first().ok_or_else(|| Error::InvalidInput("no recipients".into()))?;

        for &mode in rest {
            if !first.is_compatible_with(mode) {
                if first == mode {
                    return Err(Error::SingleRecipient(mode));
                }
                return Err(Error::IncompatibleModes(first, mode));
            }
        }
        Ok(first)
    }
}

impl Display for KeyManagementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Direct => "direct",
            Self::KeyWrapping => "key wrapping",
            Self::KeyEncryption => "key encryption",
            Self::KeyAgreement => "key agreement",
        };
        f.write_str(name)
    }
}

/// The key operation a key is being checked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOperation {
    /// Establishing or transporting the CEK for a recipient.
    Encrypt,

    /// Recovering the CEK as a recipient.
    Decrypt,
}

impl KeyOperation {
    /// `key_ops` values that permit the operation.
    const fn permitted(self) -> [&'static str; 3] {
        match self {
            Self::Encrypt => ["encrypt", "wrapKey", "deriveKey"],
            Self::Decrypt => ["decrypt", "unwrapKey", "deriveKey"],
        }
    }
}

/// Algorithm used to encrypt, or determine, the value of the CEK.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeyManagementAlgorithm {
    /// Direct use of a shared symmetric key as the CEK.
    #[serde(rename = "dir")]
    Dir,

    /// AES Key Wrap using a 128-bit key.
    #[serde(rename = "A128KW")]
    A128Kw,

    /// AES Key Wrap using a 192-bit key.
    #[serde(rename = "A192KW")]
    A192Kw,

    /// AES Key Wrap using a 256-bit key.
    #[serde(rename = "A256KW")]
    A256Kw,

    /// Key wrapping with AES-GCM using a 128-bit key.
    #[serde(rename = "A128GCMKW")]
    A128GcmKw,

    /// Key wrapping with AES-GCM using a 192-bit key.
    #[serde(rename = "A192GCMKW")]
    A192GcmKw,

    /// Key wrapping with AES-GCM using a 256-bit key.
    #[serde(rename = "A256GCMKW")]
    A256GcmKw,

    /// PBES2 with HMAC SHA-256 and A128KW wrapping.
    #[serde(rename = "PBES2-HS256+A128KW")]
    Pbes2Hs256A128Kw,

    /// PBES2 with HMAC SHA-384 and A192KW wrapping.
    #[serde(rename = "PBES2-HS384+A192KW")]
    Pbes2Hs384A192Kw,

    /// PBES2 with HMAC SHA-512 and A256KW wrapping.
    #[serde(rename = "PBES2-HS512+A256KW")]
    Pbes2Hs512A256Kw,

    /// RSAES-PKCS1-v1_5.
    #[serde(rename = "RSA1_5")]
    Rsa1_5,

    /// RSAES OAEP using default parameters.
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,

    /// RSAES OAEP using SHA-256 and MGF1 with SHA-256.
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaep256,

    /// Elliptic Curve Diffie-Hellman Ephemeral Static key agreement using
    /// Concat KDF.
    #[serde(rename = "ECDH-ES")]
    EcdhEs,

    /// ECDH-ES using Concat KDF and CEK wrapped with A128KW.
    #[serde(rename = "ECDH-ES+A128KW")]
    EcdhEsA128Kw,

    /// ECDH-ES using Concat KDF and CEK wrapped with A192KW.
    #[serde(rename = "ECDH-ES+A192KW")]
    EcdhEsA192Kw,

    /// ECDH-ES using Concat KDF and CEK wrapped with A256KW.
    #[serde(rename = "ECDH-ES+A256KW")]
    EcdhEsA256Kw,
}

impl KeyManagementAlgorithm {
    /// All supported key management algorithms.
    pub const ALL: [Self; 17] = [
        Self::Dir,
        Self::A128Kw,
        Self::A192Kw,
        Self::A256Kw,
        Self::A128GcmKw,
        Self::A192GcmKw,
        Self::A256GcmKw,
        Self::Pbes2Hs256A128Kw,
        Self::Pbes2Hs384A192Kw,
        Self::Pbes2Hs512A256Kw,
        Self::Rsa1_5,
        Self::RsaOaep,
        Self::RsaOaep256,
        Self::EcdhEs,
        Self::EcdhEsA128Kw,
        Self::EcdhEsA192Kw,
        Self::EcdhEsA256Kw,
    ];

    /// The algorithm identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::A128Kw => "A128KW",
            Self::A192Kw => "A192KW",
            Self::A256Kw => "A256KW",
            Self::A128GcmKw => "A128GCMKW",
            Self::A192GcmKw => "A192GCMKW",
            Self::A256GcmKw => "A256GCMKW",
            Self::Pbes2Hs256A128Kw => "PBES2-HS256+A128KW",
            Self::Pbes2Hs384A192Kw => "PBES2-HS384+A192KW",
            Self::Pbes2Hs512A256Kw => "PBES2-HS512+A256KW",
            Self::Rsa1_5 => "RSA1_5",
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaOaep256 => "RSA-OAEP-256",
            Self::EcdhEs => "ECDH-ES",
            Self::EcdhEsA128Kw => "ECDH-ES+A128KW",
            Self::EcdhEsA192Kw => "ECDH-ES+A192KW",
            Self::EcdhEsA256Kw => "ECDH-ES+A256KW",
        }
    }

    /// The key management mode the algorithm employs.
    ///
    /// `ECDH-ES+A*KW` reports [`KeyManagementMode::KeyWrapping`]: the agreed
    /// key only wraps a random CEK.
    #[must_use]
    pub const fn mode(self) -> KeyManagementMode {
        match self {
            Self::Dir => KeyManagementMode::Direct,
            Self::Rsa1_5 | Self::RsaOaep | Self::RsaOaep256 => KeyManagementMode::KeyEncryption,
            Self::EcdhEs => KeyManagementMode::KeyAgreement,
            _ => KeyManagementMode::KeyWrapping,
        }
    }

    /// Key types usable with the algorithm.
    #[must_use]
    pub const fn key_types(self) -> &'static [KeyType] {
        match self {
            Self::Rsa1_5 | Self::RsaOaep | Self::RsaOaep256 => &[KeyType::Rsa],
            Self::EcdhEs | Self::EcdhEsA128Kw | Self::EcdhEsA192Kw | Self::EcdhEsA256Kw => {
                &[KeyType::Ec, KeyType::Okp]
            }
            _ => &[KeyType::Oct],
        }
    }

    /// Size in bits of the AES key wrapping key, for algorithms that wrap.
    const fn kek_size(self) -> Option<usize> {
        match self {
            Self::A128Kw
            | Self::A128GcmKw
            | Self::Pbes2Hs256A128Kw
            | Self::EcdhEsA128Kw => Some(128),
            Self::A192Kw
            | Self::A192GcmKw
            | Self::Pbes2Hs384A192Kw
            | Self::EcdhEsA192Kw => Some(192),
            Self::A256Kw
            | Self::A256GcmKw
            | Self::Pbes2Hs512A256Kw
            | Self::EcdhEsA256Kw => Some(256),
            _ => None,
        }
    }

    const fn pbes2_hash(self) -> Option<Hash> {
        match self {
            Self::Pbes2Hs256A128Kw => Some(Hash::Sha256),
            Self::Pbes2Hs384A192Kw => Some(Hash::Sha384),
            Self::Pbes2Hs512A256Kw => Some(Hash::Sha512),
            _ => None,
        }
    }

    const fn rsa_padding(self) -> Option<Padding> {
        match self {
            Self::Rsa1_5 => Some(Padding::Pkcs1v15),
            Self::RsaOaep => Some(Padding::OaepSha1),
            Self::RsaOaep256 => Some(Padding::OaepSha256),
            _ => None,
        }
    }

    /// Check that `key` may be used with this algorithm for `op`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] describing the first violated
    /// constraint.
    pub fn check_key(self, key: &Jwk, op: KeyOperation) -> Result<()> {
        let kty = key.kty()?;
        if !self.key_types().contains(&kty) {
            return Err(Error::InvalidKey(format!("`{kty}` keys cannot be used with {self}")));
        }
        if key.key_use() == Some("sig") {
            return Err(Error::InvalidKey("key is intended for signing".into()));
        }
        if let Some(alg) = key.alg() {
            if alg != self.name() {
                return Err(Error::InvalidKey(format!("key is restricted to `{alg}`")));
            }
        }
        if let Some(ops) = key.key_ops()? {
            if !op.permitted().iter().any(|p| ops.contains(p)) {
                return Err(Error::InvalidKey(format!("`key_ops` does not permit {op:?}")));
            }
        }
        if (kty == KeyType::Oct || op == KeyOperation::Decrypt) && !key.is_private() {
            return Err(Error::InvalidKey("a private key is required".into()));
        }
        Ok(())
    }

    /// Determine the CEK for algorithms in the
    /// [`Direct`](KeyManagementMode::Direct) and
    /// [`KeyAgreement`](KeyManagementMode::KeyAgreement) modes. Returns the
    /// CEK and any header additions.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm transports a random CEK instead, or
    /// the key is unsuitable.
    pub fn determine_cek(
        self, key: &Jwk, enc: ContentEncryptionAlgorithm, header: &Header,
    ) -> Result<(Zeroizing<Vec<u8>>, Header)> {
        self.check_key(key, KeyOperation::Encrypt)?;

        match self {
            Self::Dir => Ok((direct_key(key, enc)?, Header::new())),
            Self::EcdhEs => {
                let (cek, epk) =
                    ecdh::ephemeral_agreement(enc.cek_size(), enc.name(), key, header)?;
                Ok((cek, Header::new().with("epk", epk)))
            }
            _ => Err(Error::InvalidInput(format!("{self} does not determine the CEK"))),
        }
    }

    /// Encrypt or wrap `cek` for a recipient, in the
    /// [`KeyWrapping`](KeyManagementMode::KeyWrapping) and
    /// [`KeyEncryption`](KeyManagementMode::KeyEncryption) modes. Returns the
    /// encrypted key and any header additions.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm determines the CEK instead, or the
    /// key is unsuitable.
    pub fn wrap_cek(
        self, key: &Jwk, cek: &[u8], header: &Header, config: &Config,
    ) -> Result<(Vec<u8>, Header)> {
        self.check_key(key, KeyOperation::Encrypt)?;

        match self {
            Self::A128Kw | Self::A192Kw | Self::A256Kw => {
                Ok((wrap::aes_kw_wrap(&self.secret(key)?, cek)?, Header::new()))
            }
            Self::A128GcmKw | Self::A192GcmKw | Self::A256GcmKw => {
                wrap::gcm_kw_wrap(&self.secret(key)?, cek)
            }
            Self::Pbes2Hs256A128Kw | Self::Pbes2Hs384A192Kw | Self::Pbes2Hs512A256Kw => {
                let (hash, kek_len) = self.pbes2_params()?;
                let password = Zeroizing::new(key.decode("k")?);
                wrap::pbes2_wrap(hash, self.name(), kek_len, &password, cek, config)
            }
            Self::Rsa1_5 | Self::RsaOaep | Self::RsaOaep256 => {
                Ok((rsa::encrypt(self.padding()?, key, cek)?, Header::new()))
            }
            Self::EcdhEsA128Kw | Self::EcdhEsA192Kw | Self::EcdhEsA256Kw => {
                let (kek, epk) =
                    ecdh::ephemeral_agreement(self.kek_bits()?, self.name(), key, header)?;
                Ok((wrap::aes_kw_wrap(&kek, cek)?, Header::new().with("epk", epk)))
            }
            Self::Dir | Self::EcdhEs => {
                Err(Error::InvalidInput(format!("{self} does not transport a CEK")))
            }
        }
    }

    /// Recover the CEK as a recipient, using the recipient's complete
    /// `header`.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the key or header is unusable, and
    /// [`Error::Authentication`] if unwrapping fails.
    pub fn recover_cek(
        self, key: &Jwk, encrypted_key: &[u8], enc: ContentEncryptionAlgorithm, header: &Header,
        config: &Config,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.check_key(key, KeyOperation::Decrypt)?;

        if self.mode().determines_cek() && !encrypted_key.is_empty() {
            return Err(Error::InvalidInput(format!("{self} requires an empty encrypted key")));
        }

        match self {
            Self::Dir => direct_key(key, enc),
            Self::EcdhEs => ecdh::static_agreement(enc.cek_size(), enc.name(), key, header),
            Self::A128Kw | Self::A192Kw | Self::A256Kw => {
                wrap::aes_kw_unwrap(&self.secret(key)?, encrypted_key)
            }
            Self::A128GcmKw | Self::A192GcmKw | Self::A256GcmKw => {
                wrap::gcm_kw_unwrap(&self.secret(key)?, encrypted_key, header)
            }
            Self::Pbes2Hs256A128Kw | Self::Pbes2Hs384A192Kw | Self::Pbes2Hs512A256Kw => {
                let (hash, kek_len) = self.pbes2_params()?;
                let password = Zeroizing::new(key.decode("k")?);
                wrap::pbes2_unwrap(
                    hash,
                    self.name(),
                    kek_len,
                    &password,
                    encrypted_key,
                    header,
                    config,
                )
            }
            Self::Rsa1_5 | Self::RsaOaep | Self::RsaOaep256 => {
                rsa::decrypt(self.padding()?, key, encrypted_key, enc.cek_size() / 8)
            }
            Self::EcdhEsA128Kw | Self::EcdhEsA192Kw | Self::EcdhEsA256Kw => {
                let kek = ecdh::static_agreement(self.kek_bits()?, self.name(), key, header)?;
                wrap::aes_kw_unwrap(&kek, encrypted_key)
            }
        }
    }

    fn kek_bits(self) -> Result<usize> {
        self.kek_size().ok_or_else(|| Error::UnsupportedAlgorithm(self.name().to_string()))
    }

    fn padding(self) -> Result<Padding> {
        self.rsa_padding().ok_or_else(|| Error::UnsupportedAlgorithm(self.name().to_string()))
    }

    fn pbes2_params(self) -> Result<(Hash, usize)> {
        let hash =
            self.pbes2_hash().ok_or_else(|| Error::UnsupportedAlgorithm(self.name().to_string()))?;
        Ok((hash, self.kek_bits()? / 8))
    }

    /// The symmetric key, checked against the wrapping key size.
    fn secret(self, key: &Jwk) -> Result<Zeroizing<Vec<u8>>> {
        let secret = Zeroizing::new(key.decode("k")?);
        let expected = self.kek_bits()?;
        if secret.len() * 8 != expected {
            return Err(Error::InvalidKey(format!("{self} requires a {expected}-bit key")));
        }
        Ok(secret)
    }
}

/// The `oct` key used directly as the CEK.
fn direct_key(key: &Jwk, enc: ContentEncryptionAlgorithm) -> Result<Zeroizing<Vec<u8>>> {
    let cek = Zeroizing::new(key.decode("k")?);
    if cek.len() * 8 != enc.cek_size() {
        return Err(Error::InvalidKey(format!(
            "{enc} requires a {}-bit key for direct encryption",
            enc.cek_size()
        )));
    }
    Ok(cek)
}

impl FromStr for KeyManagementAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| Error::UnsupportedAlgorithm(s.to_string()))
    }
}

impl Display for KeyManagementAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

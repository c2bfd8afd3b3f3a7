//! # JSON Web Algorithms (JWA)
//!
//! JWA [RFC7518] defines a set of cryptographic algorithms for use with
//! JWS ([RFC7515]), JWE ([RFC7516]), and JWK ([RFC7517]).
//!
//! Algorithms are grouped into one closed type per capability: signature
//! (MAC), key management, content encryption and compression. [`Algorithm`]
//! is the union of the four, and a [`Registry`] holds the algorithms a caller
//! is prepared to use, looked up by identifier.
//!
//! See associated [IANA] registries for more information
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
//! [IANA]: https://www.iana.org/assignments/jose/jose.xhtml

pub mod content;
pub mod ecdh;
pub(crate) mod kdf;
pub mod key_management;
pub mod mac;
pub(crate) mod rsa;
pub(crate) mod wrap;
pub mod zip;

use std::fmt::{self, Display};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use self::content::ContentEncryptionAlgorithm;
pub use self::key_management::{KeyManagementAlgorithm, KeyManagementMode, KeyOperation};
pub use self::mac::SignatureAlgorithm;
pub use self::zip::CompressionAlgorithm;
use crate::error::{Error, Result};

/// An algorithm of any capability.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Algorithm {
    /// MAC-based signature algorithm.
    Signature(SignatureAlgorithm),

    /// Key management algorithm (`alg`).
    KeyEncryption(KeyManagementAlgorithm),

    /// Content encryption algorithm (`enc`).
    ContentEncryption(ContentEncryptionAlgorithm),

    /// Compression algorithm (`zip`).
    Compression(CompressionAlgorithm),
}

impl Algorithm {
    /// The algorithm identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Signature(alg) => alg.name(),
            Self::KeyEncryption(alg) => alg.name(),
            Self::ContentEncryption(alg) => alg.name(),
            Self::Compression(alg) => alg.name(),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AsRef<str> for Algorithm {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl AsRef<str> for SignatureAlgorithm {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl AsRef<str> for KeyManagementAlgorithm {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl AsRef<str> for ContentEncryptionAlgorithm {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl AsRef<str> for CompressionAlgorithm {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl From<SignatureAlgorithm> for Algorithm {
    fn from(alg: SignatureAlgorithm) -> Self {
        Self::Signature(alg)
    }
}

impl From<KeyManagementAlgorithm> for Algorithm {
    fn from(alg: KeyManagementAlgorithm) -> Self {
        Self::KeyEncryption(alg)
    }
}

impl From<ContentEncryptionAlgorithm> for Algorithm {
    fn from(alg: ContentEncryptionAlgorithm) -> Self {
        Self::ContentEncryption(alg)
    }
}

impl From<CompressionAlgorithm> for Algorithm {
    fn from(alg: CompressionAlgorithm) -> Self {
        Self::Compression(alg)
    }
}

/// The set of algorithms available to the builder and decrypter, in
/// registration order.
///
/// `Registry::default()` holds every algorithm the crate implements;
/// `Registry::new()` is empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registry {
    algorithms: Vec<Algorithm>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { algorithms: Vec::new() }
    }

    /// Add an algorithm. Returns `false`, leaving the registry unchanged, if
    /// an algorithm with the same name is already registered.
    pub fn register(&mut self, algorithm: impl Into<Algorithm>) -> bool {
        let algorithm = algorithm.into();
        if self.is_supported(algorithm.name()) {
            return false;
        }
        self.algorithms.push(algorithm);
        true
    }

    /// Remove an algorithm, given by name or by value. Removing an unknown
    /// algorithm does nothing.
    pub fn unregister(&mut self, algorithm: impl AsRef<str>) {
        let name = algorithm.as_ref();
        self.algorithms.retain(|alg| alg.name() != name);
    }

    /// The algorithm named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Algorithm> {
        self.algorithms.iter().find(|alg| alg.name() == name)
    }

    /// Whether an algorithm named `name` is registered.
    #[must_use]
    pub fn is_supported(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered algorithm names, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        self.algorithms.iter().map(|alg| alg.name()).collect()
    }

    /// The key management algorithm named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAlgorithm`] if no key management algorithm
    /// of that name is registered.
    pub fn key_management(&self, name: &str) -> Result<KeyManagementAlgorithm> {
        match self.get(name) {
            Some(Algorithm::KeyEncryption(alg)) => Ok(*alg),
            _ => Err(Error::UnsupportedAlgorithm(name.to_string())),
        }
    }

    /// The content encryption algorithm named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAlgorithm`] if no content encryption
    /// algorithm of that name is registered.
    pub fn content_encryption(&self, name: &str) -> Result<ContentEncryptionAlgorithm> {
        match self.get(name) {
            Some(Algorithm::ContentEncryption(alg)) => Ok(*alg),
            _ => Err(Error::UnsupportedAlgorithm(name.to_string())),
        }
    }

    /// The compression algorithm named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAlgorithm`] if no compression algorithm of
    /// that name is registered.
    pub fn compression(&self, name: &str) -> Result<CompressionAlgorithm> {
        match self.get(name) {
            Some(Algorithm::Compression(alg)) => Ok(*alg),
            _ => Err(Error::UnsupportedAlgorithm(name.to_string())),
        }
    }

    /// The signature algorithm named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAlgorithm`] if no signature algorithm of
    /// that name is registered.
    pub fn signature(&self, name: &str) -> Result<SignatureAlgorithm> {
        match self.get(name) {
            Some(Algorithm::Signature(alg)) => Ok(*alg),
            _ => Err(Error::UnsupportedAlgorithm(name.to_string())),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::new();
        for alg in SignatureAlgorithm::ALL {
            registry.register(alg);
        }
        for alg in KeyManagementAlgorithm::ALL {
            registry.register(alg);
        }
        for alg in ContentEncryptionAlgorithm::ALL {
            registry.register(alg);
        }
        for alg in CompressionAlgorithm::ALL {
            registry.register(alg);
        }
        registry
    }
}

impl FromIterator<Algorithm> for Registry {
    fn from_iter<I: IntoIterator<Item = Algorithm>>(iter: I) -> Self {
        let mut registry = Self::new();
        for alg in iter {
            registry.register(alg);
        }
        registry
    }
}

/// `len` random bytes from the operating system.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_registration_wins() {
        let mut registry = Registry::new();
        assert!(registry.register(KeyManagementAlgorithm::A128Kw));
        assert!(!registry.register(KeyManagementAlgorithm::A128Kw));
        assert_eq!(registry.list(), vec!["A128KW"]);
    }

    #[test]
    fn typed_lookups() {
        let registry = Registry::default();
        assert_eq!(registry.key_management("dir").ok(), Some(KeyManagementAlgorithm::Dir));
        assert_eq!(
            registry.content_encryption("A256GCM").ok(),
            Some(ContentEncryptionAlgorithm::A256Gcm)
        );
        assert_eq!(registry.compression("DEF").ok(), Some(CompressionAlgorithm::Deflate));
        assert_eq!(registry.signature("HS512").ok(), Some(SignatureAlgorithm::Hs512));

        // registered, but not a key management algorithm
        assert!(matches!(
            registry.key_management("A256GCM"),
            Err(Error::UnsupportedAlgorithm(name)) if name == "A256GCM"
        ));
        assert!(registry.get("none").is_none());
    }

    #[test]
    fn unregister() {
        let mut registry = Registry::default();
        registry.unregister("RSA1_5");
        assert!(!registry.is_supported("RSA1_5"));
        registry.unregister("RSA1_5");
        assert!(!registry.is_supported("RSA1_5"));
        assert!(registry.is_supported("RSA-OAEP"));

        // by value, in any capability
        registry.unregister(KeyManagementAlgorithm::RsaOaep);
        registry.unregister(Algorithm::from(CompressionAlgorithm::Gzip));
        registry.unregister(ContentEncryptionAlgorithm::A128Gcm);
        assert!(!registry.is_supported("RSA-OAEP"));
        assert!(!registry.is_supported("GZ"));
        assert!(!registry.is_supported("A128GCM"));
        assert!(registry.is_supported("RSA-OAEP-256"));
    }

    #[test]
    fn serde_union() {
        let alg: Algorithm = serde_json::from_str(r#""ECDH-ES+A128KW""#).expect("should parse");
        assert_eq!(alg, Algorithm::KeyEncryption(KeyManagementAlgorithm::EcdhEsA128Kw));
        assert_eq!(alg.to_string(), "ECDH-ES+A128KW");
    }
}

//! # JSON Web Encryption (JWE)
//!
//! JWE ([RFC7516]) represents encrypted content using JSON data structures and
//! base64url encoding. The content is encrypted once, under a Content
//! Encryption Key (CEK), and the CEK is made available to each recipient using
//! that recipient's key management algorithm.
//!
//! Use [`JweBuilder`] to encrypt and [`Decrypter`] to decrypt. A [`Jwe`] can
//! be serialized in any of the three forms defined by [RFC7516] section 7:
//!
//! ```text
//! Compact Serialization
//!     base64(JWE Protected Header) + '.'
//!     + base64(JWE Encrypted Key) + '.'
//!     + base64(JWE Initialization Vector) + '.'
//!     + base64(JWE Ciphertext) + '.'
//!     + base64(JWE Authentication Tag)
//! ```
//!
//! The flattened and general JSON serializations add the JWE Shared
//! Unprotected Header, per-recipient headers and AAD.
//!
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516

mod decrypt;
mod encrypt;
mod serialize;

use base64ct::{Base64UrlUnpadded as Base64, Encoding};
use serde::{Deserialize, Serialize};

pub use self::decrypt::Decrypter;
pub use self::encrypt::{JweBuilder, NoPayload, NoRecipients, Payload, Recipients};
use crate::error::{Error, Result};
use crate::header::Header;
use crate::jwa::{ContentEncryptionAlgorithm, KeyManagementAlgorithm, Registry};
use crate::jwk::Jwk;

/// A JWE, holding its members in their base64url-encoded form.
///
/// Serializing with `serde` produces the General JWE JSON Serialization.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwe {
    /// The encoded JWE Protected Header. Empty when there is none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protected: String,

    /// JWE Shared Unprotected Header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unprotected: Option<Header>,

    /// Information specific to each recipient.
    pub recipients: Vec<Recipient>,

    /// The encoded JWE AAD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad: Option<String>,

    /// The encoded JWE Initialization Vector.
    pub iv: String,

    /// The encoded JWE Ciphertext.
    pub ciphertext: String,

    /// The encoded JWE Authentication Tag.
    pub tag: String,
}

/// Contains information specific to a single recipient.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Recipient {
    /// JWE Per-Recipient Unprotected Header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,

    /// The encoded JWE Encrypted Key. Empty for algorithms that determine the
    /// CEK.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encrypted_key: String,
}

impl Jwe {
    /// The decoded JWE Protected Header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is not base64url-encoded JSON.
    pub fn protected_header(&self) -> Result<Header> {
        self.protected.parse()
    }

    /// The complete JOSE Header for the recipient at `index`: the union of
    /// the protected, shared unprotected and per-recipient headers.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such recipient or a parameter name
    /// occurs in more than one header.
    pub fn header(&self, index: usize) -> Result<Header> {
        let recipient = self
            .recipients
            .get(index)
            .ok_or_else(|| Error::InvalidInput(format!("no recipient at index {index}")))?;
        let protected = self.protected_header()?;
        let empty = Header::new();

        Header::union(&[
            &protected,
            self.unprotected.as_ref().unwrap_or(&empty),
            recipient.header.as_ref().unwrap_or(&empty),
        ])
    }
}

fn decode(name: &str, encoded: &str) -> Result<Vec<u8>> {
    Base64::decode_vec(encoded)
        .map_err(|e| Error::InvalidInput(format!("issue decoding `{name}`: {e}")))
}

/// Encrypt `plaintext` to a single recipient, returning the JWE Compact
/// Serialization.
///
/// The key's `kid`, when present, is included in the protected header.
///
/// # Errors
///
/// Returns an error if an algorithm is not registered, the key is unsuitable,
/// or encryption fails.
pub fn encrypt(
    registry: &Registry, plaintext: &[u8], key: &Jwk, alg: KeyManagementAlgorithm,
    enc: ContentEncryptionAlgorithm,
) -> Result<String> {
    let mut protected = Header::new().with("alg", alg.name()).with("enc", enc.name());
    if let Some(kid) = key.kid() {
        protected.insert("kid", kid);
    }

    JweBuilder::new(registry)
        .payload(plaintext)
        .protected(protected)
        .recipient(key, Header::new())
        .build()?
        .to_compact()
}

/// Decrypt a JWE in Compact Serialization.
///
/// # Errors
///
/// Returns an error if the JWE is malformed, an algorithm is not registered,
/// the key is unsuitable, or authentication fails.
pub fn decrypt(registry: &Registry, compact: &str, key: &Jwk) -> Result<Vec<u8>> {
    let jwe = Jwe::from_compact(compact)?;
    Decrypter::new(registry).decrypt(&jwe, 0, key)
}

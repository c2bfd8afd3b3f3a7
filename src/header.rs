//! # JOSE Header
//!
//! A JWE carries header parameters in up to three places: the JWE Protected
//! Header, the JWE Shared Unprotected Header, and the JWE Per-Recipient
//! Unprotected Header. The members of the complete JOSE Header for a
//! recipient are the union of the three, and parameter names MUST be disjoint
//! across them ([RFC7516] section 7.2.1).
//!
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516

use std::str::FromStr;

use base64ct::{Base64UrlUnpadded as Base64, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Header parameter names registered for JWE by [RFC7516] and [RFC7518].
///
/// [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
/// [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
pub const REGISTERED: [&str; 20] = [
    "alg", "enc", "zip", "jku", "jwk", "kid", "x5u", "x5c", "x5t", "x5t#S256", "typ", "cty",
    "crit", "epk", "apu", "apv", "iv", "tag", "p2s", "p2c",
];

/// A set of JOSE header parameters.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Header(Map<String, Value>);

impl Header {
    /// An empty header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, returning the updated header.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Set a parameter, returning any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Set a parameter to the base64url encoding of `bytes`.
    pub fn insert_bytes(&mut self, name: impl Into<String>, bytes: &[u8]) {
        self.0.insert(name.into(), Value::String(Base64::encode_string(bytes)));
    }

    /// The raw value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether the parameter is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Whether the header has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over parameter names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The parameter as a string, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is present but not a string.
    pub fn str(&self, name: &str) -> Result<Option<&str>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(Error::invalid_param(name, "expected a string")),
        }
    }

    /// The parameter as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is missing or not a string.
    pub fn required_str(&self, name: &str) -> Result<&str> {
        self.str(name)?.ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    /// The parameter decoded from base64url, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is not a valid base64url string.
    pub fn bytes(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(encoded) = self.str(name)? else {
            return Ok(None);
        };
        Base64::decode_vec(encoded)
            .map(Some)
            .map_err(|e| Error::invalid_param(name, format!("issue decoding base64url: {e}")))
    }

    /// The parameter decoded from base64url.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is missing or not valid base64url.
    pub fn required_bytes(&self, name: &str) -> Result<Vec<u8>> {
        self.bytes(name)?.ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    /// Copy every parameter of `other` into this header, replacing existing
    /// values.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Combine headers whose parameter names must not overlap.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter name appears in more than one header.
    pub fn union(headers: &[&Self]) -> Result<Self> {
        let mut complete = Self::new();
        for header in headers {
            for (name, value) in &header.0 {
                if complete.0.insert(name.clone(), value.clone()).is_some() {
                    return Err(Error::InvalidInput(format!(
                        "header parameter `{name}` occurs in more than one header"
                    )));
                }
            }
        }
        Ok(complete)
    }

    /// Serialize to JSON and base64url-encode. An empty header encodes to an
    /// empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be serialized.
    pub fn encode(&self) -> Result<String> {
        if self.0.is_empty() {
            return Ok(String::new());
        }
        Ok(Base64::encode_string(&serde_json::to_vec(&self.0)?))
    }
}

/// Decode a base64url-encoded JSON header. An empty string decodes to an
/// empty header.
impl FromStr for Header {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::new());
        }
        let bytes = Base64::decode_vec(s)?;
        let value: Value = serde_json::from_slice(&bytes)?;
        let Value::Object(map) = value else {
            return Err(Error::InvalidInput("header is not a JSON object".into()));
        };
        Ok(Self(map))
    }
}

impl From<Map<String, Value>> for Header {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Header> for Value {
    fn from(header: Header) -> Self {
        Self::Object(header.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn union_is_disjoint() {
        let protected = Header::new().with("enc", "A128GCM");
        let unprotected = Header::new().with("jku", "https://example.com/keys");
        let recipient = Header::new().with("alg", "A128KW");

        let complete =
            Header::union(&[&protected, &unprotected, &recipient]).expect("should combine");
        assert_eq!(complete.str("alg").expect("string"), Some("A128KW"));
        assert_eq!(complete.str("enc").expect("string"), Some("A128GCM"));

        let clash = Header::new().with("enc", "A256GCM");
        let err = Header::union(&[&protected, &clash]).expect_err("should reject duplicates");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn encode_decode() {
        let header = Header::new().with("alg", "dir").with("enc", "A256GCM");
        let encoded = header.encode().expect("should encode");
        let decoded: Header = encoded.parse().expect("should decode");
        assert_eq!(header, decoded);

        assert_eq!(Header::new().encode().expect("should encode"), "");
        assert!("".parse::<Header>().expect("should decode").is_empty());
    }

    #[test]
    fn typed_access() {
        let header = Header::new().with("p2c", 4096).with("apu", "QWxpY2U");
        assert!(matches!(header.str("p2c"), Err(Error::InvalidParameter { .. })));
        assert_eq!(header.bytes("apu").expect("should decode"), Some(b"Alice".to_vec()));
        assert!(matches!(
            header.required_bytes("apv"),
            Err(Error::MissingParameter(name)) if name == "apv"
        ));
    }
}

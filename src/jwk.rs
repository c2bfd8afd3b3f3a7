//! # JSON Web Key (JWK)
//!
//! A JWK ([RFC7517]) is a JSON representation of a cryptographic key.
//! Additionally, a JWK Set (JWKS) is used to represent a set of JWKs.
//!
//! Keys are held as an attribute map so that any member a producer includes
//! survives a round trip. Typed accessors read the members the encryption
//! algorithms need. A [`Jwk`] is never mutated once built: projections such as
//! [`Jwk::to_public`] return a new value.
//!
//! JWK Thumbprint [RFC7638]
//! It is RECOMMENDED that JWK kid values are set to the public key fingerprint:
//!  - create SHA-256 hash of UTF-8 representation of JSON from {crv,kty,x,y}
//!
//! For example:
//!  - JSON: `{"crv":"Ed25519","kty":"OKP","x":"
//!    11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}`
//!  - base64url JWK Thumbprint: `kPrK_qmxVWaYVA9wwBF6Iuo3vVzz7TxHCTwXBygrS4k`
//!
//! [RFC7638]: https://www.rfc-editor.org/rfc/rfc7638
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517

mod generate;

use std::fmt::{self, Display};
use std::str::FromStr;

use base64ct::{Base64UrlUnpadded as Base64, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Members holding private or secret key material.
const PRIVATE_MEMBERS: [&str; 8] = ["d", "p", "q", "dp", "dq", "qi", "oth", "k"];

/// A JSON Web Key.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Jwk(Map<String, Value>);

impl Jwk {
    /// Build a key from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or has no recognised
    /// `kty`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidKey("JWK is not a JSON object".into()));
        };
        let jwk = Self(map);
        jwk.kty()?;
        Ok(jwk)
    }

    /// Parse a key from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or has no recognised `kty`.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidKey(format!("invalid JWK: {e}")))?;
        Self::from_value(value)
    }

    /// Create a symmetric (`oct`) key from raw secret bytes.
    #[must_use]
    pub fn oct(secret: &[u8]) -> Self {
        Self::default().with("kty", KeyType::Oct.as_str()).with("k", Base64::encode_string(secret))
    }

    /// Return a copy of the key with an additional member.
    #[must_use]
    pub fn with(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = self.0.clone();
        map.insert(name.into(), value.into());
        Self(map)
    }

    /// The raw value of a member.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether the member is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Key type (`kty`).
    ///
    /// # Errors
    ///
    /// Returns an error if `kty` is missing or unknown.
    pub fn kty(&self) -> Result<KeyType> {
        let kty = self.str("kty").ok_or_else(|| Error::InvalidKey("missing `kty`".into()))?;
        kty.parse()
    }

    /// Curve (`crv`) of an `EC` or `OKP` key.
    ///
    /// # Errors
    ///
    /// Returns an error if `crv` is missing or unknown.
    pub fn crv(&self) -> Result<Curve> {
        let crv = self.str("crv").ok_or_else(|| Error::InvalidKey("missing `crv`".into()))?;
        crv.parse()
    }

    /// Key identifier (`kid`).
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.str("kid")
    }

    /// Algorithm the key is restricted to (`alg`).
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.str("alg")
    }

    /// Intended use of the key (`use`).
    #[must_use]
    pub fn key_use(&self) -> Option<&str> {
        self.str("use")
    }

    /// Permitted key operations (`key_ops`).
    ///
    /// # Errors
    ///
    /// Returns an error if `key_ops` is present but not an array of strings.
    pub fn key_ops(&self) -> Result<Option<Vec<&str>>> {
        let Some(value) = self.0.get("key_ops") else {
            return Ok(None);
        };
        let invalid = || Error::InvalidKey("`key_ops` must be an array of strings".into());
        let ops = value.as_array().ok_or_else(invalid)?;
        ops.iter().map(|op| op.as_str().ok_or_else(invalid)).collect::<Result<_>>().map(Some)
    }

    /// Decode a base64url-encoded member.
    ///
    /// # Errors
    ///
    /// Returns an error if the member is missing or not valid base64url.
    pub fn decode(&self, name: &str) -> Result<Vec<u8>> {
        let encoded =
            self.str(name).ok_or_else(|| Error::InvalidKey(format!("missing `{name}`")))?;
        Base64::decode_vec(encoded)
            .map_err(|e| Error::InvalidKey(format!("issue decoding `{name}`: {e}")))
    }

    /// Whether the key holds private or secret material: `d` for asymmetric
    /// keys, `k` for `oct` keys.
    #[must_use]
    pub fn is_private(&self) -> bool {
        match self.kty() {
            Ok(KeyType::Oct) => self.has("k"),
            Ok(_) => self.has("d"),
            Err(_) => false,
        }
    }

    /// The public projection of the key.
    #[must_use]
    pub fn to_public(&self) -> Self {
        let mut map = self.0.clone();
        for name in PRIVATE_MEMBERS {
            map.remove(name);
        }
        Self(map)
    }

    /// The base64url-encoded SHA-256 JWK Thumbprint ([RFC7638]).
    ///
    /// [RFC7638]: https://www.rfc-editor.org/rfc/rfc7638
    ///
    /// # Errors
    ///
    /// Returns an error if a required member is missing.
    pub fn thumbprint(&self) -> Result<String> {
        let required: &[&str] = match self.kty()? {
            KeyType::Ec => &["crv", "kty", "x", "y"],
            KeyType::Okp => &["crv", "kty", "x"],
            KeyType::Rsa => &["e", "kty", "n"],
            KeyType::Oct => &["k", "kty"],
        };

        // members inserted in lexicographic order
        let mut members = Map::new();
        for name in required {
            let value = self
                .0
                .get(*name)
                .ok_or_else(|| Error::InvalidKey(format!("missing `{name}`")))?;
            members.insert((*name).to_string(), value.clone());
        }
        let json = serde_json::to_vec(&members)?;
        Ok(Base64::encode_string(&Sha256::digest(json)))
    }

    fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

impl<'de> Deserialize<'de> for Jwk {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<Jwk> for Value {
    fn from(jwk: Jwk) -> Self {
        Self::Object(jwk.0)
    }
}

/// A set of JWKs.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct JwkSet {
    /// The keys in the set.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find a key by its `kid`.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid() == Some(kid))
    }

    /// Iterate over the keys in the set.
    pub fn iter(&self) -> impl Iterator<Item = &Jwk> {
        self.keys.iter()
    }
}

impl FromIterator<Jwk> for JwkSet {
    fn from_iter<I: IntoIterator<Item = Jwk>>(iter: I) -> Self {
        Self { keys: iter.into_iter().collect() }
    }
}

/// Cryptographic key type.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub enum KeyType {
    /// Octet sequence (symmetric key)
    #[serde(rename = "oct")]
    Oct,

    /// RSA key pair
    #[serde(rename = "RSA")]
    Rsa,

    /// Elliptic curve key pair
    #[serde(rename = "EC")]
    Ec,

    /// Octet key pair (CFRG curves)
    #[serde(rename = "OKP")]
    Okp,
}

impl KeyType {
    /// The `kty` identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oct => "oct",
            Self::Rsa => "RSA",
            Self::Ec => "EC",
            Self::Okp => "OKP",
        }
    }
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "oct" => Ok(Self::Oct),
            "RSA" => Ok(Self::Rsa),
            "EC" => Ok(Self::Ec),
            "OKP" => Ok(Self::Okp),
            _ => Err(Error::InvalidKey(format!("unsupported key type `{s}`"))),
        }
    }
}

impl Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cryptographic curve type.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub enum Curve {
    /// NIST P-256
    #[serde(rename = "P-256")]
    P256,

    /// NIST P-384
    #[serde(rename = "P-384")]
    P384,

    /// NIST P-521
    #[serde(rename = "P-521")]
    P521,

    /// Curve25519 for key agreement
    X25519,

    /// Curve448 for key agreement
    X448,

    /// Ed25519 signing curve
    Ed25519,
}

impl Curve {
    /// The `crv` identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
            Self::X25519 => "X25519",
            Self::X448 => "X448",
            Self::Ed25519 => "Ed25519",
        }
    }

    /// The key type keys on this curve use.
    #[must_use]
    pub const fn key_type(self) -> KeyType {
        match self {
            Self::P256 | Self::P384 | Self::P521 => KeyType::Ec,
            Self::X25519 | Self::X448 | Self::Ed25519 => KeyType::Okp,
        }
    }
}

impl FromStr for Curve {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "P-256" => Ok(Self::P256),
            "P-384" => Ok(Self::P384),
            "P-521" => Ok(Self::P521),
            "X25519" => Ok(Self::X25519),
            "X448" => Ok(Self::X448),
            "Ed25519" => Ok(Self::Ed25519),
            _ => Err(Error::InvalidKey(format!("unsupported curve `{s}`"))),
        }
    }
}

impl Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

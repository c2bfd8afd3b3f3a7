//! # Configuration
//!
//! Tunable limits and defaults used while building and decrypting JWEs.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default PBES2 salt input size in bytes.
pub const DEFAULT_PBES2_SALT_SIZE: usize = 64;

/// Default PBES2 iteration count.
pub const DEFAULT_PBES2_COUNT: u32 = 4096;

/// Default ceiling on PBES2 iteration counts accepted when decrypting.
pub const DEFAULT_PBES2_MAX_COUNT: u32 = 1_000_000;

/// Default ceiling on the size of a decompressed payload (16 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for [`JweBuilder`](crate::JweBuilder) and
/// [`Decrypter`](crate::Decrypter).
///
/// Missing fields take their default values when deserializing.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Size, in bytes, of the random PBES2 salt input (`p2s`). Must be at
    /// least 8.
    pub pbes2_salt_size: usize,

    /// PBES2 iteration count (`p2c`) used when encrypting.
    pub pbes2_count: u32,

    /// Largest PBES2 iteration count accepted when decrypting.
    pub pbes2_max_count: u32,

    /// Largest payload, in bytes, that decompression may produce.
    pub max_decompressed_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pbes2_salt_size: DEFAULT_PBES2_SALT_SIZE,
            pbes2_count: DEFAULT_PBES2_COUNT,
            pbes2_max_count: DEFAULT_PBES2_MAX_COUNT,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or a field has the
    /// wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_json() {
        let config = Config::from_json(r#"{"pbes2Count": 1000}"#).expect("should parse");
        assert_eq!(config.pbes2_count, 1000);
        assert_eq!(config.pbes2_salt_size, DEFAULT_PBES2_SALT_SIZE);
        assert_eq!(config.max_decompressed_size, DEFAULT_MAX_DECOMPRESSED_SIZE);
    }

    #[test]
    fn invalid_json() {
        assert!(Config::from_json(r#"{"pbes2Count": "many"}"#).is_err());
    }
}

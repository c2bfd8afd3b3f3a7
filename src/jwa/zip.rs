//! # Compression
//!
//! Payload compression applied before encryption (`zip` header parameter).
//! `DEF` is raw DEFLATE ([RFC1951]) as registered by [RFC7516]; `GZ` and
//! `ZLIB` are accepted for interoperability with producers that use them.
//!
//! [RFC1951]: https://www.rfc-editor.org/rfc/rfc1951
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516

use std::fmt::{self, Display};
use std::io::{Read, Write};
use std::str::FromStr;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Compression algorithm applied to the plaintext.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    /// DEFLATE
    #[serde(rename = "DEF")]
    Deflate,

    /// gzip
    #[serde(rename = "GZ")]
    Gzip,

    /// zlib
    #[serde(rename = "ZLIB")]
    Zlib,
}

impl CompressionAlgorithm {
    /// All supported compression algorithms.
    pub const ALL: [Self; 3] = [Self::Deflate, Self::Gzip, Self::Zlib];

    /// The algorithm identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deflate => "DEF",
            Self::Gzip => "GZ",
            Self::Zlib => "ZLIB",
        }
    }

    /// Compress `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        let level = flate2::Compression::default();
        let compressed = match self {
            Self::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), level);
                encoder.write_all(data).and_then(|()| encoder.finish())
            }
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(data).and_then(|()| encoder.finish())
            }
            Self::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(data).and_then(|()| encoder.finish())
            }
        };
        compressed.map_err(|e| Error::Compression(format!("issue compressing: {e}")))
    }

    /// Decompress `data`, failing if the output would exceed `limit` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not valid for the algorithm or the
    /// output is larger than `limit`.
    pub fn decompress(self, data: &[u8], limit: usize) -> Result<Vec<u8>> {
        match self {
            Self::Deflate => read_limited(DeflateDecoder::new(data), limit),
            Self::Gzip => read_limited(GzDecoder::new(data), limit),
            Self::Zlib => read_limited(ZlibDecoder::new(data), limit),
        }
    }
}

fn read_limited(decoder: impl Read, limit: usize) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    let max = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    decoder
        .take(max)
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::Compression(format!("issue decompressing: {e}")))?;

    if decompressed.len() > limit {
        return Err(Error::Compression(format!("decompressed size exceeds {limit} bytes")));
    }
    Ok(decompressed)
}

impl FromStr for CompressionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| Error::UnsupportedAlgorithm(s.to_string()))
    }
}

impl Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

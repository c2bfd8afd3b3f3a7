//! # Errors
//!
//! Every operation in the crate reports failure synchronously with [`Error`].
//! Errors fall into three groups, exposed by [`Error::kind`], so callers can
//! branch without inspecting message strings:
//!
//! - [`ErrorKind::Precondition`]: the request can never succeed as given
//!   (unsupported algorithm, unsuitable key, missing header parameter,
//!   incompatible recipients, malformed input). Raised before any secret
//!   material is derived.
//! - [`ErrorKind::Authentication`]: tag verification or key unwrapping failed.
//!   The error is deliberately generic and never carries partial plaintext.
//! - [`ErrorKind::Capability`]: the requested primitive is not available in
//!   this build.

use thiserror::Error;

use crate::jwa::KeyManagementMode;

/// Result type returned by all fallible operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while encrypting or decrypting a JWE.
#[derive(Error, Debug)]
pub enum Error {
    /// The algorithm identifier is unknown or not registered for the
    /// requested capability.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key is unsuitable for the algorithm or operation.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A required header parameter is absent.
    #[error("missing header parameter `{0}`")]
    MissingParameter(String),

    /// A header parameter is present but its value is unusable.
    #[error("invalid header parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Recipients of a single message use key management modes that cannot
    /// share a content encryption key.
    #[error("incompatible key management modes: {0} and {1}")]
    IncompatibleModes(KeyManagementMode, KeyManagementMode),

    /// The key management mode only supports a single recipient.
    #[error("{0} key management supports a single recipient only")]
    SingleRecipient(KeyManagementMode),

    /// Key agreement between keys on different curves.
    #[error("curve mismatch: expected {expected}, found {found}")]
    CurveMismatch {
        /// Curve of the static key.
        expected: String,
        /// Curve of the ephemeral key.
        found: String,
    },

    /// Structurally invalid input, such as a malformed serialization or
    /// wrongly sized IV.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Compression or decompression of the payload failed.
    #[error("compression failed: {0}")]
    Compression(String),

    /// Decryption or integrity verification failed.
    #[error("decryption failed")]
    Authentication,

    /// A primitive required by the algorithm is not available.
    #[error("capability not available: {0}")]
    Unavailable(String),
}

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Deterministic failure caused by the request itself.
    Precondition,

    /// Integrity verification failed.
    Authentication,

    /// A required cryptographic capability is missing.
    Capability,
}

impl Error {
    /// The classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication => ErrorKind::Authentication,
            Self::Unavailable(_) => ErrorKind::Capability,
            _ => ErrorKind::Precondition,
        }
    }

    pub(crate) fn invalid_param(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name: name.into(), reason: reason.into() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidInput(format!("issue with JSON: {e}"))
    }
}

impl From<base64ct::Error> for Error {
    fn from(e: base64ct::Error) -> Self {
        Self::InvalidInput(format!("issue decoding base64url: {e}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Error::Authentication.kind(), ErrorKind::Authentication);
        assert_eq!(Error::Unavailable("X448".into()).kind(), ErrorKind::Capability);
        assert_eq!(Error::MissingParameter("epk".into()).kind(), ErrorKind::Precondition);
        assert_eq!(
            Error::IncompatibleModes(KeyManagementMode::Direct, KeyManagementMode::KeyWrapping)
                .kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn messages() {
        let err = Error::invalid_param("p2c", "must be a positive integer");
        assert_eq!(err.to_string(), "invalid header parameter `p2c`: must be a positive integer");
        assert_eq!(Error::Authentication.to_string(), "decryption failed");
    }
}

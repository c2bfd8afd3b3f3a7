//! An implementation of JSON Web Encryption ([RFC7516]) and the encryption
//! algorithms of JSON Web Algorithms ([RFC7518]), built on [RustCrypto]
//! primitives.
//!
//! A payload is encrypted once under a Content Encryption Key (CEK), and the
//! CEK made available to one or more recipients with a key management
//! algorithm: direct use of a shared key, AES key wrapping (optionally
//! password based), RSA key encryption, or ECDH-ES key agreement.
//!
//! # Example
//!
//! ```rust
//! use credibil_jose::jwa::{ContentEncryptionAlgorithm, KeyManagementAlgorithm, Registry};
//! use credibil_jose::{jwe, Jwk};
//!
//! let registry = Registry::default();
//! let key = Jwk::generate_oct(256).expect("should generate");
//!
//! let compact = jwe::encrypt(
//!     &registry,
//!     b"The true sign of intelligence is not knowledge but imagination.",
//!     &key,
//!     KeyManagementAlgorithm::A256Kw,
//!     ContentEncryptionAlgorithm::A256Gcm,
//! )
//! .expect("should encrypt");
//!
//! let plaintext = jwe::decrypt(&registry, &compact, &key).expect("should decrypt");
//! assert!(plaintext.starts_with(b"The true sign"));
//! ```
//!
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518
//! [RustCrypto]: https://github.com/RustCrypto

pub mod config;
pub mod error;
pub mod header;
pub mod jwa;
pub mod jwe;
pub mod jwk;

pub use crate::config::Config;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::header::Header;
pub use crate::jwa::{Algorithm, Registry};
pub use crate::jwe::{Decrypter, Jwe, JweBuilder, Recipient};
pub use crate::jwk::{Curve, Jwk, JwkSet, KeyType};

//! # JWE Decrypter
//!
//! Recovers the plaintext of a [`Jwe`] for one of its recipients.
//!
//! The recipient's complete header is built and checked, the CEK recovered
//! with the recipient's key, and the content decrypted. The authentication tag
//! is verified before any plaintext is released or decompressed.

use tracing::instrument;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::header::{Header, REGISTERED};
use crate::jwa::Registry;
use crate::jwe::{decode, Jwe};
use crate::jwk::{Jwk, JwkSet};

/// Decrypts [`Jwe`]s using algorithms from a [`Registry`].
#[derive(Clone, Debug)]
pub struct Decrypter<'a> {
    registry: &'a Registry,
    config: Config,
    understood: Vec<String>,
}

impl<'a> Decrypter<'a> {
    /// Create a `Decrypter` resolving algorithms from `registry`.
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry, config: Config::default(), understood: Vec::new() }
    }

    /// Use `config` instead of the default configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Extension header parameters the caller understands and processes.
    /// A JWE listing any other parameter in `crit` is rejected.
    #[must_use]
    pub fn understood(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.understood.extend(names.into_iter().map(Into::into));
        self
    }

    /// Decrypt `jwe` as the recipient at `index`, using `key`.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the JWE or key is unusable, and
    /// [`Error::Authentication`] if the JWE fails authentication.
    #[instrument(level = "debug", skip(self, jwe, key))]
    pub fn decrypt(&self, jwe: &Jwe, index: usize, key: &Jwk) -> Result<Vec<u8>> {
        let protected = jwe.protected_header()?;
        let header = jwe.header(index)?;
        self.check_crit(&protected, &header)?;

        let alg = self.registry.key_management(header.required_str("alg")?)?;
        let enc = self.registry.content_encryption(header.required_str("enc")?)?;
        let zip = match header.str("zip")? {
            Some(_) if !protected.contains("zip") => {
                return Err(Error::invalid_param("zip", "must be in the protected header"));
            }
            Some(name) => Some(self.registry.compression(name)?),
            None => None,
        };

        let mode = alg.mode();
        if mode.determines_cek() && jwe.recipients.len() > 1 {
            return Err(Error::SingleRecipient(mode));
        }
        tracing::debug!(%alg, %enc, "recipient algorithms resolved");

        let encrypted_key = decode("encrypted_key", &jwe.recipients[index].encrypted_key)?;
        let iv = decode("iv", &jwe.iv)?;
        let ciphertext = decode("ciphertext", &jwe.ciphertext)?;
        let tag = decode("tag", &jwe.tag)?;

        let cek = alg
            .recover_cek(key, &encrypted_key, enc, &header, &self.config)
            .inspect_err(log_failure)?;
        let plaintext = enc
            .decrypt(&ciphertext, &cek, &iv, jwe.aad.as_deref(), &jwe.protected, &tag)
            .inspect_err(log_failure)?;

        match zip {
            Some(zip) => zip.decompress(&plaintext, self.config.max_decompressed_size),
            None => Ok(plaintext),
        }
    }

    /// Decrypt `jwe` with the first key in `keys` that works for any of its
    /// recipients, returning the plaintext and the index of the recipient.
    ///
    /// When a recipient header and a key both carry a `kid`, the key is only
    /// tried if they match.
    ///
    /// # Errors
    ///
    /// Returns the error from the last attempt if no recipient can be
    /// decrypted, or [`Error::InvalidKey`] if no key was a candidate.
    pub fn decrypt_with_key_set(&self, jwe: &Jwe, keys: &JwkSet) -> Result<(Vec<u8>, usize)> {
        let mut last_err = None;

        for index in 0..jwe.recipients.len() {
            let header = jwe.header(index)?;
            let kid = header.str("kid")?;

            for key in keys.iter() {
                if let (Some(kid), Some(key_kid)) = (kid, key.kid()) {
                    if kid != key_kid {
                        continue;
                    }
                }
                match self.decrypt(jwe, index, key) {
                    Ok(plaintext) => return Ok((plaintext, index)),
                    Err(e) => last_err = Some(e),
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::InvalidKey("no key matches any recipient".into())))
    }

    /// Validate the `crit` header parameter ([RFC7516] section 4.1.13).
    ///
    /// [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
    fn check_crit(&self, protected: &Header, header: &Header) -> Result<()> {
        let Some(value) = header.get("crit") else {
            return Ok(());
        };
        if !protected.contains("crit") {
            return Err(Error::invalid_param("crit", "must be in the protected header"));
        }

        let invalid = || Error::invalid_param("crit", "must be a non-empty array of names");
        let names = value.as_array().filter(|names| !names.is_empty()).ok_or_else(invalid)?;

        for name in names {
            let name = name.as_str().ok_or_else(invalid)?;
            if REGISTERED.contains(&name) {
                return Err(Error::invalid_param("crit", format!("`{name}` is a registered name")));
            }
            if !header.contains(name) {
                return Err(Error::invalid_param("crit", format!("`{name}` is not present")));
            }
            if !self.understood.iter().any(|u| u == name) {
                return Err(Error::invalid_param("crit", format!("`{name}` is not understood")));
            }
        }
        Ok(())
    }
}

fn log_failure(e: &Error) {
    if matches!(e, Error::Authentication) {
        tracing::warn!("JWE authentication failed");
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::jwe::JweBuilder;

    fn encrypt(protected: Header) -> (Jwe, Jwk) {
        let key = Jwk::oct(&[4u8; 16]);
        let jwe = JweBuilder::new(&Registry::default())
            .payload(b"critical".to_vec())
            .protected(protected.with("alg", "A128KW").with("enc", "A128GCM"))
            .recipient(&key, Header::new())
            .build()
            .expect("should encrypt");
        (jwe, key)
    }

    #[test]
    fn crit_understood() {
        let (jwe, key) =
            encrypt(Header::new().with("crit", json!(["exp"])).with("exp", 1_363_284_000));

        let registry = Registry::default();
        let err = Decrypter::new(&registry).decrypt(&jwe, 0, &key).expect_err("not understood");
        assert!(matches!(err, Error::InvalidParameter { name, .. } if name == "crit"));

        let plaintext = Decrypter::new(&registry)
            .understood(["exp"])
            .decrypt(&jwe, 0, &key)
            .expect("should decrypt");
        assert_eq!(plaintext, b"critical");
    }

    #[test]
    fn crit_invalid() {
        let registry = Registry::default();
        let decrypter = Decrypter::new(&registry).understood(["exp", "enc"]);

        for crit in [json!([]), json!(["enc"]), json!(["exp"]), json!("exp")] {
            let (jwe, key) = encrypt(Header::new().with("crit", crit.clone()));
            let err = decrypter.decrypt(&jwe, 0, &key).expect_err("should reject");
            assert!(matches!(err, Error::InvalidParameter { .. }), "{crit}");
        }
    }

    #[test]
    fn key_set() {
        let registry = Registry::default();
        let (jwe, key) = encrypt(Header::new());

        let keys: JwkSet = [Jwk::oct(&[9u8; 16]).with("kid", "other"), key].into_iter().collect();
        let (plaintext, index) =
            Decrypter::new(&registry).decrypt_with_key_set(&jwe, &keys).expect("should decrypt");
        assert_eq!(plaintext, b"critical");
        assert_eq!(index, 0);

        let wrong: JwkSet = [Jwk::oct(&[9u8; 16])].into_iter().collect();
        let err = Decrypter::new(&registry).decrypt_with_key_set(&jwe, &wrong).expect_err("wrong");
        assert!(matches!(err, Error::Authentication));
    }
}

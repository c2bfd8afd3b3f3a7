//! # JWE Builder
//!
//! Encrypts a payload to one or more recipients.
//!
//! The builder resolves every recipient's algorithms and checks that their
//! key management modes can share a CEK before any key material is used.
//! When there is a single recipient, header parameters written by its key
//! management algorithm go into the protected header so the result can use
//! the Compact Serialization. With several recipients they go into each
//! recipient's own header.

use base64ct::{Base64UrlUnpadded as Base64, Encoding};
use tracing::instrument;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::jwa::{random_bytes, KeyManagementAlgorithm, KeyManagementMode, KeyOperation, Registry};
use crate::jwe::{Jwe, Recipient};
use crate::jwk::Jwk;

/// Build an encrypted [`Jwe`].
#[derive(Debug)]
pub struct JweBuilder<'a, P, R> {
    registry: &'a Registry,
    config: Config,
    payload: P,
    protected: Header,
    unprotected: Option<Header>,
    aad: Option<Vec<u8>>,
    recipients: R,
}

/// No payload is set.
#[doc(hidden)]
#[derive(Debug)]
pub struct NoPayload;
/// The plaintext to encrypt.
#[doc(hidden)]
#[derive(Debug)]
pub struct Payload(Zeroizing<Vec<u8>>);

/// No recipient is set.
#[doc(hidden)]
#[derive(Debug)]
pub struct NoRecipients;
/// At least one recipient is set.
#[doc(hidden)]
#[derive(Debug)]
pub struct Recipients(Vec<(Jwk, Header)>);

impl<'a> JweBuilder<'a, NoPayload, NoRecipients> {
    /// Create a new `JweBuilder` resolving algorithms from `registry`.
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            config: Config::default(),
            payload: NoPayload,
            protected: Header::new(),
            unprotected: None,
            aad: None,
            recipients: NoRecipients,
        }
    }
}

impl<'a, R> JweBuilder<'a, NoPayload, R> {
    /// Set the plaintext to encrypt.
    #[must_use]
    pub fn payload(self, payload: impl Into<Vec<u8>>) -> JweBuilder<'a, Payload, R> {
        JweBuilder {
            registry: self.registry,
            config: self.config,
            payload: Payload(Zeroizing::new(payload.into())),
            protected: self.protected,
            unprotected: self.unprotected,
            aad: self.aad,
            recipients: self.recipients,
        }
    }
}

impl<'a, P> JweBuilder<'a, P, NoRecipients> {
    /// Add a recipient: the key the CEK is made available to, and the
    /// per-recipient header, which typically carries `alg`.
    #[must_use]
    pub fn recipient(self, key: &Jwk, header: Header) -> JweBuilder<'a, P, Recipients> {
        JweBuilder {
            registry: self.registry,
            config: self.config,
            payload: self.payload,
            protected: self.protected,
            unprotected: self.unprotected,
            aad: self.aad,
            recipients: Recipients(vec![(key.clone(), header)]),
        }
    }
}

impl<P> JweBuilder<'_, P, Recipients> {
    /// Add another recipient.
    #[must_use]
    pub fn recipient(mut self, key: &Jwk, header: Header) -> Self {
        self.recipients.0.push((key.clone(), header));
        self
    }
}

impl<P, R> JweBuilder<'_, P, R> {
    /// Use `config` instead of the default configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the JWE Protected Header. Parameters shared by all recipients,
    /// such as `enc`, `zip` and `cty`, usually belong here.
    #[must_use]
    pub fn protected(mut self, header: Header) -> Self {
        self.protected = header;
        self
    }

    /// Set the JWE Shared Unprotected Header.
    #[must_use]
    pub fn unprotected(mut self, header: Header) -> Self {
        self.unprotected = Some(header);
        self
    }

    /// Set additional authenticated data. AAD prevents use of the Compact
    /// Serialization.
    #[must_use]
    pub fn aad(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.aad = Some(aad.into());
        self
    }
}

/// A recipient with its resolved algorithm and complete header.
struct Resolved<'k> {
    key: &'k Jwk,
    header: Header,
    complete: Header,
    alg: KeyManagementAlgorithm,
}

impl JweBuilder<'_, Payload, Recipients> {
    /// Encrypt the payload.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if an algorithm is missing or not
    /// registered, headers overlap, recipients disagree on `enc` or use
    /// incompatible key management modes, or a key is unsuitable. These
    /// checks complete before any CEK is generated.
    #[instrument(level = "debug", skip_all)]
    pub fn build(self) -> Result<Jwe> {
        let empty = Header::new();
        let unprotected = self.unprotected.as_ref().unwrap_or(&empty);

        for header in std::iter::once(unprotected).chain(self.recipients.0.iter().map(|(_, h)| h)) {
            for name in ["zip", "crit"] {
                if header.contains(name) {
                    return Err(Error::invalid_param(name, "must be in the protected header"));
                }
            }
        }

        // resolve algorithms and modes
        let mut enc_name: Option<String> = None;
        let mut resolved = Vec::with_capacity(self.recipients.0.len());

        for (key, header) in &self.recipients.0 {
            let complete = Header::union(&[&self.protected, unprotected, header])?;
            let alg = self.registry.key_management(complete.required_str("alg")?)?;

            let enc = complete.required_str("enc")?;
            match &enc_name {
                Some(name) if name != enc => {
                    return Err(Error::invalid_param("enc", "must be the same for all recipients"));
                }
                Some(_) => {}
                None => enc_name = Some(enc.to_string()),
            }

            alg.check_key(key, KeyOperation::Encrypt)?;
            resolved.push(Resolved { key, header: header.clone(), complete, alg });
        }

        let modes: Vec<KeyManagementMode> = resolved.iter().map(|r| r.alg.mode()).collect();
        let mode = KeyManagementMode::resolve(&modes)?;
        tracing::debug!(%mode, recipients = resolved.len(), "key management mode resolved");

        let enc_name = enc_name.ok_or_else(|| Error::MissingParameter("enc".into()))?;
        let enc = self.registry.content_encryption(&enc_name)?;
        let zip = match self.protected.str("zip")? {
            Some(name) => Some(self.registry.compression(name)?),
            None => None,
        };

        // establish the CEK and make it available to each recipient
        let single = resolved.len() == 1;
        let mut protected = self.protected.clone();
        let mut recipients = Vec::with_capacity(resolved.len());

        let cek = if mode.determines_cek() {
            let Resolved { key, header, complete, alg } = &resolved[0];
            let (cek, additions) = alg.determine_cek(key, enc, complete)?;
            let header = place(&additions, complete, &mut protected, header.clone())?;
            recipients.push(Recipient { header, encrypted_key: String::new() });
            cek
        } else {
            let cek = Zeroizing::new(random_bytes(enc.cek_size() / 8));
            for Resolved { key, header, complete, alg } in &resolved {
                let (encrypted_key, additions) = alg.wrap_cek(key, &cek, complete, &self.config)?;
                let header = if single {
                    place(&additions, complete, &mut protected, header.clone())?
                } else {
                    let mut header = header.clone();
                    check_additions(&additions, complete)?;
                    header.merge(additions);
                    non_empty(header)
                };
                recipients.push(Recipient {
                    header,
                    encrypted_key: Base64::encode_string(&encrypted_key),
                });
                tracing::debug!(alg = %alg, "recipient processed");
            }
            cek
        };

        // compress and encrypt the content
        let encoded_protected = protected.encode()?;
        let aad = self.aad.as_ref().map(|aad| Base64::encode_string(aad));

        let compressed;
        let plaintext: &[u8] = match zip {
            Some(zip) => {
                compressed = zip.compress(&self.payload.0)?;
                &compressed
            }
            None => &self.payload.0,
        };

        let iv = random_bytes(enc.iv_size() / 8);
        let (ciphertext, tag) =
            enc.encrypt(plaintext, &cek, &iv, aad.as_deref(), &encoded_protected)?;

        Ok(Jwe {
            protected: encoded_protected,
            unprotected: self.unprotected.filter(|h| !h.is_empty()),
            recipients,
            aad,
            iv: Base64::encode_string(&iv),
            ciphertext: Base64::encode_string(&ciphertext),
            tag: Base64::encode_string(&tag),
        })
    }
}

/// Place the additions of a single recipient in the protected header,
/// returning the recipient's header.
fn place(
    additions: &Header, complete: &Header, protected: &mut Header, header: Header,
) -> Result<Option<Header>> {
    check_additions(additions, complete)?;
    protected.merge(additions.clone());
    Ok(non_empty(header))
}

/// Parameters written by key management must not already be set.
fn check_additions(additions: &Header, complete: &Header) -> Result<()> {
    if let Some(name) = additions.names().find(|name| complete.contains(name)) {
        return Err(Error::invalid_param(name, "is set by the key management algorithm"));
    }
    Ok(())
}

fn non_empty(header: Header) -> Option<Header> {
    if header.is_empty() { None } else { Some(header) }
}

//! # Content Encryption
//!
//! AEAD algorithms that encrypt the JWE payload ([RFC7518] section 5).
//!
//! `AES_CBC_HMAC_SHA2` composes AES-CBC with an HMAC over the authenticated
//! data, IV, ciphertext and the 64-bit big-endian bit length of the
//! authenticated data (AL). The CEK is split into a MAC key (first half) and
//! an encryption key (second half), and the tag is the leftmost half of the
//! HMAC output.
//!
//! AES-GCM uses the native AEAD with a 96-bit IV and a 128-bit tag.
//!
//! For both families the authenticated data is the ASCII encoded protected
//! header, followed by `.` and the base64url-encoded JWE AAD when present.
//!
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use std::fmt::{self, Display};
use std::str::FromStr;

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::jwa::mac::Hash;

/// AES-GCM using a 192-bit key.
type Aes192Gcm = AesGcm<Aes192, U12>;

/// AES-GCM IV size in bytes.
pub(crate) const GCM_IV_LEN: usize = 12;

/// AES-GCM tag size in bytes.
pub(crate) const GCM_TAG_LEN: usize = 16;

/// The algorithm used to perform authenticated encryption on the plaintext to
/// produce the ciphertext and the Authentication Tag. MUST be an AEAD
/// algorithm.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ContentEncryptionAlgorithm {
    /// AES-128-CBC with HMAC-SHA-256, truncated to 128 bits.
    #[serde(rename = "A128CBC-HS256")]
    A128CbcHs256,

    /// AES-192-CBC with HMAC-SHA-384, truncated to 192 bits.
    #[serde(rename = "A192CBC-HS384")]
    A192CbcHs384,

    /// AES-256-CBC with HMAC-SHA-512, truncated to 256 bits.
    #[serde(rename = "A256CBC-HS512")]
    A256CbcHs512,

    /// AES in Galois/Counter Mode (GCM) using a 128-bit key.
    #[serde(rename = "A128GCM")]
    A128Gcm,

    /// AES in Galois/Counter Mode (GCM) using a 192-bit key.
    #[serde(rename = "A192GCM")]
    A192Gcm,

    /// AES in Galois/Counter Mode (GCM) using a 256-bit key.
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl ContentEncryptionAlgorithm {
    /// All supported content encryption algorithms.
    pub const ALL: [Self; 6] = [
        Self::A128CbcHs256,
        Self::A192CbcHs384,
        Self::A256CbcHs512,
        Self::A128Gcm,
        Self::A192Gcm,
        Self::A256Gcm,
    ];

    /// The algorithm identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A192CbcHs384 => "A192CBC-HS384",
            Self::A256CbcHs512 => "A256CBC-HS512",
            Self::A128Gcm => "A128GCM",
            Self::A192Gcm => "A192GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// CEK size in bits.
    #[must_use]
    pub const fn cek_size(self) -> usize {
        match self {
            Self::A128CbcHs256 | Self::A256Gcm => 256,
            Self::A192CbcHs384 => 384,
            Self::A256CbcHs512 => 512,
            Self::A128Gcm => 128,
            Self::A192Gcm => 192,
        }
    }

    /// IV size in bits.
    #[must_use]
    pub const fn iv_size(self) -> usize {
        match self {
            Self::A128CbcHs256 | Self::A192CbcHs384 | Self::A256CbcHs512 => 128,
            Self::A128Gcm | Self::A192Gcm | Self::A256Gcm => 96,
        }
    }

    const fn hash(self) -> Option<Hash> {
        match self {
            Self::A128CbcHs256 => Some(Hash::Sha256),
            Self::A192CbcHs384 => Some(Hash::Sha384),
            Self::A256CbcHs512 => Some(Hash::Sha512),
            Self::A128Gcm | Self::A192Gcm | Self::A256Gcm => None,
        }
    }

    /// Encrypt `plaintext`, returning the ciphertext and authentication tag.
    ///
    /// `aad` is the base64url-encoded JWE AAD, if any, and `encoded_protected`
    /// the base64url-encoded protected header.
    ///
    /// # Errors
    ///
    /// Returns an error if the CEK or IV has the wrong size.
    pub fn encrypt(
        self, plaintext: &[u8], cek: &[u8], iv: &[u8], aad: Option<&str>, encoded_protected: &str,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        self.check_sizes(cek, iv)?;
        let auth_data = authenticated_data(encoded_protected, aad);

        match self.hash() {
            Some(hash) => cbc_hmac_encrypt(hash, plaintext, cek, iv, &auth_data),
            None => gcm_encrypt(cek, iv, &auth_data, plaintext),
        }
    }

    /// Verify the tag and decrypt `ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if the tag does not verify, or a
    /// precondition error if the CEK, IV or tag has the wrong size.
    pub fn decrypt(
        self, ciphertext: &[u8], cek: &[u8], iv: &[u8], aad: Option<&str>,
        encoded_protected: &str, tag: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_sizes(cek, iv)?;
        let auth_data = authenticated_data(encoded_protected, aad);

        match self.hash() {
            Some(hash) => cbc_hmac_decrypt(hash, ciphertext, cek, iv, &auth_data, tag),
            None => gcm_decrypt(cek, iv, &auth_data, ciphertext, tag),
        }
    }

    fn check_sizes(self, cek: &[u8], iv: &[u8]) -> Result<()> {
        if cek.len() * 8 != self.cek_size() {
            return Err(Error::InvalidKey(format!(
                "{} requires a {}-bit CEK, got {} bits",
                self.name(),
                self.cek_size(),
                cek.len() * 8
            )));
        }
        if iv.len() * 8 != self.iv_size() {
            return Err(Error::InvalidInput(format!(
                "{} requires a {}-bit IV, got {} bits",
                self.name(),
                self.iv_size(),
                iv.len() * 8
            )));
        }
        Ok(())
    }
}

impl FromStr for ContentEncryptionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| Error::UnsupportedAlgorithm(s.to_string()))
    }
}

impl Display for ContentEncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `ASCII(encoded_protected)`, plus `.` and the encoded AAD when present.
pub(crate) fn authenticated_data(encoded_protected: &str, aad: Option<&str>) -> Vec<u8> {
    let mut data = encoded_protected.as_bytes().to_vec();
    if let Some(aad) = aad {
        data.push(b'.');
        data.extend_from_slice(aad.as_bytes());
    }
    data
}

/// AL: the bit length of the authenticated data as a 64-bit big-endian
/// integer.
///
/// Encoders that pack AL as two 32-bit words (`len / 2^29`, `(len * 8) mod
/// 2^32`) produce identical bytes.
pub(crate) fn aad_length(len: usize) -> [u8; 8] {
    (len as u64 * 8).to_be_bytes()
}

fn mac_input(auth_data: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(auth_data.len() + iv.len() + ciphertext.len() + 8);
    input.extend_from_slice(auth_data);
    input.extend_from_slice(iv);
    input.extend_from_slice(ciphertext);
    input.extend_from_slice(&aad_length(auth_data.len()));
    input
}

fn cbc_hmac_encrypt(
    hash: Hash, plaintext: &[u8], cek: &[u8], iv: &[u8], auth_data: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let (mac_key, enc_key) = cek.split_at(cek.len() / 2);

    let invalid = |e: cbc::cipher::InvalidLength| {
        Error::InvalidKey(format!("issue initializing AES-CBC: {e}"))
    };
    let ciphertext = match enc_key.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(enc_key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(enc_key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(enc_key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        n => return Err(Error::InvalidKey(format!("invalid AES key length: {n} bytes"))),
    };

    let mut tag = hash.hmac(mac_key, &mac_input(auth_data, iv, &ciphertext))?;
    tag.truncate(mac_key.len());

    Ok((ciphertext, tag))
}

fn cbc_hmac_decrypt(
    hash: Hash, ciphertext: &[u8], cek: &[u8], iv: &[u8], auth_data: &[u8], tag: &[u8],
) -> Result<Vec<u8>> {
    let (mac_key, enc_key) = cek.split_at(cek.len() / 2);

    // the tag is checked before any decryption takes place
    if tag.len() != mac_key.len() {
        return Err(Error::Authentication);
    }
    if !hash.verify_truncated(mac_key, &mac_input(auth_data, iv, ciphertext), tag)? {
        return Err(Error::Authentication);
    }

    let invalid = |e: cbc::cipher::InvalidLength| {
        Error::InvalidKey(format!("issue initializing AES-CBC: {e}"))
    };
    let plaintext = match enc_key.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(enc_key, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        24 => cbc::Decryptor::<aes::Aes192>::new_from_slices(enc_key, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(enc_key, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        n => return Err(Error::InvalidKey(format!("invalid AES key length: {n} bytes"))),
    };

    plaintext.map_err(|_| Error::Authentication)
}

/// AES-GCM encryption with the AES variant selected by key length.
pub(crate) fn gcm_encrypt(
    key: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    match key.len() {
        16 => gcm_seal::<Aes128Gcm>(key, iv, aad, plaintext),
        24 => gcm_seal::<Aes192Gcm>(key, iv, aad, plaintext),
        32 => gcm_seal::<Aes256Gcm>(key, iv, aad, plaintext),
        n => Err(Error::InvalidKey(format!("invalid AES-GCM key length: {n} bytes"))),
    }
}

/// AES-GCM decryption with the AES variant selected by key length.
pub(crate) fn gcm_decrypt(
    key: &[u8], iv: &[u8], aad: &[u8], ciphertext: &[u8], tag: &[u8],
) -> Result<Vec<u8>> {
    match key.len() {
        16 => gcm_open::<Aes128Gcm>(key, iv, aad, ciphertext, tag),
        24 => gcm_open::<Aes192Gcm>(key, iv, aad, ciphertext, tag),
        32 => gcm_open::<Aes256Gcm>(key, iv, aad, ciphertext, tag),
        n => Err(Error::InvalidKey(format!("invalid AES-GCM key length: {n} bytes"))),
    }
}

fn gcm_seal<C: KeyInit + AeadInPlace>(
    key: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    if iv.len() != GCM_IV_LEN {
        return Err(Error::InvalidInput(format!("AES-GCM requires a {GCM_IV_LEN}-byte IV")));
    }
    let cipher = C::new_from_slice(key)
        .map_err(|e| Error::InvalidKey(format!("issue initializing AES-GCM: {e}")))?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(aes_gcm::aead::Nonce::<C>::from_slice(iv), aad, &mut buffer)
        .map_err(|e| Error::InvalidInput(format!("issue encrypting: {e}")))?;

    Ok((buffer, tag.to_vec()))
}

fn gcm_open<C: KeyInit + AeadInPlace>(
    key: &[u8], iv: &[u8], aad: &[u8], ciphertext: &[u8], tag: &[u8],
) -> Result<Vec<u8>> {
    if iv.len() != GCM_IV_LEN {
        return Err(Error::InvalidInput(format!("AES-GCM requires a {GCM_IV_LEN}-byte IV")));
    }
    if tag.len() != GCM_TAG_LEN {
        return Err(Error::Authentication);
    }
    let cipher = C::new_from_slice(key)
        .map_err(|e| Error::InvalidKey(format!("issue initializing AES-GCM: {e}")))?;

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            aes_gcm::aead::Nonce::<C>::from_slice(iv),
            aad,
            &mut buffer,
            aes_gcm::aead::Tag::<C>::from_slice(tag),
        )
        .map_err(|_| Error::Authentication)?;

    Ok(buffer)
}

#[cfg(test)]
mod test {
    use hex::FromHex;

    use super::*;

    // RFC 7518 Appendix B.1: AES_128_CBC_HMAC_SHA_256
    #[test]
    fn cbc_hmac_known_answer() {
        let cek: Vec<u8> = (0u8..32).collect();
        let plaintext = b"A cipher system must not be required to be secret, and it must be able \
            to fall into the hands of the enemy without inconvenience";
        let iv = <Vec<u8>>::from_hex("1af38c2dc2b96ffdd86694092341bc04").expect("valid hex");
        let auth_data = b"The second principle of Auguste Kerckhoffs";

        let (ciphertext, tag) = cbc_hmac_encrypt(Hash::Sha256, plaintext, &cek, &iv, auth_data)
            .expect("should encrypt");

        assert_eq!(
            ciphertext,
            <Vec<u8>>::from_hex(
                "c80edfa32ddf39d5ef00c0b468834279a2e46a1b8049f792f76bfe54b903a9c9\
                 a94ac9b47ad2655c5f10f9aef71427e2fc6f9b3f399a221489f16362c7032336\
                 09d45ac69864e3321cf82935ac4096c86e133314c54019e8ca7980dfa4b9cf1b\
                 384c486f3a54c51078158ee5d79de59fbd34d848b3d69550a67646344427ade5\
                 4b8851ffb598f7f80074b9473c82e2db"
            )
            .expect("valid hex")
        );
        assert_eq!(tag, hex::decode("652c3fa36b0a7c5b3219fab3a30bc1c4").expect("valid hex"));

        let decrypted = cbc_hmac_decrypt(Hash::Sha256, &ciphertext, &cek, &iv, auth_data, &tag)
            .expect("should decrypt");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn aad_length_matches_two_word_form() {
        for len in [0usize, 1, 42, 1023, 65_536, 1 << 20, (1 << 28) + 7] {
            let high = u32::try_from(len >> 29).unwrap();
            let low = u32::try_from((len * 8) % (1 << 32)).unwrap();
            let mut legacy = high.to_be_bytes().to_vec();
            legacy.extend_from_slice(&low.to_be_bytes());
            assert_eq!(aad_length(len).to_vec(), legacy, "length {len}");
        }
    }

    #[test]
    fn aad_uses_dot_separator() {
        assert_eq!(authenticated_data("eyJhbGciOiJkaXIifQ", None), b"eyJhbGciOiJkaXIifQ");
        assert_eq!(
            authenticated_data("eyJhbGciOiJkaXIifQ", Some("YWFk")),
            b"eyJhbGciOiJkaXIifQ.YWFk"
        );
    }

    #[test]
    fn round_trip_all() {
        for alg in ContentEncryptionAlgorithm::ALL {
            let cek = vec![9u8; alg.cek_size() / 8];
            let iv = vec![3u8; alg.iv_size() / 8];
            let (ciphertext, tag) =
                alg.encrypt(b"hello", &cek, &iv, Some("YWFk"), "e30").expect("should encrypt");
            let plaintext = alg
                .decrypt(&ciphertext, &cek, &iv, Some("YWFk"), "e30", &tag)
                .expect("should decrypt");
            assert_eq!(plaintext, b"hello");

            // AAD is bound to the tag
            let err = alg.decrypt(&ciphertext, &cek, &iv, None, "e30", &tag).expect_err("tampered");
            assert!(matches!(err, Error::Authentication), "{alg}");
        }
    }

    #[test]
    fn rejects_wrong_sizes() {
        let alg = ContentEncryptionAlgorithm::A128CbcHs256;
        assert!(matches!(
            alg.encrypt(b"x", &[0u8; 16], &[0u8; 16], None, ""),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(
            alg.encrypt(b"x", &[0u8; 32], &[0u8; 12], None, ""),
            Err(Error::InvalidInput(_))
        ));

        let (ciphertext, tag) =
            alg.encrypt(b"x", &[0u8; 32], &[0u8; 16], None, "").expect("should encrypt");
        let err = alg.decrypt(&ciphertext, &[0u8; 32], &[0u8; 16], None, "", &tag[..8]);
        assert!(matches!(err, Err(Error::Authentication)));
    }

    #[test]
    fn names() {
        for alg in ContentEncryptionAlgorithm::ALL {
            let parsed: ContentEncryptionAlgorithm = alg.name().parse().expect("should parse");
            assert_eq!(parsed, alg);
            assert_eq!(serde_json::to_value(alg).expect("json"), alg.name());
        }
        assert!("A512GCM".parse::<ContentEncryptionAlgorithm>().is_err());
    }
}

//! # Key Wrapping
//!
//! Symmetric key wrapping algorithms ([RFC7518] sections 4.4, 4.7 and 4.8):
//!
//! - `A*KW`: AES Key Wrap ([RFC3394]) with the default initial value.
//! - `A*GCMKW`: AES-GCM encryption of the CEK; the IV and tag are carried in
//!   the `iv` and `tag` header parameters.
//! - `PBES2-*`: a key encryption key derived with PBKDF2 from a password,
//!   then used with AES Key Wrap. The salt and iteration count are carried in
//!   `p2s` and `p2c`.
//!
//! [RFC3394]: https://www.rfc-editor.org/rfc/rfc3394
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use aes_kw::{KekAes128, KekAes192, KekAes256};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::jwa::content::{self, GCM_IV_LEN};
use crate::jwa::mac::Hash;
use crate::jwa::random_bytes;

/// Smallest PBES2 salt input accepted, in bytes.
const MIN_SALT_LEN: usize = 8;

/// Wrap `cek` with AES Key Wrap.
pub(crate) fn aes_kw_wrap(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>> {
    let wrapped = match kek.len() {
        16 => kek128(kek)?.wrap_vec(cek),
        24 => kek192(kek)?.wrap_vec(cek),
        32 => kek256(kek)?.wrap_vec(cek),
        n => return Err(Error::InvalidKey(format!("invalid AES-KW key length: {n} bytes"))),
    };
    wrapped.map_err(|e| Error::InvalidInput(format!("issue wrapping key: {e}")))
}

/// Unwrap `encrypted_key` with AES Key Wrap. An integrity check failure is an
/// authentication error.
pub(crate) fn aes_kw_unwrap(kek: &[u8], encrypted_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let unwrapped = match kek.len() {
        16 => kek128(kek)?.unwrap_vec(encrypted_key),
        24 => kek192(kek)?.unwrap_vec(encrypted_key),
        32 => kek256(kek)?.unwrap_vec(encrypted_key),
        n => return Err(Error::InvalidKey(format!("invalid AES-KW key length: {n} bytes"))),
    };
    unwrapped.map(Zeroizing::new).map_err(|_| Error::Authentication)
}

fn kek128(kek: &[u8]) -> Result<KekAes128> {
    KekAes128::try_from(kek).map_err(|e| Error::InvalidKey(format!("invalid AES-KW key: {e}")))
}

fn kek192(kek: &[u8]) -> Result<KekAes192> {
    KekAes192::try_from(kek).map_err(|e| Error::InvalidKey(format!("invalid AES-KW key: {e}")))
}

fn kek256(kek: &[u8]) -> Result<KekAes256> {
    KekAes256::try_from(kek).map_err(|e| Error::InvalidKey(format!("invalid AES-KW key: {e}")))
}

/// Encrypt `cek` with AES-GCM under `kek`, returning the encrypted key and
/// the `iv` and `tag` header additions.
pub(crate) fn gcm_kw_wrap(kek: &[u8], cek: &[u8]) -> Result<(Vec<u8>, Header)> {
    let iv = random_bytes(GCM_IV_LEN);
    let (encrypted_key, tag) = content::gcm_encrypt(kek, &iv, &[], cek)?;

    let mut additions = Header::new();
    additions.insert_bytes("iv", &iv);
    additions.insert_bytes("tag", &tag);

    Ok((encrypted_key, additions))
}

/// Decrypt an AES-GCM wrapped CEK using the `iv` and `tag` of `header`.
pub(crate) fn gcm_kw_unwrap(
    kek: &[u8], encrypted_key: &[u8], header: &Header,
) -> Result<Zeroizing<Vec<u8>>> {
    let iv = header.required_bytes("iv")?;
    let tag = header.required_bytes("tag")?;
    if iv.len() != GCM_IV_LEN {
        return Err(Error::invalid_param("iv", format!("must be {GCM_IV_LEN} bytes")));
    }
    content::gcm_decrypt(kek, &iv, &[], encrypted_key, &tag).map(Zeroizing::new)
}

/// Derive the PBES2 key encryption key.
fn pbes2_kek(
    hash: Hash, alg: &str, password: &[u8], p2s: &[u8], p2c: u32, kek_len: usize,
) -> Zeroizing<Vec<u8>> {
    // salt = UTF8(alg) || 0x00 || p2s
    let mut salt = Vec::with_capacity(alg.len() + 1 + p2s.len());
    salt.extend_from_slice(alg.as_bytes());
    salt.push(0);
    salt.extend_from_slice(p2s);

    let mut kek = Zeroizing::new(vec![0u8; kek_len]);
    hash.pbkdf2(password, &salt, p2c, &mut kek);
    kek
}

/// Wrap `cek` with a key derived from `password`. Returns the encrypted key
/// and the `p2s` and `p2c` header additions.
pub(crate) fn pbes2_wrap(
    hash: Hash, alg: &str, kek_len: usize, password: &[u8], cek: &[u8], config: &Config,
) -> Result<(Vec<u8>, Header)> {
    if config.pbes2_salt_size < MIN_SALT_LEN {
        return Err(Error::InvalidInput(format!(
            "PBES2 salt must be at least {MIN_SALT_LEN} bytes"
        )));
    }
    if config.pbes2_count == 0 {
        return Err(Error::InvalidInput("PBES2 iteration count must be positive".into()));
    }

    let p2s = random_bytes(config.pbes2_salt_size);
    let kek = pbes2_kek(hash, alg, password, &p2s, config.pbes2_count, kek_len);
    let encrypted_key = aes_kw_wrap(&kek, cek)?;

    let mut additions = Header::new();
    additions.insert_bytes("p2s", &p2s);
    additions.insert("p2c", config.pbes2_count);

    Ok((encrypted_key, additions))
}

/// Unwrap a CEK with a key derived from `password` and the `p2s` and `p2c`
/// parameters of `header`.
pub(crate) fn pbes2_unwrap(
    hash: Hash, alg: &str, kek_len: usize, password: &[u8], encrypted_key: &[u8],
    header: &Header, config: &Config,
) -> Result<Zeroizing<Vec<u8>>> {
    let p2s = header.required_bytes("p2s")?;
    if p2s.len() < MIN_SALT_LEN {
        return Err(Error::invalid_param("p2s", format!("must be at least {MIN_SALT_LEN} bytes")));
    }

    let p2c = header.get("p2c").ok_or_else(|| Error::MissingParameter("p2c".into()))?;
    let p2c = p2c
        .as_u64()
        .and_then(|c| u32::try_from(c).ok())
        .filter(|c| *c > 0)
        .ok_or_else(|| Error::invalid_param("p2c", "must be a positive integer"))?;
    if p2c > config.pbes2_max_count {
        return Err(Error::invalid_param(
            "p2c",
            format!("exceeds the maximum of {}", config.pbes2_max_count),
        ));
    }

    let kek = pbes2_kek(hash, alg, password, &p2s, p2c, kek_len);
    aes_kw_unwrap(&kek, encrypted_key)
}

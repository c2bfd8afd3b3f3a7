//! # Concat KDF
//!
//! The single-step key derivation function from NIST SP 800-56A section
//! 5.8.1, as profiled for ECDH-ES by [RFC7518] section 4.6.2. The hash is
//! SHA-256.
//!
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Derive `key_len` bits from the shared secret `z`.
///
/// `alg` is the `AlgorithmID`: the `enc` name for direct key agreement or
/// the key wrapping algorithm name otherwise. `apu` and `apv` are the decoded
/// party information, empty when absent.
pub(crate) fn concat_kdf(
    z: &[u8], alg: &str, apu: &[u8], apv: &[u8], key_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if key_len == 0 || key_len % 8 != 0 {
        return Err(Error::InvalidKey(format!("invalid derived key length: {key_len} bits")));
    }
    let key_bits = u32::try_from(key_len)
        .map_err(|_| Error::InvalidKey(format!("derived key too long: {key_len} bits")))?;

    let mut other_info = Vec::new();
    for field in [alg.as_bytes(), apu, apv] {
        other_info.extend_from_slice(&length_prefix(field)?);
        other_info.extend_from_slice(field);
    }
    // SuppPubInfo: keydatalen; SuppPrivInfo is empty
    other_info.extend_from_slice(&key_bits.to_be_bytes());

    let out_len = key_len / 8;
    let mut derived = Zeroizing::new(Vec::with_capacity(out_len));
    let mut counter: u32 = 1;

    while derived.len() < out_len {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(z);
        hasher.update(&other_info);
        derived.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    derived.truncate(out_len);

    Ok(derived)
}

fn length_prefix(field: &[u8]) -> Result<[u8; 4]> {
    let len = u32::try_from(field.len())
        .map_err(|_| Error::InvalidInput("KDF input too long".into()))?;
    Ok(len.to_be_bytes())
}

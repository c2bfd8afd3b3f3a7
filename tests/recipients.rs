//! Messages with several recipients, and key management mode compatibility.

mod utils;

use credibil_jose::jwa::KeyManagementMode;
use credibil_jose::{Decrypter, Error, ErrorKind, Header, Jwe, JweBuilder, Jwk, JwkSet, Registry};
use rstest::rstest;
use utils::registry;

#[rstest]
fn mixed_wrapping_and_encryption(registry: Registry) {
    utils::init_tracer();

    let aes = Jwk::generate_oct(128).expect("should generate").with("kid", "aes");
    let rsa = utils::rsa_key();
    let ec =
        Jwk::generate_ec(credibil_jose::Curve::P384).expect("should generate").with("kid", "ec");

    let jwe = JweBuilder::new(&registry)
        .payload(b"Shared with three recipients".to_vec())
        .protected(Header::new().with("enc", "A256CBC-HS512"))
        .recipient(&aes, Header::new().with("alg", "A128KW").with("kid", "aes"))
        .recipient(&rsa.to_public(), Header::new().with("alg", "RSA-OAEP").with("kid", "rsa-2048"))
        .recipient(&ec.to_public(), Header::new().with("alg", "ECDH-ES+A192KW").with("kid", "ec"))
        .build()
        .expect("should encrypt");

    assert_eq!(jwe.recipients.len(), 3);
    assert!(jwe.to_compact().is_err());

    // key agreement output is per recipient, not shared
    let ec_header = jwe.recipients[2].header.as_ref().expect("header");
    assert!(ec_header.contains("epk"));
    assert!(!jwe.protected_header().expect("header").contains("epk"));

    let parsed = Jwe::from_json(&jwe.to_json().expect("should serialize")).expect("should parse");
    let decrypter = Decrypter::new(&registry);
    for (index, key) in [&aes, &rsa, &ec].into_iter().enumerate() {
        let plaintext = decrypter.decrypt(&parsed, index, key).expect("should decrypt");
        assert_eq!(plaintext, b"Shared with three recipients");
    }

    // with a key set, the matching recipient is found by `kid`
    let keys: JwkSet = [ec.clone()].into_iter().collect();
    let (plaintext, index) =
        decrypter.decrypt_with_key_set(&parsed, &keys).expect("should decrypt");
    assert_eq!(plaintext, b"Shared with three recipients");
    assert_eq!(index, 2);
}

#[rstest]
fn direct_with_wrapping(registry: Registry) {
    let err = JweBuilder::new(&registry)
        .payload(b"never encrypted".to_vec())
        .protected(Header::new().with("enc", "A128GCM"))
        .recipient(&Jwk::oct(&[0u8; 16]), Header::new().with("alg", "dir"))
        .recipient(&Jwk::oct(&[1u8; 16]), Header::new().with("alg", "A128KW"))
        .build()
        .expect_err("modes are incompatible");

    assert!(matches!(
        err,
        Error::IncompatibleModes(KeyManagementMode::Direct, KeyManagementMode::KeyWrapping)
    ));
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[rstest]
fn agreement_is_single_recipient(registry: Registry) {
    let first = Jwk::generate_ec(credibil_jose::Curve::P256).expect("should generate");
    let second = Jwk::generate_ec(credibil_jose::Curve::P256).expect("should generate");

    let err = JweBuilder::new(&registry)
        .payload(b"never encrypted".to_vec())
        .protected(Header::new().with("alg", "ECDH-ES").with("enc", "A128GCM"))
        .recipient(&first.to_public(), Header::new())
        .recipient(&second.to_public(), Header::new())
        .build()
        .expect_err("only one recipient allowed");
    assert!(matches!(err, Error::SingleRecipient(KeyManagementMode::KeyAgreement)));
}

#[rstest]
fn agreement_with_wrapping(registry: Registry) {
    let ec = Jwk::generate_ec(credibil_jose::Curve::P256).expect("should generate");

    let err = JweBuilder::new(&registry)
        .payload(b"never encrypted".to_vec())
        .protected(Header::new().with("enc", "A128GCM"))
        .recipient(&ec.to_public(), Header::new().with("alg", "ECDH-ES"))
        .recipient(&Jwk::oct(&[1u8; 16]), Header::new().with("alg", "A128KW"))
        .build()
        .expect_err("modes are incompatible");
    assert!(matches!(err, Error::IncompatibleModes(..)));
}

#[rstest]
fn precondition_before_key_use(registry: Registry) {
    // the second recipient's key is unusable, so nothing is encrypted for the first
    let err = JweBuilder::new(&registry)
        .payload(b"never encrypted".to_vec())
        .protected(Header::new().with("enc", "A128GCM"))
        .recipient(&Jwk::oct(&[1u8; 16]), Header::new().with("alg", "A128KW"))
        .recipient(&Jwk::oct(&[1u8; 16]).with("use", "sig"), Header::new().with("alg", "A128KW"))
        .build()
        .expect_err("key is for signing");
    assert!(matches!(err, Error::InvalidKey(_)));
}

#[rstest]
fn overlapping_headers(registry: Registry) {
    let err = JweBuilder::new(&registry)
        .payload(b"never encrypted".to_vec())
        .protected(Header::new().with("alg", "A128KW").with("enc", "A128GCM"))
        .recipient(&Jwk::oct(&[1u8; 16]), Header::new().with("alg", "A128KW"))
        .build()
        .expect_err("`alg` appears twice");
    assert!(matches!(err, Error::InvalidInput(_)));
}

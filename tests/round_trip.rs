//! Encrypt then decrypt with every supported algorithm combination.

mod utils;

use credibil_jose::jwa::{CompressionAlgorithm, ContentEncryptionAlgorithm, KeyManagementAlgorithm};
use credibil_jose::{Config, Decrypter, Header, Jwe, JweBuilder, Jwk, Registry};
use rstest::rstest;
use utils::registry;

/// A payload of `len` bytes that is not trivially compressible.
fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| u8::try_from((i * 31 + i / 7) % 251).unwrap_or_default()).collect()
}

fn round_trip(
    registry: &Registry, alg: KeyManagementAlgorithm, enc: ContentEncryptionAlgorithm, sender: &Jwk,
    recipient: &Jwk, plaintext: &[u8],
) {
    let config = Config { pbes2_count: 1000, ..Config::default() };

    let jwe = JweBuilder::new(registry)
        .config(config.clone())
        .payload(plaintext)
        .protected(Header::new().with("alg", alg.name()).with("enc", enc.name()))
        .recipient(sender, Header::new())
        .build()
        .expect("should encrypt");

    let compact = jwe.to_compact().expect("should serialize");
    let parsed: Jwe = compact.parse().expect("should parse");

    let decrypted = Decrypter::new(registry)
        .config(config)
        .decrypt(&parsed, 0, recipient)
        .expect("should decrypt");
    assert_eq!(decrypted, plaintext, "{alg} with {enc}, {} bytes", plaintext.len());
}

#[rstest]
fn key_management(
    registry: Registry,
    #[values(
        KeyManagementAlgorithm::A128Kw,
        KeyManagementAlgorithm::A192Kw,
        KeyManagementAlgorithm::A256Kw,
        KeyManagementAlgorithm::A128GcmKw,
        KeyManagementAlgorithm::A192GcmKw,
        KeyManagementAlgorithm::A256GcmKw,
        KeyManagementAlgorithm::Pbes2Hs256A128Kw,
        KeyManagementAlgorithm::Pbes2Hs384A192Kw,
        KeyManagementAlgorithm::Pbes2Hs512A256Kw,
        KeyManagementAlgorithm::Rsa1_5,
        KeyManagementAlgorithm::RsaOaep,
        KeyManagementAlgorithm::RsaOaep256,
        KeyManagementAlgorithm::EcdhEs,
        KeyManagementAlgorithm::EcdhEsA128Kw,
        KeyManagementAlgorithm::EcdhEsA192Kw,
        KeyManagementAlgorithm::EcdhEsA256Kw
    )]
    alg: KeyManagementAlgorithm,
    #[values(
        ContentEncryptionAlgorithm::A128CbcHs256,
        ContentEncryptionAlgorithm::A192CbcHs384,
        ContentEncryptionAlgorithm::A256CbcHs512,
        ContentEncryptionAlgorithm::A128Gcm,
        ContentEncryptionAlgorithm::A192Gcm,
        ContentEncryptionAlgorithm::A256Gcm
    )]
    enc: ContentEncryptionAlgorithm,
) {
    utils::init_tracer();
    let (sender, recipient) = utils::key_pair(alg);

    for len in [0, 1, 1023, 1_000_000] {
        round_trip(&registry, alg, enc, &sender, &recipient, &payload(len));
    }
}

#[rstest]
fn direct(
    registry: Registry,
    #[values(
        ContentEncryptionAlgorithm::A128CbcHs256,
        ContentEncryptionAlgorithm::A192CbcHs384,
        ContentEncryptionAlgorithm::A256CbcHs512,
        ContentEncryptionAlgorithm::A128Gcm,
        ContentEncryptionAlgorithm::A192Gcm,
        ContentEncryptionAlgorithm::A256Gcm
    )]
    enc: ContentEncryptionAlgorithm,
) {
    utils::init_tracer();
    let key = Jwk::generate_oct(enc.cek_size()).expect("should generate");

    for len in [0, 1, 1023, 1_000_000] {
        round_trip(&registry, KeyManagementAlgorithm::Dir, enc, &key, &key, &payload(len));
    }
}

#[rstest]
fn compressed(
    registry: Registry,
    #[values(CompressionAlgorithm::Deflate, CompressionAlgorithm::Gzip, CompressionAlgorithm::Zlib)]
    zip: CompressionAlgorithm,
) {
    utils::init_tracer();
    let key = Jwk::generate_oct(256).expect("should generate");
    let plaintext = "You can trust us to stick with you through thick and thin. ".repeat(100);

    let jwe = JweBuilder::new(&registry)
        .payload(plaintext.as_bytes())
        .protected(
            Header::new().with("alg", "A256KW").with("enc", "A256GCM").with("zip", zip.name()),
        )
        .recipient(&key, Header::new())
        .build()
        .expect("should encrypt");

    // ciphertext length tracks the compressed payload
    assert!(jwe.ciphertext.len() < plaintext.len() / 2);

    let decrypted = Decrypter::new(&registry).decrypt(&jwe, 0, &key).expect("should decrypt");
    assert_eq!(decrypted, plaintext.as_bytes());
}

#[rstest]
fn decompression_limit(registry: Registry) {
    let key = Jwk::generate_oct(128).expect("should generate");
    let jwe = JweBuilder::new(&registry)
        .payload(vec![0u8; 100_000])
        .protected(Header::new().with("alg", "dir").with("enc", "A128GCM").with("zip", "DEF"))
        .recipient(&key, Header::new())
        .build()
        .expect("should encrypt");

    let config = Config { max_decompressed_size: 10_000, ..Config::default() };
    let err = Decrypter::new(&registry).config(config).decrypt(&jwe, 0, &key).expect_err("limit");
    assert!(matches!(err, credibil_jose::Error::Compression(_)));
}

#[rstest]
fn aad_and_unprotected(registry: Registry) {
    let key = Jwk::generate_oct(192).expect("should generate");
    let jwe = JweBuilder::new(&registry)
        .payload(b"with additional data".to_vec())
        .protected(Header::new().with("enc", "A192CBC-HS384").with("cty", "text/plain"))
        .unprotected(Header::new().with("jku", "https://server.example.com/keys.jwks"))
        .aad(b"authenticated, not encrypted".to_vec())
        .recipient(&key, Header::new().with("alg", "A192KW"))
        .build()
        .expect("should encrypt");

    assert!(jwe.to_compact().is_err());
    let json = jwe.to_flattened_json().expect("should serialize");
    let parsed = Jwe::from_json(&json).expect("should parse");

    let decrypted = Decrypter::new(&registry).decrypt(&parsed, 0, &key).expect("should decrypt");
    assert_eq!(decrypted, b"with additional data");
}

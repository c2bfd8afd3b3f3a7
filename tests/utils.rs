#![allow(missing_docs)]
#![allow(dead_code)]

use std::sync::Once;

use credibil_jose::jwa::KeyManagementAlgorithm;
use credibil_jose::{Curve, Jwk, Registry};
use rstest::fixture;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// initalise tracing once for all tests
static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// # Panics
///
/// Panics if the tracing subscriber cannot be set.
pub fn init_tracer() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        tracing::subscriber::set_global_default(subscriber).expect("subscriber set");
    });
}

#[fixture]
pub fn registry() -> Registry {
    Registry::default()
}

/// A 2048-bit RSA key pair.
pub fn rsa_key() -> Jwk {
    Jwk::from_json(include_str!("data/rsa_2048.json")).expect("RSA key is valid")
}

/// A recipient key pair for `alg`: the key the sender encrypts with and the
/// key the recipient decrypts with. The two are equal for symmetric
/// algorithms.
pub fn key_pair(alg: KeyManagementAlgorithm) -> (Jwk, Jwk) {
    use KeyManagementAlgorithm::*;

    let private = match alg {
        A128Kw | A128GcmKw => Jwk::generate_oct(128).expect("should generate"),
        A192Kw | A192GcmKw => Jwk::generate_oct(192).expect("should generate"),
        A256Kw | A256GcmKw => Jwk::generate_oct(256).expect("should generate"),
        Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw => Jwk::oct(b"Thus from my lips"),
        Rsa1_5 | RsaOaep | RsaOaep256 => rsa_key(),
        EcdhEs | EcdhEsA128Kw => Jwk::generate_ec(Curve::P256).expect("should generate"),
        EcdhEsA192Kw => Jwk::generate_ec(Curve::P384).expect("should generate"),
        EcdhEsA256Kw => Jwk::generate_x25519(),
        Dir => panic!("direct keys depend on the content encryption algorithm"),
    };

    if private.kty().expect("kty") == credibil_jose::KeyType::Oct {
        (private.clone(), private)
    } else {
        (private.to_public(), private)
    }
}

//! Property tests for encrypt/decrypt round trips.

use attest_crypto::{
    decrypt_with_key, derive_key, encrypt_with_key, generate_random_key, KdfParams, Salt,
    SALT_SIZE,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn round_trip_preserves_arbitrary_payloads(plaintext in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let key = generate_random_key();
        let encrypted = encrypt_with_key(&key, &plaintext, &Salt::random()).unwrap();
        let decrypted = decrypt_with_key(&key, &encrypted).unwrap();
        prop_assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ciphertext_never_contains_plaintext(plaintext in proptest::collection::vec(any::<u8>(), 32..256)) {
        let key = generate_random_key();
        let encrypted = encrypt_with_key(&key, &plaintext, &Salt::random()).unwrap();
        prop_assert!(
            !encrypted
                .ciphertext
                .windows(plaintext.len())
                .any(|w| w == plaintext.as_slice())
        );
    }

    #[test]
    fn derivation_deterministic_for_any_inputs(
        passphrase in "[a-zA-Z0-9]{1,32}",
        salt in proptest::array::uniform16(any::<u8>()),
    ) {
        let salt = Salt::from_bytes(salt);
        let params = KdfParams { iterations: 1_000 };
        let a = derive_key(&passphrase, &salt, &params).unwrap();
        let b = derive_key(&passphrase, &salt, &params).unwrap();
        prop_assert_eq!(a.as_bytes(), b.as_bytes());
    }
}

#[test]
fn salt_is_128_bit() {
    assert_eq!(SALT_SIZE, 16);
}

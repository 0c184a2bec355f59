#![no_main]

use biokey_core::core_keys::{encode_base58, SolanaKeypair};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any accepted secret must re-encode to itself
    let encoded = encode_base58(data);
    if let Ok(keypair) = SolanaKeypair::from_base58_secret(&encoded) {
        assert_eq!(keypair.secret_key_base58(), encoded);
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = SolanaKeypair::from_base58_secret(text);
    }
});

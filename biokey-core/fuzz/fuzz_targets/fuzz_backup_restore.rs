#![no_main]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use biokey_core::core_keys::{KeyDerivationEngine, KeyDerivationError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let engine = KeyDerivationEngine::default();

    // Raw text as a backup blob
    if let Ok(text) = std::str::from_utf8(data) {
        if let Err(e) = engine.restore_from_backup(text) {
            assert_eq!(e, KeyDerivationError::InvalidBackup);
        }
    }

    // Arbitrary bytes behind valid base64, reaching the JSON parser
    let blob = STANDARD.encode(data);
    match engine.restore_from_backup(&blob) {
        Ok(restored) => assert!(!restored.device_id.is_empty()),
        Err(e) => assert_eq!(e, KeyDerivationError::InvalidBackup),
    }
});

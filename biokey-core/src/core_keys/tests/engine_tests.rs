//! Engine behaviour across derivation, validation and the keypair codec

use super::helpers::{fast_engine, sample_params};
use crate::core_keys::*;
use std::collections::HashSet;

#[test]
fn test_derivation_is_deterministic() {
    let engine = fast_engine();
    let a = engine.derive_private_key(&sample_params()).unwrap();
    let b = engine.derive_private_key(&sample_params()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_engine_clones_agree() {
    let engine = fast_engine();
    let clone = engine.clone();
    assert_eq!(
        engine.derive_private_key(&sample_params()).unwrap(),
        clone.derive_private_key(&sample_params()).unwrap()
    );
}

#[test]
fn test_each_input_changes_the_key() {
    let engine = fast_engine();
    let base = engine.derive_private_key(&sample_params()).unwrap();

    let variants = [
        DerivationParams::new("abc124", "device-1", 42),
        DerivationParams::new("abc123", "device-2", 42),
        DerivationParams::new("abc123", "device-1", 43),
    ];
    for params in &variants {
        let key = engine.derive_private_key(params).unwrap();
        assert_ne!(key.public_key, base.public_key);
        assert_ne!(key.private_key, base.private_key);
    }
}

#[test]
fn test_private_key_embeds_public_key() {
    let key = fast_engine().derive_private_key(&sample_params()).unwrap();

    let public = decode_base58(&key.public_key).unwrap();
    let secret = decode_base58(&key.private_key).unwrap();
    assert_eq!(public.len(), 32);
    assert_eq!(secret.len(), 64);
    assert_eq!(&secret[32..], public.as_slice());
}

#[test]
fn test_derived_key_signs_and_verifies() {
    let key = fast_engine().derive_private_key(&sample_params()).unwrap();
    let keypair = SolanaKeypair::from_base58_secret(&key.private_key).unwrap();
    assert_eq!(keypair.public_key_base58(), key.public_key);

    let sig = keypair.sign(b"transfer 1 SOL");
    assert!(SolanaKeypair::verify(&key.public_key, b"transfer 1 SOL", &sig));
    assert!(!SolanaKeypair::verify(&key.public_key, b"transfer 2 SOL", &sig));
}

#[test]
fn test_five_keys_are_distinct_and_labelled() {
    let engine = fast_engine();
    let keys = engine.derive_multiple_keys(&sample_params(), 5).unwrap();
    assert_eq!(keys.len(), 5);

    let publics: HashSet<_> = keys.iter().map(|k| k.public_key.clone()).collect();
    assert_eq!(publics.len(), 5);

    for (i, key) in keys.iter().enumerate() {
        assert_eq!(key.derivation_path, Some(DerivationPath::solana(i as u32)));
        assert_eq!(
            key.derivation_path.map(|p| p.to_string()),
            Some(format!("m/44'/501'/{}'", i))
        );
        assert_eq!(key.device_id, "device-1");
    }
}

#[test]
fn test_multi_key_index_matches_explicit_indexed_salt() {
    let engine = fast_engine();
    let params = sample_params();
    let keys = engine.derive_multiple_keys(&params, 3).unwrap();

    let base_salt = engine.deterministic_salt(&params.device_id, params.user_id);
    let explicit = engine
        .derive_private_key(&params.clone().with_salt(indexed_salt(&base_salt, 2)))
        .unwrap();
    assert_eq!(keys[2].public_key, explicit.public_key);

    let single = engine.derive_private_key(&params).unwrap();
    assert!(keys.iter().all(|k| k.public_key != single.public_key));
}

#[test]
fn test_validate_round_trip() {
    let engine = fast_engine();
    let params = sample_params();
    let key = engine.derive_private_key(&params).unwrap();

    assert!(engine.validate_biometric_key(&params, &key.public_key));
    assert!(!engine.validate_biometric_key(&params.with_token("wrong"), &key.public_key));
    assert!(!engine.validate_biometric_key(&params, "not-a-public-key"));
}

#[test]
fn test_reference_parameters_vector() {
    let engine = KeyDerivationEngine::default();
    let a = engine
        .derive_private_key(&DerivationParams::new("abc123", "device-1", 42))
        .unwrap();
    let again = engine
        .derive_private_key(&DerivationParams::new("abc123", "device-1", 42))
        .unwrap();
    let other_user = engine
        .derive_private_key(&DerivationParams::new("abc123", "device-1", 43))
        .unwrap();

    assert_eq!(a, again);
    assert_ne!(a.public_key, other_user.public_key);
    assert!((32..=44).contains(&a.public_key.len()));
    assert!((64..=88).contains(&a.private_key.len()));

    let seed = {
        let mut seed = [0u8; SEED_LENGTH];
        let salt = deterministic_salt("TG_BIOMETRIC_", "device-1", 42);
        pbkdf2::pbkdf2_hmac::<sha2::Sha256>(b"abc123", salt.as_bytes(), 100_000, &mut seed);
        seed
    };
    assert_eq!(SolanaKeypair::from_seed(&seed).public_key_base58(), a.public_key);
}

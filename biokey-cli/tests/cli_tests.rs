//! End-to-end tests for the `biokey` binary

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn biokey(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_biokey"))
        .args(args)
        .env("BIOKEY_DERIVATION_ITERATIONS", "1000")
        .env("BIOKEY_LOG_LEVEL", "warn")
        .env_remove("BIOKEY_TOKEN")
        .env_remove("BIOKEY_PRIVATE_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run biokey")
}

fn json_ok(args: &[&str]) -> Value {
    let output = biokey(args);
    assert!(
        output.status.success(),
        "biokey {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn session_args<'a>(dir: &'a Path, rest: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec!["session", "--session-dir", dir.to_str().unwrap()];
    args.extend_from_slice(rest);
    args
}

#[test]
fn test_derive_is_deterministic() {
    let args = ["derive", "--device-id", "device-1", "--user-id", "42", "--token", "abc123"];
    let a = json_ok(&args);
    let b = json_ok(&args);

    assert_eq!(a, b);
    assert_eq!(a["deviceId"], "device-1");
    assert_eq!(a["biometricType"], "finger");
    assert!(a["publicKey"].as_str().unwrap().len() >= 32);
}

#[test]
fn test_derive_rejects_empty_token() {
    let output = biokey(&["derive", "--device-id", "d", "--user-id", "1", "--token", ""]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid input"));
}

#[test]
fn test_derive_many_labels_paths() {
    let keys = json_ok(&[
        "derive-many", "--device-id", "device-1", "--user-id", "42", "--token", "abc123", "--count", "2",
    ]);
    let keys = keys.as_array().unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0]["derivationPath"], "m/44'/501'/0'");
    assert_eq!(keys[1]["derivationPath"], "m/44'/501'/1'");
}

#[test]
fn test_validate_matches_and_mismatches() {
    let key = json_ok(&["derive", "--device-id", "d", "--user-id", "7", "--token", "t"]);
    let public_key = key["publicKey"].as_str().unwrap();

    let ok = json_ok(&["validate", "--device-id", "d", "--user-id", "7", "--token", "t", "--public-key", public_key]);
    assert_eq!(ok["valid"], true);

    let output = biokey(&["validate", "--device-id", "d", "--user-id", "7", "--token", "x", "--public-key", public_key]);
    assert!(!output.status.success());
}

#[test]
fn test_backup_restore_round_trip() {
    let backup = json_ok(&["backup", "--device-id", "device-1", "--user-id", "-3"]);
    let blob = backup["backup"].as_str().unwrap();

    let restored = json_ok(&["restore", "--backup", blob]);
    assert_eq!(restored["deviceId"], "device-1");
    assert_eq!(restored["userId"], -3);
    assert_eq!(restored["salt"].as_str().unwrap().len(), 64);
}

#[test]
fn test_restore_rejects_garbage() {
    let output = biokey(&["restore", "--backup", "not-a-backup"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid backup data"));
}

#[test]
fn test_sign_and_verify() {
    let key = json_ok(&["derive", "--device-id", "d", "--user-id", "1", "--token", "t"]);
    let private_key = key["privateKey"].as_str().unwrap();
    let public_key = key["publicKey"].as_str().unwrap();

    let signed = json_ok(&["sign", "--private-key", private_key, "--message", "hello"]);
    assert_eq!(signed["publicKey"], public_key);
    let signature = signed["signature"].as_str().unwrap();

    let verified = json_ok(&["verify", "--public-key", public_key, "--signature", signature, "--message-base64", "aGVsbG8="]);
    assert_eq!(verified["valid"], true);

    let output = biokey(&["verify", "--public-key", public_key, "--signature", signature, "--message", "bye"]);
    assert!(!output.status.success());
}

#[test]
fn test_session_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();

    let created = json_ok(&session_args(
        dir,
        &["create", "--device-id", "phone", "--user-id", "42", "--token", "abc123", "--biometric-type", "face"],
    ));
    assert_eq!(created["isEnabled"], true);
    assert_eq!(created["biometricType"], "face");
    assert!(created.get("biometricToken").is_none());

    let unlocked = json_ok(&session_args(dir, &["unlock", "--device-id", "phone", "--user-id", "42", "--token", "abc123"]));
    assert_eq!(unlocked["publicKey"], created["publicKey"]);
    assert!(unlocked["privateKey"].as_str().is_some());

    let output = biokey(&session_args(dir, &["unlock", "--device-id", "phone", "--user-id", "42", "--token", "other"]));
    assert!(!output.status.success());

    let listed = json_ok(&session_args(dir, &["list"]));
    assert_eq!(listed.as_array().unwrap().len(), 1);

    json_ok(&session_args(dir, &["remove", "--device-id", "phone", "--user-id", "42"]));
    let listed = json_ok(&session_args(dir, &["list"]));
    assert!(listed.as_array().unwrap().is_empty());
}

#[test]
fn test_config_file_is_honoured() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("biokey.toml");
    std::fs::write(&config_path, "[derivation]\nsalt_prefix = \"OTHER_\"\n").unwrap();

    let args = ["derive", "--device-id", "d", "--user-id", "1", "--token", "t"];
    let default_key = json_ok(&args);

    let mut with_config = vec!["--config", config_path.to_str().unwrap()];
    with_config.extend_from_slice(&args);
    let custom_key = json_ok(&with_config);

    assert_ne!(default_key["publicKey"], custom_key["publicKey"]);
}

#[test]
fn test_session_unlock_runs_after_reload() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    json_ok(&session_args(dir, &["create", "--device-id", "d", "--user-id", "5", "--token", "t"]));

    let unlocked = json_ok(&session_args(dir, &["unlock", "--device-id", "d", "--user-id", "5", "--token", "t"]));
    assert!(unlocked["lastUsed"].as_u64().is_some());
}

#[test]
fn test_session_remove_missing_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = biokey(&session_args(temp_dir.path(), &["remove", "--device-id", "d", "--user-id", "5"]));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Session not found"));
}

#[test]
fn test_uppercase_log_level_env_is_accepted() {
    let output = Command::new(env!("CARGO_BIN_EXE_biokey"))
        .args(["backup", "--device-id", "d", "--user-id", "1"])
        .env("BIOKEY_LOG_LEVEL", "WARN")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run biokey");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

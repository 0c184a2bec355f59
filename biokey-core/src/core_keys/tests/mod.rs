//! Key derivation test suite
//!
//! Cross-module behaviour of the engine; per-module unit tests live next to
//! the code they cover.

mod engine_tests;

pub mod helpers;

//! Deterministic, pure logic shared by the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for hashing and tests.

pub mod canonical;
pub mod fingerprint;
pub mod repair;
pub mod types;

//! Deterministic execution pipeline.
//!
//! This crate turns an execution request into a content-addressed execution
//! result. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (canonical encoding, request
//!   fingerprints, artifact types). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (atomic slot writes, append-only
//!   logs, configuration).
//!
//! [`executor`] defines the execution seam and the deterministic file
//! executor; [`result`] wraps an execution into an [`core::types::ExecutionResult`]
//! and is the only place executor faults are contained. Verification and
//! replay live in the `eval` crate.

pub mod core;
pub mod executor;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod result;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

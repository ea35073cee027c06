//! I/O helpers for pipeline artifacts.

pub mod config;
pub mod paths;
pub mod persist;

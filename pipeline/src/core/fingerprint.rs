//! Request fingerprinting.
//!
//! The request hash is the identity of an execution. It is computed over the
//! canonical encoding of the raw request after the volatile top-level keys
//! (transport metadata such as `created_at`) have been removed.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::canonical::encode_value;

static REQUEST_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{64}$").expect("request hash pattern"));

/// Top-level request keys excluded from the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolatileKeys(BTreeSet<String>);

impl VolatileKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for VolatileKeys {
    fn default() -> Self {
        Self::new(["created_at", "_meta"])
    }
}

/// Strip volatile top-level keys. Non-object values pass through unchanged.
pub fn canonicalize_request(raw: &Value, volatile: &VolatileKeys) -> Value {
    match raw {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !volatile.contains(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Lowercase hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Fingerprint of a raw request: SHA-256 over its canonical, metadata-free form.
pub fn fingerprint(raw: &Value, volatile: &VolatileKeys) -> String {
    sha256_hex(&encode_value(&canonicalize_request(raw, volatile)))
}

/// True when `candidate` looks like a request hash (64 lowercase hex chars).
pub fn is_request_hash(candidate: &str) -> bool {
    REQUEST_HASH_RE.is_match(candidate)
}

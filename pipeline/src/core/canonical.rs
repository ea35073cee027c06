//! Canonical JSON encoding.
//!
//! Every byte string that is hashed or persisted goes through this module so
//! that semantically equal values always encode identically:
//!
//! 1. Object keys are sorted lexicographically (byte order), recursively.
//! 2. The compact form has no whitespace between tokens.
//! 3. Output is UTF-8; non-ASCII characters are emitted verbatim.
//!
//! The pretty form uses the same key order with two-space indentation and is
//! only used for the human-facing `last_*.json` slots. Hashes are always
//! computed over the compact form.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Rebuild `value` with every object's keys inserted in sorted order.
///
/// Does not rely on the map backend of `serde_json`: the result is ordered
/// whether or not `preserve_order` is enabled somewhere in the build.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Compact canonical encoding of an arbitrary JSON value.
pub fn encode_value(value: &Value) -> Vec<u8> {
    // Serializing a `Value` cannot fail: keys are strings and numbers are finite.
    serde_json::to_vec(&canonicalize(value)).unwrap_or_default()
}

/// Compact canonical encoding of any serializable type.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value).context("serialize canonical value")?;
    Ok(encode_value(&value))
}

/// Compact canonical encoding as a string (one NDJSON line, without newline).
pub fn encode_line<T: Serialize>(value: &T) -> Result<String> {
    let bytes = encode(value)?;
    String::from_utf8(bytes).context("canonical encoding is not utf-8")
}

/// Indented canonical encoding with a trailing newline.
pub fn encode_pretty<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("serialize canonical value")?;
    let mut buf =
        serde_json::to_string_pretty(&canonicalize(&value)).context("render canonical json")?;
    buf.push('\n');
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_encoding() {
        let left: Value = serde_json::from_str(r#"{"b":1,"a":{"y":2,"x":[3,{"d":4,"c":5}]}}"#)
            .expect("left");
        let right: Value = serde_json::from_str(r#"{"a":{"x":[3,{"c":5,"d":4}],"y":2},"b":1}"#)
            .expect("right");
        assert_eq!(encode_value(&left), encode_value(&right));
    }

    #[test]
    fn compact_form_sorts_keys_without_whitespace() {
        let value = json!({"zeta": true, "alpha": [1, 2], "mid": null});
        let encoded = String::from_utf8(encode_value(&value)).expect("utf-8");
        assert_eq!(encoded, r#"{"alpha":[1,2],"mid":null,"zeta":true}"#);
    }

    #[test]
    fn non_ascii_is_not_escaped() {
        let value = json!({"name": "café ☕"});
        let encoded = encode_line(&value).expect("encode");
        assert_eq!(encoded, r#"{"name":"café ☕"}"#);
    }

    #[test]
    fn array_order_is_preserved() {
        let value = json!([3, 1, 2]);
        assert_eq!(encode_line(&value).expect("encode"), "[3,1,2]");
    }

    #[test]
    fn pretty_form_is_sorted_and_newline_terminated() {
        let value = json!({"b": 1, "a": 2});
        let pretty = encode_pretty(&value).expect("pretty");
        assert_eq!(pretty, "{\n  \"a\": 2,\n  \"b\": 1\n}\n");
    }
}

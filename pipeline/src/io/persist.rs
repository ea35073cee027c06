//! Artifact persistence: atomic slot writes and append-only NDJSON logs.
//!
//! Slots (`last_*.json`) are replaced via temp file + rename so a reader never
//! observes a torn file. Logs are only ever opened in append mode.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::canonical::{encode_line, encode_pretty};

const BOM: char = '\u{feff}';
const BOM_BYTES: &[u8] = b"\xef\xbb\xbf";

/// Atomically replace `path` with `contents` (sibling temp file + rename).
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = tmp_sibling(path)?;
    fs::write(&tmp_path, contents).with_context(|| format!("write temp {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// Write a slot file: indented canonical JSON with trailing newline.
pub fn write_json_slot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    debug!(path = %path.display(), "writing slot");
    let contents = encode_pretty(value)?;
    atomic_write(path, contents.as_bytes())
}

/// Append one canonical JSON line to an NDJSON log, creating it if needed.
pub fn append_log<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut line = encode_line(record)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("append log {}", path.display()))?;
    debug!(path = %path.display(), "appended log record");
    Ok(())
}

/// Read a required JSON artifact. Missing files and malformed JSON are errors.
pub fn read_json(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(anyhow!("missing file: {}", path.display()));
    }
    let contents = read_text(path)?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Read a text file, dropping a leading byte-order mark.
pub fn read_text(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(match contents.strip_prefix(BOM) {
        Some(stripped) => stripped.to_string(),
        None => contents,
    })
}

/// Parsed NDJSON log: object lines in file order plus a count of skipped lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NdjsonLog {
    pub entries: Vec<Map<String, Value>>,
    /// Lines that were not valid JSON or not a JSON object.
    pub malformed: usize,
}

/// Read an NDJSON log tolerantly.
///
/// A missing file reads as empty. Blank lines are ignored. Malformed lines are
/// skipped and counted, never fatal.
pub fn read_ndjson(path: &Path) -> Result<NdjsonLog> {
    if !path.exists() {
        return Ok(NdjsonLog::default());
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let bytes = bytes.strip_prefix(BOM_BYTES).unwrap_or(&bytes);
    let mut log = NdjsonLog::default();
    for line in bytes.split(|byte| *byte == b'\n') {
        let Ok(line) = std::str::from_utf8(line) else {
            log.malformed += 1;
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => log.entries.push(map),
            Ok(_) | Err(_) => log.malformed += 1,
        }
    }
    if log.malformed > 0 {
        warn!(path = %path.display(), malformed = log.malformed, "skipped malformed log lines");
    }
    Ok(log)
}

fn tmp_sibling(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .with_context(|| format!("path missing file name {}", path.display()))?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn atomic_write_overwrites_and_leaves_no_temp() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/slot.json");
        atomic_write(&path, b"first").expect("first write");
        atomic_write(&path, b"second").expect("second write");
        assert_eq!(fs::read(&path).expect("read"), b"second");
        assert!(!temp.path().join("nested/slot.json.tmp").exists());
    }

    #[test]
    fn slot_is_pretty_sorted_and_has_no_bom() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("slot.json");
        write_json_slot(&path, &json!({"z": 1, "a": "é"})).expect("write");
        let bytes = fs::read(&path).expect("read");
        assert!(!bytes.starts_with("\u{feff}".as_bytes()));
        assert_eq!(
            String::from_utf8(bytes).expect("utf-8"),
            "{\n  \"a\": \"é\",\n  \"z\": 1\n}\n"
        );
    }

    #[test]
    fn append_log_never_truncates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logs/results.ndjson");
        append_log(&path, &json!({"b": 2, "a": 1})).expect("append one");
        append_log(&path, &json!({"c": 3})).expect("append two");
        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "{\"a\":1,\"b\":2}\n{\"c\":3}\n");
    }

    #[test]
    fn read_json_tolerates_bom() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("request.json");
        fs::write(&path, "\u{feff}{\"task_id\":\"T1\"}").expect("write");
        let value = read_json(&path).expect("read");
        assert_eq!(value["task_id"], "T1");
    }

    #[test]
    fn read_json_reports_missing_and_malformed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("missing.json");
        let err = read_json(&missing).expect_err("missing");
        assert!(err.to_string().contains("missing file"));

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "{not json").expect("write");
        assert!(read_json(&broken).is_err());
    }

    #[test]
    fn read_ndjson_skips_and_counts_malformed_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("requests.ndjson");
        fs::write(
            &path,
            "\u{feff}{\"task_id\":\"A\"}\n\nnot json\n[1,2]\n{\"task_id\":\"B\"}\n",
        )
        .expect("write");
        let log = read_ndjson(&path).expect("read");
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0]["task_id"], "A");
        assert_eq!(log.entries[1]["task_id"], "B");
        assert_eq!(log.malformed, 2);
    }

    #[test]
    fn read_ndjson_counts_invalid_utf8_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("requests.ndjson");
        let mut bytes = b"{\"task_id\":\"A\"}\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe garbage\n");
        bytes.extend_from_slice(b"{\"task_id\":\"B\"}\r\n");
        fs::write(&path, bytes).expect("write");

        let log = read_ndjson(&path).expect("read");
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0]["task_id"], "A");
        assert_eq!(log.entries[1]["task_id"], "B");
        assert_eq!(log.malformed, 1);
    }

    #[test]
    fn read_ndjson_missing_file_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = read_ndjson(&temp.path().join("absent.ndjson")).expect("read");
        assert_eq!(log, NdjsonLog::default());
    }
}

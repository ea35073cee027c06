use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use pipeline::io::persist::read_ndjson;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::outcome::reason_code;

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub runs: usize,
    pub pass: usize,
    pub fail: usize,
    /// Evaluations whose status was neither `pass` nor `fail`.
    pub unknown: usize,
    /// Lines that were not JSON objects.
    pub malformed: usize,
    pub distinct_requests: usize,
    /// Occurrences per reason code, subject stripped.
    pub reason_counts: BTreeMap<String, usize>,
}

pub fn aggregate(evaluation_log: &Path) -> Result<ReportSummary> {
    let log = read_ndjson(evaluation_log)?;
    let mut summary = summarize(&log.entries);
    summary.malformed = log.malformed;
    Ok(summary)
}

fn summarize(entries: &[Map<String, Value>]) -> ReportSummary {
    let mut summary = ReportSummary::default();
    let mut hashes = BTreeSet::new();

    for entry in entries {
        summary.runs += 1;
        match entry.get("status").and_then(Value::as_str) {
            Some("pass") => summary.pass += 1,
            Some("fail") => summary.fail += 1,
            _ => summary.unknown += 1,
        }
        if let Some(hash) = entry.get("request_hash").and_then(Value::as_str) {
            hashes.insert(hash.to_string());
        }
        let reasons = entry
            .get("reasons")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for reason in reasons.iter().filter_map(Value::as_str) {
            *summary
                .reason_counts
                .entry(reason_code(reason).to_string())
                .or_insert(0) += 1;
        }
    }

    summary.distinct_requests = hashes.len();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn aggregates_evaluation_log() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("evaluation_results.ndjson");
        let lines = [
            json!({"status": "pass", "request_hash": "a", "reasons": []}),
            json!({"status": "fail", "request_hash": "a", "reasons": [
                "write_file_missing:out.txt",
                "write_file_missing:other.txt"
            ]}),
            json!({
                "status": "fail",
                "request_hash": "b",
                "reasons": ["execution_status_not_success"]
            }),
        ];
        let mut contents = String::new();
        for line in &lines {
            contents.push_str(&line.to_string());
            contents.push('\n');
        }
        contents.push_str("garbage\n");
        fs::write(&path, contents).expect("write log");

        let summary = aggregate(&path).expect("aggregate");
        assert_eq!(summary.runs, 3);
        assert_eq!(summary.pass, 1);
        assert_eq!(summary.fail, 2);
        assert_eq!(summary.unknown, 0);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.distinct_requests, 2);
        assert_eq!(summary.reason_counts.get("write_file_missing"), Some(&2));
        assert_eq!(
            summary.reason_counts.get("execution_status_not_success"),
            Some(&1)
        );
    }

    #[test]
    fn missing_log_reports_nothing() {
        let temp = tempdir().expect("tempdir");
        let summary = aggregate(&temp.path().join("absent.ndjson")).expect("aggregate");
        assert_eq!(summary, ReportSummary::default());
    }
}

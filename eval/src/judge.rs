//! Mechanical verification of execution results.
//!
//! Re-derives pass/fail from a persisted execution result without trusting
//! the executor's own claims: schema shape, required keys, error state,
//! outputs shape, and on-disk verification of every declared write.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use jsonschema::{Validator, validator_for};
use pipeline::core::fingerprint::sha256_hex;
use pipeline::core::types::{EVALUATION_RESULT_KIND, EvaluationMeta, EvaluationResult};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::outcome::classify;

pub const EVALUATOR_VERSION: &str = "v1";

const EXECUTION_RESULT_SCHEMA: &str = include_str!("../schemas/execution_result.schema.json");

/// Mandatory top-level keys, sorted. `_meta` is transport metadata and exempt.
const REQUIRED_KEYS: [&str; 6] = ["error", "kind", "outputs", "request", "request_hash", "status"];

const WRITE_KEYS: [&str; 3] = ["path", "sha256", "bytes"];

/// Compiled execution result schema.
pub struct ResultSchema {
    validator: Validator,
}

impl ResultSchema {
    /// Compile the schema bundled with this binary.
    pub fn bundled() -> Result<Self> {
        let schema: Value =
            serde_json::from_str(EXECUTION_RESULT_SCHEMA).context("parse execution result schema")?;
        let validator = validator_for(&schema)
            .map_err(|err| anyhow!("invalid execution result schema: {}", err))?;
        Ok(Self { validator })
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    fn errors(&self, instance: &Value) -> Vec<String> {
        self.validator
            .iter_errors(instance)
            .map(|err| err.to_string())
            .collect()
    }
}

/// Outcome of one check: whether it passed and the reasons it contributed.
#[derive(Debug, Default)]
struct CheckResult {
    passed: bool,
    reasons: Vec<String>,
}

impl CheckResult {
    fn pass() -> Self {
        Self {
            passed: true,
            reasons: Vec::new(),
        }
    }

    fn fail(reasons: Vec<String>) -> Self {
        Self {
            passed: false,
            reasons,
        }
    }
}

/// Counters recorded by write verification.
#[derive(Debug, Default, Clone, Copy)]
struct WriteCounts {
    present: bool,
    checked: u64,
    ok: u64,
}

/// Evaluate a raw execution result. Never fails: every problem is a reason.
///
/// Relative write paths resolve against `repo_root`.
#[instrument(skip_all)]
pub fn evaluate(schema: &ResultSchema, repo_root: &Path, raw: &Value) -> EvaluationResult {
    let mut reasons = Vec::new();
    let mut checks = BTreeMap::new();

    let schema_check = check_schema(schema, raw);
    record(&mut checks, &mut reasons, "execution_result_schema_valid", schema_check);

    let keys_check = check_required_keys(raw);
    record(&mut checks, &mut reasons, "required_keys_present", keys_check);

    let error_check = check_no_error(raw);
    record(&mut checks, &mut reasons, "no_error_field", error_check);

    let shape_check = check_outputs_shape(raw);
    record(&mut checks, &mut reasons, "outputs_shape_valid", shape_check);

    let (writes_check, counts) = check_writes(repo_root, raw);
    record(&mut checks, &mut reasons, "write_records_valid", writes_check);
    checks.insert("writes_present".to_string(), Value::Bool(counts.present));
    checks.insert("writes_checked".to_string(), Value::from(counts.checked));
    checks.insert("writes_ok".to_string(), Value::from(counts.ok));

    let status = classify(&reasons);
    let request_hash = raw
        .get("request_hash")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    debug!(?status, reasons = reasons.len(), %request_hash, "evaluation complete");

    EvaluationResult {
        kind: EVALUATION_RESULT_KIND.to_string(),
        status,
        request_hash,
        reasons,
        checks,
        meta: EvaluationMeta {
            produced_at: Utc::now().to_rfc3339(),
            evaluator_version: EVALUATOR_VERSION.to_string(),
        },
    }
}

fn record(
    checks: &mut BTreeMap<String, Value>,
    reasons: &mut Vec<String>,
    name: &str,
    result: CheckResult,
) {
    checks.insert(name.to_string(), Value::Bool(result.passed));
    reasons.extend(result.reasons);
}

fn check_schema(schema: &ResultSchema, raw: &Value) -> CheckResult {
    if schema.is_valid(raw) {
        return CheckResult::pass();
    }
    debug!(errors = ?schema.errors(raw), "schema validation failed");
    CheckResult::fail(vec!["execution_result_schema_invalid".to_string()])
}

fn check_required_keys(raw: &Value) -> CheckResult {
    let Some(map) = raw.as_object() else {
        return CheckResult::fail(
            REQUIRED_KEYS
                .iter()
                .map(|key| format!("missing_required_key:{key}"))
                .collect(),
        );
    };
    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| !map.contains_key(**key))
        .map(|key| format!("missing_required_key:{key}"))
        .collect();
    if missing.is_empty() {
        CheckResult::pass()
    } else {
        CheckResult::fail(missing)
    }
}

fn check_no_error(raw: &Value) -> CheckResult {
    if raw.get("status").and_then(Value::as_str) != Some("success") {
        return CheckResult::fail(vec!["execution_status_not_success".to_string()]);
    }
    match raw.get("error") {
        None | Some(Value::Null) => CheckResult::pass(),
        Some(Value::Object(map)) if map.is_empty() => CheckResult::pass(),
        Some(_) => CheckResult::fail(vec!["execution_error_field_present".to_string()]),
    }
}

fn check_outputs_shape(raw: &Value) -> CheckResult {
    let Some(outputs) = raw.get("outputs").and_then(Value::as_object) else {
        return CheckResult::fail(vec!["outputs_not_object".to_string()]);
    };
    let writes = match outputs.get("writes") {
        None | Some(Value::Null) => return CheckResult::pass(),
        Some(Value::Array(writes)) => writes,
        Some(_) => return CheckResult::fail(vec!["writes_not_list".to_string()]),
    };
    for (index, write) in writes.iter().enumerate() {
        let Some(write) = write.as_object() else {
            return CheckResult::fail(vec![format!("write_record_not_object:{index}")]);
        };
        for key in WRITE_KEYS {
            if !write.contains_key(key) {
                return CheckResult::fail(vec![format!("write_record_missing_key:{index}:{key}")]);
            }
        }
    }
    CheckResult::pass()
}

fn check_writes(repo_root: &Path, raw: &Value) -> (CheckResult, WriteCounts) {
    let writes = raw
        .get("outputs")
        .and_then(Value::as_object)
        .and_then(|outputs| outputs.get("writes"))
        .and_then(Value::as_array);
    let Some(writes) = writes.filter(|writes| !writes.is_empty()) else {
        return (CheckResult::pass(), WriteCounts::default());
    };

    let mut counts = WriteCounts {
        present: true,
        ..WriteCounts::default()
    };
    let mut reasons = Vec::new();
    for (index, write) in writes.iter().enumerate() {
        let Some(write) = write.as_object() else {
            continue;
        };
        counts.checked += 1;
        match verify_write(repo_root, index, write) {
            Some(reason) => reasons.push(reason),
            None => counts.ok += 1,
        }
    }

    let result = if reasons.is_empty() {
        CheckResult::pass()
    } else {
        CheckResult::fail(reasons)
    };
    (result, counts)
}

/// Verify one declared write against disk; returns the failure reason, if any.
fn verify_write(repo_root: &Path, index: usize, write: &Map<String, Value>) -> Option<String> {
    let Some(declared_path) = write.get("path").and_then(Value::as_str) else {
        return Some(format!("write_path_invalid:{index}"));
    };
    let path = Path::new(declared_path);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    };

    let data = match fs::read(&resolved) {
        Ok(data) => data,
        Err(err) => {
            debug!(path = %resolved.display(), error = %err, "declared write unreadable");
            return Some(format!("write_file_missing:{declared_path}"));
        }
    };

    if let Some(expected) = write.get("bytes").and_then(Value::as_u64)
        && data.len() as u64 != expected
    {
        return Some(format!("write_bytes_mismatch:{declared_path}"));
    }

    if let Some(expected) = write.get("sha256").and_then(Value::as_str)
        && !expected.is_empty()
        && sha256_hex(&data) != expected
    {
        return Some(format!("write_sha_mismatch:{declared_path}"));
    }

    None
}

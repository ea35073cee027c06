//! Artifact types shared by the executor, the result builder and the evaluator.
//!
//! These are the persisted contracts. Field order here does not matter on disk:
//! all artifacts are written through the canonical encoder.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EXECUTION_RESULT_KIND: &str = "execution_result";
pub const EVALUATION_RESULT_KIND: &str = "evaluation_result";

/// Boundary view of an execution request.
///
/// Only `task_id` and `payload` are interpreted; everything else in the raw
/// request (transport metadata included) is carried opaquely.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub task_id: String,
    pub payload: Map<String, Value>,
}

impl ExecutionRequest {
    /// Validate a raw request: object, non-empty string `task_id`, object `payload`.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            bail!("execution request must be a JSON object");
        };
        let task_id = match map.get("task_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            Some(Value::String(_)) => bail!("execution request task_id must be non-empty"),
            Some(_) => bail!("execution request task_id must be a string"),
            None => bail!("execution request missing task_id"),
        };
        let payload = match map.get("payload") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(payload)) => payload.clone(),
            Some(_) => bail!("execution request payload must be an object"),
        };
        Ok(Self { task_id, payload })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Captured executor fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One manifest entry: a file the executor claims to have written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    /// Repo-relative path with `/` separators.
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Result of one execution, keyed by `request_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub kind: String,
    pub status: ExecutionStatus,
    pub request_hash: String,
    /// The raw request exactly as supplied.
    pub request: Value,
    pub outputs: Map<String, Value>,
    pub error: Option<ErrorInfo>,
}

impl ExecutionResult {
    pub fn success(request_hash: String, request: Value, outputs: Map<String, Value>) -> Self {
        Self {
            kind: EXECUTION_RESULT_KIND.to_string(),
            status: ExecutionStatus::Success,
            request_hash,
            request,
            outputs,
            error: None,
        }
    }

    pub fn failure(request_hash: String, request: Value, error: ErrorInfo) -> Self {
        Self {
            kind: EXECUTION_RESULT_KIND.to_string(),
            status: ExecutionStatus::Error,
            request_hash,
            request,
            outputs: Map::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Pass,
    Fail,
}

impl EvaluationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

/// Informational metadata; ignored by [`EvaluationResult::same_verdict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationMeta {
    pub produced_at: String,
    pub evaluator_version: String,
}

/// Mechanical verdict on an execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub kind: String,
    pub status: EvaluationStatus,
    pub request_hash: String,
    /// Failure codes in check order; empty iff `status == pass`.
    pub reasons: Vec<String>,
    pub checks: BTreeMap<String, Value>,
    #[serde(rename = "_meta")]
    pub meta: EvaluationMeta,
}

impl EvaluationResult {
    /// Equality over everything except `_meta`.
    pub fn same_verdict(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.status == other.status
            && self.request_hash == other.request_hash
            && self.reasons == other.reasons
            && self.checks == other.checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_requires_task_id() {
        let err = ExecutionRequest::from_value(&json!({"payload": {}})).expect_err("missing");
        assert!(err.to_string().contains("task_id"));
        let err = ExecutionRequest::from_value(&json!({"task_id": "  "})).expect_err("empty");
        assert!(err.to_string().contains("non-empty"));
        let err = ExecutionRequest::from_value(&json!({"task_id": 7})).expect_err("type");
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn request_payload_defaults_to_empty_object() {
        let request = ExecutionRequest::from_value(&json!({"task_id": "T1"})).expect("request");
        assert!(request.payload.is_empty());
        let request =
            ExecutionRequest::from_value(&json!({"task_id": "T1", "payload": null})).expect("null");
        assert!(request.payload.is_empty());
    }

    #[test]
    fn request_rejects_non_object_payload() {
        let err = ExecutionRequest::from_value(&json!({"task_id": "T1", "payload": [1]}))
            .expect_err("payload");
        assert!(err.to_string().contains("payload"));
        assert!(ExecutionRequest::from_value(&json!("T1")).is_err());
    }

    #[test]
    fn execution_result_serializes_null_error_and_type_field() {
        let ok = ExecutionResult::success("h".to_string(), json!({"task_id": "T1"}), Map::new());
        let value = serde_json::to_value(&ok).expect("serialize");
        assert_eq!(value["error"], Value::Null);
        assert_eq!(value["status"], "success");
        assert_eq!(value["kind"], EXECUTION_RESULT_KIND);

        let failed = ExecutionResult::failure(
            "h".to_string(),
            json!({"task_id": "T1"}),
            ErrorInfo {
                message: "boom".to_string(),
                kind: "Io".to_string(),
            },
        );
        let value = serde_json::to_value(&failed).expect("serialize");
        assert_eq!(value["error"], json!({"message": "boom", "type": "Io"}));
        assert_eq!(value["outputs"], json!({}));
    }

    #[test]
    fn same_verdict_ignores_meta() {
        let first = EvaluationResult {
            kind: EVALUATION_RESULT_KIND.to_string(),
            status: EvaluationStatus::Pass,
            request_hash: "h".to_string(),
            reasons: Vec::new(),
            checks: BTreeMap::new(),
            meta: EvaluationMeta {
                produced_at: "2026-01-01T00:00:00Z".to_string(),
                evaluator_version: "v1".to_string(),
            },
        };
        let mut second = first.clone();
        second.meta.produced_at = "2026-02-02T00:00:00Z".to_string();
        assert!(first.same_verdict(&second));
        second.status = EvaluationStatus::Fail;
        assert!(!first.same_verdict(&second));
    }

    #[test]
    fn status_labels_match_wire_format() {
        for status in [ExecutionStatus::Success, ExecutionStatus::Error] {
            assert_eq!(json!(status), json!(status.as_str()));
        }
        for status in [EvaluationStatus::Pass, EvaluationStatus::Fail] {
            assert_eq!(json!(status), json!(status.as_str()));
        }
    }
}

//! Executor abstraction and the deterministic file executor.
//!
//! The [`Executor`] trait decouples result building from what an execution
//! actually does. Tests use faulting or panicking executors from
//! `test_support` without touching the real file executor.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::fingerprint::sha256_hex;
use crate::core::types::WriteRecord;
use crate::io::persist::atomic_write;

/// Inputs for one execution.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub task_id: &'a str,
    pub payload: &'a Map<String, Value>,
    pub request_hash: &'a str,
    /// Root that manifest paths are relative to.
    pub workspace: &'a Path,
}

/// What an executor produced: free-form outputs plus the write manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutputs {
    pub outputs: Map<String, Value>,
    pub writes: Vec<WriteRecord>,
}

/// Executor failure. Contained by the result builder, never by the executor.
#[derive(Debug, Error)]
pub enum ExecutionFault {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("unsafe write path '{path}': {reason}")]
    UnsafePath { path: String, reason: &'static str },
    #[error("duplicate write path '{0}'")]
    DuplicatePath(String),
    #[error("write {path} failed: {message}")]
    Write { path: String, message: String },
    #[error("executor panicked: {0}")]
    Panicked(String),
}

impl ExecutionFault {
    /// Stable fault name recorded as `error.type`.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionFault::InvalidPayload(_) => "InvalidPayload",
            ExecutionFault::UnsafePath { .. } => "UnsafePath",
            ExecutionFault::DuplicatePath(_) => "DuplicatePath",
            ExecutionFault::Write { .. } => "WriteFailed",
            ExecutionFault::Panicked(_) => "Panicked",
        }
    }
}

/// Abstraction over execution backends.
///
/// Implementations must be deterministic: the same context over the same
/// workspace state yields the same outputs and the same writes.
pub trait Executor {
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionOutputs, ExecutionFault>;
}

/// Materializes `payload.files` (`[{path, content}]`) under the workspace.
///
/// Files are written in payload order through the atomic-write primitive.
/// Outputs are `{task_id, writes}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExecutor;

impl Executor for FileExecutor {
    #[instrument(skip_all, fields(task_id = ctx.task_id, request_hash = ctx.request_hash))]
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<ExecutionOutputs, ExecutionFault> {
        let files = parse_files(ctx.payload)?;

        let mut seen = BTreeSet::new();
        for file in &files {
            if !seen.insert(file.path.as_str()) {
                return Err(ExecutionFault::DuplicatePath(file.path.clone()));
            }
        }

        let mut writes = Vec::with_capacity(files.len());
        for file in &files {
            let target = ctx.workspace.join(&file.path);
            atomic_write(&target, file.content.as_bytes()).map_err(|err| {
                ExecutionFault::Write {
                    path: file.path.clone(),
                    message: format!("{err:#}"),
                }
            })?;
            debug!(path = %file.path, bytes = file.content.len(), "file written");
            writes.push(WriteRecord {
                path: file.path.clone(),
                sha256: sha256_hex(file.content.as_bytes()),
                bytes: file.content.len() as u64,
            });
        }

        let mut outputs = Map::new();
        outputs.insert("task_id".to_string(), Value::String(ctx.task_id.to_string()));
        outputs.insert(
            "writes".to_string(),
            serde_json::to_value(&writes)
                .map_err(|err| ExecutionFault::InvalidPayload(err.to_string()))?,
        );
        Ok(ExecutionOutputs { outputs, writes })
    }
}

#[derive(Debug)]
struct FileSpec {
    path: String,
    content: String,
}

fn parse_files(payload: &Map<String, Value>) -> Result<Vec<FileSpec>, ExecutionFault> {
    let entries = match payload.get("files") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ExecutionFault::InvalidPayload(
                "files must be a list".to_string(),
            ));
        }
    };

    let mut files = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            return Err(ExecutionFault::InvalidPayload(format!(
                "files[{index}] must be an object"
            )));
        };
        let Some(path) = entry.get("path").and_then(Value::as_str) else {
            return Err(ExecutionFault::InvalidPayload(format!(
                "files[{index}].path must be a string"
            )));
        };
        let Some(content) = entry.get("content").and_then(Value::as_str) else {
            return Err(ExecutionFault::InvalidPayload(format!(
                "files[{index}].content must be a string"
            )));
        };
        files.push(FileSpec {
            path: normalize_relative_path(path)?,
            content: content.to_string(),
        });
    }
    Ok(files)
}

/// Normalize a repo-relative path to `/`-separated normal components.
pub fn normalize_relative_path(raw: &str) -> Result<String, ExecutionFault> {
    let unsafe_path = |reason| ExecutionFault::UnsafePath {
        path: raw.to_string(),
        reason,
    };
    if raw.trim().is_empty() {
        return Err(unsafe_path("path is empty"));
    }
    if raw.contains('\\') {
        return Err(unsafe_path("path must use '/' separators"));
    }
    let mut parts = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => return Err(unsafe_path("path escapes the workspace")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path("path must be relative"));
            }
        }
    }
    if parts.is_empty() {
        return Err(unsafe_path("path has no file name"));
    }
    Ok(parts.join("/"))
}

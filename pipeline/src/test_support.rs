//! Test-only helpers: temp workspaces, request fixtures, scripted executors.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::executor::{ExecutionContext, ExecutionFault, ExecutionOutputs, Executor};
use crate::io::paths::PublicPaths;
use crate::io::persist::{append_log, write_json_slot};

/// Build a raw request whose payload materializes the given files.
pub fn request_with_files(task_id: &str, files: &[(&str, &str)]) -> Value {
    let files: Vec<Value> = files
        .iter()
        .map(|(path, content)| json!({"path": path, "content": content}))
        .collect();
    json!({"task_id": task_id, "payload": {"files": files}})
}

/// Temporary repository root with a `public/` directory inside it.
pub struct TestWorkspace {
    _temp: TempDir,
    root: PathBuf,
    paths: PublicPaths,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().to_path_buf();
        let paths = PublicPaths::new(root.join("public"));
        std::fs::create_dir_all(&paths.public_dir)?;
        Ok(Self {
            _temp: temp,
            root,
            paths,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &PublicPaths {
        &self.paths
    }

    /// Write the "last request" slot.
    pub fn write_request(&self, raw: &Value) -> Result<()> {
        write_json_slot(&self.paths.request_path, raw)
    }

    /// Append a request to the historical request log.
    pub fn log_request(&self, raw: &Value) -> Result<()> {
        append_log(&self.paths.request_log_path, raw)
    }
}

/// Executor that always fails with a payload fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultingExecutor;

impl Executor for FaultingExecutor {
    fn execute(&self, _ctx: &ExecutionContext<'_>) -> Result<ExecutionOutputs, ExecutionFault> {
        Err(ExecutionFault::InvalidPayload("scripted fault".to_string()))
    }
}

/// Executor that panics instead of returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingExecutor;

impl Executor for PanickingExecutor {
    fn execute(&self, _ctx: &ExecutionContext<'_>) -> Result<ExecutionOutputs, ExecutionFault> {
        panic!("scripted panic");
    }
}

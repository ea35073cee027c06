//! Execution result building: the single fault-containment point.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::fingerprint::{VolatileKeys, fingerprint};
use crate::core::types::{ErrorInfo, ExecutionRequest, ExecutionResult};
use crate::executor::{ExecutionContext, ExecutionFault, ExecutionOutputs, Executor};

/// Build the execution result for a raw request.
///
/// The request hash is computed over the raw value before validation. An
/// invalid request is an input error and is returned as `Err`. Everything the
/// executor does wrong, panics included, becomes a `status=error` result.
#[instrument(skip_all)]
pub fn build_execution_result<E: Executor>(
    raw: &Value,
    executor: &E,
    workspace: &Path,
    volatile: &VolatileKeys,
) -> Result<ExecutionResult> {
    let request_hash = fingerprint(raw, volatile);
    let request = ExecutionRequest::from_value(raw).context("validate execution request")?;

    let ctx = ExecutionContext {
        task_id: &request.task_id,
        payload: &request.payload,
        request_hash: &request_hash,
        workspace,
    };

    match run_contained(executor, &ctx) {
        Ok(ExecutionOutputs { outputs, writes }) => {
            info!(
                task_id = %request.task_id,
                %request_hash,
                writes = writes.len(),
                "execution succeeded"
            );
            Ok(ExecutionResult::success(request_hash, raw.clone(), outputs))
        }
        Err(fault) => {
            warn!(task_id = %request.task_id, %request_hash, fault = %fault, "execution failed");
            let error = ErrorInfo {
                message: fault.to_string(),
                kind: fault.kind().to_string(),
            };
            Ok(ExecutionResult::failure(request_hash, raw.clone(), error))
        }
    }
}

fn run_contained<E: Executor>(
    executor: &E,
    ctx: &ExecutionContext<'_>,
) -> Result<ExecutionOutputs, ExecutionFault> {
    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(ctx))) {
        Ok(result) => result,
        Err(payload) => Err(ExecutionFault::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

//! Consume orchestration.
//!
//! Coordinates request loading, result building, persistence and evaluation:
//! request -> execute -> build result -> persist -> evaluate -> persist.

use std::path::PathBuf;

use anyhow::{Context, Result};
use pipeline::core::fingerprint::VolatileKeys;
use pipeline::core::types::{EvaluationResult, ExecutionResult};
use pipeline::executor::Executor;
use pipeline::io::paths::PublicPaths;
use pipeline::io::persist::{append_log, read_json, write_json_slot};
use pipeline::result::build_execution_result;
use tracing::{debug, info, instrument};

use crate::judge::{ResultSchema, evaluate};

/// Everything a pipeline run needs, threaded explicitly through every call.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub paths: PublicPaths,
    /// Executor workspace; relative write paths resolve against it.
    pub repo_root: PathBuf,
    pub volatile: VolatileKeys,
}

/// Artifacts produced by one consume run.
#[derive(Debug)]
pub struct ConsumeOutcome {
    pub execution: ExecutionResult,
    pub evaluation: EvaluationResult,
}

/// Run the full pipeline against the request slot.
///
/// Executor faults are recorded as `status=error` results and still evaluated.
/// Only input errors (missing or malformed request) and I/O failures return `Err`.
#[instrument(skip_all, fields(public = %ctx.paths.public_dir.display()))]
pub fn consume<E: Executor>(
    ctx: &PipelineContext,
    executor: &E,
    schema: &ResultSchema,
) -> Result<ConsumeOutcome> {
    debug!("reading request slot");
    let raw = read_json(&ctx.paths.request_path).context("read execution request")?;

    let execution = build_execution_result(&raw, executor, &ctx.repo_root, &ctx.volatile)
        .context("build execution result")?;
    write_json_slot(&ctx.paths.result_path, &execution).context("write execution result")?;
    append_log(&ctx.paths.result_log_path, &execution).context("append execution result")?;

    let evaluation = evaluate_slot(ctx, schema)?;
    info!(
        request_hash = %execution.request_hash,
        execution = ?execution.status,
        evaluation = ?evaluation.status,
        "consume complete"
    );
    Ok(ConsumeOutcome {
        execution,
        evaluation,
    })
}

/// Evaluate the persisted result slot and persist the evaluation.
///
/// Reads the result back from disk so the verdict depends only on what was
/// persisted, not on in-memory state.
#[instrument(skip_all)]
pub fn evaluate_slot(ctx: &PipelineContext, schema: &ResultSchema) -> Result<EvaluationResult> {
    let raw = read_json(&ctx.paths.result_path).context("read execution result")?;
    let evaluation = evaluate(schema, &ctx.repo_root, &raw);
    write_json_slot(&ctx.paths.evaluation_path, &evaluation).context("write evaluation result")?;
    append_log(&ctx.paths.evaluation_log_path, &evaluation).context("append evaluation result")?;
    debug!(status = ?evaluation.status, reasons = ?evaluation.reasons, "evaluation persisted");
    Ok(evaluation)
}

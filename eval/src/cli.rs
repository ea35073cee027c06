//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use pipeline::core::canonical::encode_pretty;
use pipeline::core::types::EvaluationResult;
use pipeline::executor::FileExecutor;
use tracing::debug;

use crate::judge::ResultSchema;
use crate::replay::replay;
use crate::report::aggregate;
use crate::run::{PipelineContext, consume, evaluate_slot};
use crate::submit::submit_request;

/// Consume the request slot and evaluate the result.
pub fn consume_request(ctx: &PipelineContext) -> Result<()> {
    let schema = ResultSchema::bundled()?;
    let outcome = consume(ctx, &FileExecutor, &schema)?;
    println!(
        "consume: status={} request_hash={} evaluation={} result={}",
        outcome.execution.status.as_str(),
        outcome.execution.request_hash,
        outcome.evaluation.status.as_str(),
        ctx.paths.result_path.display()
    );
    print_reasons(&outcome.evaluation);
    Ok(())
}

/// Re-evaluate the persisted result slot.
pub fn evaluate_result(ctx: &PipelineContext) -> Result<()> {
    let schema = ResultSchema::bundled()?;
    let evaluation = evaluate_slot(ctx, &schema)?;
    println!(
        "evaluate: status={} request_hash={} evaluation={}",
        evaluation.status.as_str(),
        evaluation.request_hash,
        ctx.paths.evaluation_path.display()
    );
    print_reasons(&evaluation);
    Ok(())
}

/// Replay one logged request.
pub fn replay_request(
    ctx: &PipelineContext,
    request_hash: Option<&str>,
    index: Option<i64>,
) -> Result<()> {
    let schema = ResultSchema::bundled()?;
    let outcome = replay(ctx, &FileExecutor, &schema, request_hash, index)?;
    if outcome.malformed_lines > 0 {
        eprintln!(
            "warning: skipped {} malformed line(s) in {}",
            outcome.malformed_lines,
            ctx.paths.request_log_path.display()
        );
    }
    println!(
        "replay: index={} request_hash={} status={} evaluation={}",
        outcome.selection.index,
        outcome.selection.request_hash,
        outcome.consume.execution.status.as_str(),
        outcome.consume.evaluation.status.as_str()
    );
    print_reasons(&outcome.consume.evaluation);
    Ok(())
}

/// Record a request authored outside the pipeline.
pub fn submit(ctx: &PipelineContext, source: &Path) -> Result<()> {
    let submission = submit_request(&ctx.paths, source, &ctx.volatile)?;
    println!(
        "submit: task_id={} request_hash={} request={}",
        submission.task_id,
        submission.request_hash,
        ctx.paths.request_path.display()
    );
    Ok(())
}

/// Summarize the evaluation log.
pub fn report(ctx: &PipelineContext, json: bool) -> Result<()> {
    let summary = aggregate(&ctx.paths.evaluation_log_path)?;
    debug!(runs = summary.runs, "evaluation log aggregated");
    if json {
        print!("{}", encode_pretty(&summary).context("serialize report")?);
        return Ok(());
    }
    println!(
        "report: runs={} distinct_requests={}",
        summary.runs, summary.distinct_requests
    );
    println!(
        "report: pass={} fail={} unknown={}",
        summary.pass, summary.fail, summary.unknown
    );
    for (code, count) in &summary.reason_counts {
        println!("report: reason {code} {count}");
    }
    if summary.malformed > 0 {
        eprintln!(
            "warning: skipped {} malformed line(s) in {}",
            summary.malformed,
            ctx.paths.evaluation_log_path.display()
        );
    }
    Ok(())
}

fn print_reasons(evaluation: &EvaluationResult) {
    for reason in &evaluation.reasons {
        println!("reason: {reason}");
    }
}

//! Request submission: the entry point for requests authored outside the pipeline.
//!
//! A submitted request is validated, stamped with `created_at` when missing,
//! written into the request slot and appended to the request log that replay
//! reads from.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{SecondsFormat, Utc};
use pipeline::core::fingerprint::{VolatileKeys, fingerprint};
use pipeline::core::repair::repair_newlines_in_strings;
use pipeline::core::types::ExecutionRequest;
use pipeline::io::paths::PublicPaths;
use pipeline::io::persist::{append_log, read_text, write_json_slot};
use serde_json::Value;
use tracing::{info, instrument, warn};

/// A request accepted into the public directory.
#[derive(Debug, Clone)]
pub struct Submission {
    pub task_id: String,
    pub request_hash: String,
}

/// Parse request text, repairing literal newlines inside strings if needed.
pub fn parse_request_text(contents: &str) -> Result<Value> {
    match serde_json::from_str(contents) {
        Ok(value) => Ok(value),
        Err(original) => {
            let repaired = repair_newlines_in_strings(contents);
            let value = serde_json::from_str(&repaired)
                .map_err(|_| anyhow!("parse execution request: {original}"))?;
            warn!("execution request contained raw newlines inside strings; repaired");
            Ok(value)
        }
    }
}

/// Validate and record a request read from `source`.
#[instrument(skip_all, fields(source = %source.display()))]
pub fn submit_request(
    paths: &PublicPaths,
    source: &Path,
    volatile: &VolatileKeys,
) -> Result<Submission> {
    let contents = read_text(source)?;
    let mut raw = parse_request_text(&contents)
        .with_context(|| format!("read request {}", source.display()))?;
    let request = ExecutionRequest::from_value(&raw).context("validate execution request")?;

    if let Some(map) = raw.as_object_mut()
        && !map.contains_key("created_at")
    {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        map.insert("created_at".to_string(), Value::String(stamp));
    }

    let request_hash = fingerprint(&raw, volatile);
    write_json_slot(&paths.request_path, &raw).context("write execution request")?;
    append_log(&paths.request_log_path, &raw).context("append request log")?;
    info!(task_id = %request.task_id, %request_hash, "request submitted");

    Ok(Submission {
        task_id: request.task_id,
        request_hash,
    })
}

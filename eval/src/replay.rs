//! Deterministic replay of logged execution requests.
//!
//! Selection rules, in precedence order:
//! 1. `request_hash` (an empty string counts as absent): the first entry whose
//!    recomputed fingerprint matches.
//! 2. `index`: the 0-based entry in the log (malformed lines excluded).
//! 3. Otherwise the last entry.
//!
//! The chosen entry is written into the request slot and consumed exactly like
//! a live request.

use anyhow::{Context, Result};
use pipeline::core::fingerprint::{VolatileKeys, fingerprint, is_request_hash};
use pipeline::executor::Executor;
use pipeline::io::persist::{read_ndjson, write_json_slot};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::judge::ResultSchema;
use crate::run::{ConsumeOutcome, PipelineContext, consume};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no valid requests found to replay")]
    EmptyLog,
    #[error("request_hash not found in request log: {0}")]
    HashNotFound(String),
    #[error("index out of range: {index} (valid: 0..={last})")]
    IndexOutOfRange { index: i64, last: usize },
}

/// A selected log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub request: Map<String, Value>,
    pub request_hash: String,
}

/// Pick one request from the log entries.
pub fn select_request(
    entries: &[Map<String, Value>],
    request_hash: Option<&str>,
    index: Option<i64>,
    volatile: &VolatileKeys,
) -> Result<Selection, SelectionError> {
    if entries.is_empty() {
        return Err(SelectionError::EmptyLog);
    }
    let request_hash = request_hash.filter(|hash| !hash.is_empty());

    let selected = if let Some(wanted) = request_hash {
        entries
            .iter()
            .position(|entry| entry_hash(entry, volatile) == wanted)
            .ok_or_else(|| SelectionError::HashNotFound(wanted.to_string()))?
    } else if let Some(index) = index {
        usize::try_from(index)
            .ok()
            .filter(|position| *position < entries.len())
            .ok_or(SelectionError::IndexOutOfRange {
                index,
                last: entries.len() - 1,
            })?
    } else {
        entries.len() - 1
    };

    let request = entries[selected].clone();
    Ok(Selection {
        index: selected,
        request_hash: entry_hash(&request, volatile),
        request,
    })
}

fn entry_hash(entry: &Map<String, Value>, volatile: &VolatileKeys) -> String {
    fingerprint(&Value::Object(entry.clone()), volatile)
}

/// Result of a replay: the selection plus the consumed artifacts.
#[derive(Debug)]
pub struct ReplayOutcome {
    pub selection: Selection,
    /// Log lines skipped because they were not JSON objects.
    pub malformed_lines: usize,
    pub consume: ConsumeOutcome,
}

/// Replay a logged request through the full pipeline.
///
/// Selection errors are raised before anything is written.
#[instrument(skip_all, fields(request_hash = ?request_hash, index = ?index))]
pub fn replay<E: Executor>(
    ctx: &PipelineContext,
    executor: &E,
    schema: &ResultSchema,
    request_hash: Option<&str>,
    index: Option<i64>,
) -> Result<ReplayOutcome> {
    let request_hash = request_hash.filter(|hash| !hash.is_empty());
    if request_hash.is_some() && index.is_some() {
        warn!("both request_hash and index given; request_hash takes precedence");
    }
    if let Some(hash) = request_hash
        && !is_request_hash(hash)
    {
        warn!(request_hash = hash, "request_hash is not 64 lowercase hex characters");
    }
    let log = read_ndjson(&ctx.paths.request_log_path).context("read request log")?;
    let selection = select_request(&log.entries, request_hash, index, &ctx.volatile)
        .context("select request")?;
    info!(
        selected_index = selection.index,
        selected_request_hash = %selection.request_hash,
        malformed = log.malformed,
        "request selected"
    );

    write_json_slot(&ctx.paths.request_path, &selection.request)
        .context("write execution request")?;
    let consume = consume(ctx, executor, schema)?;

    Ok(ReplayOutcome {
        selection,
        malformed_lines: log.malformed,
        consume,
    })
}

//! Deterministic execution and verification pipeline CLI.
//!
//! Consumes the request slot under the public directory, persists a
//! content-addressed execution result, evaluates it mechanically and can
//! replay any logged request to reproduce the same verdict.

mod cli;
mod config;
mod judge;
mod outcome;
mod replay;
mod report;
mod run;
mod submit;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pipeline::exit_codes;

use crate::config::{Locations, resolve_context};

#[derive(Parser)]
#[command(
    name = "eval",
    version,
    about = "Deterministic execution and verification pipeline"
)]
struct Cli {
    #[command(flatten)]
    locations: Locations,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the request slot, persist the result and evaluate it.
    Consume,
    /// Re-evaluate the persisted result slot.
    Evaluate,
    /// Re-run a request from the request log.
    Replay {
        /// Select the first log entry with this fingerprint.
        #[arg(long)]
        request_hash: Option<String>,
        /// Select the 0-based log entry (ignored when --request-hash is given).
        #[arg(long, allow_negative_numbers = true)]
        index: Option<i64>,
    },
    /// Record a request file into the request slot and log.
    Submit {
        #[arg(long)]
        request: PathBuf,
    },
    /// Summarize the evaluation log.
    Report {
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    pipeline::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let ctx = resolve_context(&cwd, &cli.locations)?;

    match cli.command {
        Command::Consume => cli::consume_request(&ctx),
        Command::Evaluate => cli::evaluate_result(&ctx),
        Command::Replay {
            request_hash,
            index,
        } => cli::replay_request(&ctx, request_hash.as_deref(), index),
        Command::Submit { request } => cli::submit(&ctx, &cwd.join(request)),
        Command::Report { json } => cli::report(&ctx, json),
    }
}

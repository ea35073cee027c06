//! Pipeline context resolution.
//!
//! Merges `pipeline.toml` with command-line overrides into the context every
//! command threads through the pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use pipeline::io::config::load_config;
use pipeline::io::paths::PublicPaths;
use tracing::debug;

use crate::run::PipelineContext;

/// Location flags shared by every command.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct Locations {
    /// Directory holding request, result and evaluation artifacts.
    #[arg(long, global = true, default_value = "public")]
    pub public: PathBuf,
    /// Root that relative write paths resolve against (default: current directory).
    #[arg(long, global = true)]
    pub repo_root: Option<PathBuf>,
    /// Pipeline config file; missing file means defaults.
    #[arg(long, global = true, default_value = "pipeline.toml")]
    pub config: PathBuf,
}

/// Resolve the context relative to `cwd`.
///
/// `repo_root` precedence: command line, then config file, then `cwd`.
pub fn resolve_context(cwd: &Path, locations: &Locations) -> Result<PipelineContext> {
    let config_path = cwd.join(&locations.config);
    let cfg = load_config(&config_path).context("load pipeline config")?;

    let repo_root = match (&locations.repo_root, &cfg.repo_root) {
        (Some(root), _) => cwd.join(root),
        (None, Some(root)) => cwd.join(root),
        (None, None) => cwd.to_path_buf(),
    };
    let public_dir = cwd.join(&locations.public);
    debug!(
        public = %public_dir.display(),
        repo_root = %repo_root.display(),
        volatile = ?cfg.volatile_keys,
        "context resolved"
    );

    Ok(PipelineContext {
        paths: PublicPaths::new(public_dir),
        repo_root,
        volatile: cfg.volatile(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::core::fingerprint::VolatileKeys;
    use std::fs;

    fn locations(repo_root: Option<&str>) -> Locations {
        Locations {
            public: PathBuf::from("public"),
            repo_root: repo_root.map(PathBuf::from),
            config: PathBuf::from("pipeline.toml"),
        }
    }

    #[test]
    fn defaults_without_config_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = resolve_context(temp.path(), &locations(None)).expect("resolve");
        assert_eq!(ctx.repo_root, temp.path());
        assert_eq!(ctx.paths.public_dir, temp.path().join("public"));
        assert_eq!(ctx.volatile, VolatileKeys::default());
    }

    #[test]
    fn config_file_sets_repo_root_and_keys() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(
            temp.path().join("pipeline.toml"),
            "repo_root = \"workspace\"\nvolatile_keys = [\"created_at\", \"_meta\", \"trace_id\"]\n",
        )
        .expect("config");
        let ctx = resolve_context(temp.path(), &locations(None)).expect("resolve");
        assert_eq!(ctx.repo_root, temp.path().join("workspace"));
        assert!(ctx.volatile.contains("trace_id"));
    }

    #[test]
    fn command_line_repo_root_wins() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("pipeline.toml"), "repo_root = \"from-config\"\n")
            .expect("config");
        let ctx = resolve_context(temp.path(), &locations(Some("from-cli"))).expect("resolve");
        assert_eq!(ctx.repo_root, temp.path().join("from-cli"));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("pipeline.toml"), "volatile_keys = [\"payload\"]\n")
            .expect("config");
        assert!(resolve_context(temp.path(), &locations(None)).is_err());
    }
}

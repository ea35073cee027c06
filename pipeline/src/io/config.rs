//! Pipeline configuration stored in `pipeline.toml`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::fingerprint::VolatileKeys;

/// Request keys that define identity and can never be volatile.
const IDENTITY_KEYS: [&str; 2] = ["task_id", "payload"];

/// Pipeline configuration (TOML).
///
/// Missing fields default to the values the pipeline has always used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Top-level request keys excluded from the request hash.
    pub volatile_keys: Vec<String>,

    /// Root that relative write paths resolve against. Defaults to the
    /// working directory of the invoking command.
    pub repo_root: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            volatile_keys: VolatileKeys::default().iter().map(String::from).collect(),
            repo_root: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for key in &self.volatile_keys {
            if key.trim().is_empty() {
                return Err(anyhow!("volatile_keys entries must be non-empty"));
            }
            if IDENTITY_KEYS.contains(&key.as_str()) {
                return Err(anyhow!("volatile_keys must not contain identity key '{key}'"));
            }
            if !seen.insert(key.as_str()) {
                return Err(anyhow!("volatile_keys contains duplicate '{key}'"));
            }
        }
        if let Some(root) = &self.repo_root
            && root.as_os_str().is_empty()
        {
            return Err(anyhow!("repo_root must be non-empty when set"));
        }
        Ok(())
    }

    pub fn volatile(&self) -> VolatileKeys {
        VolatileKeys::new(self.volatile_keys.iter().cloned())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PipelineConfig::default()`.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = PipelineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PipelineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

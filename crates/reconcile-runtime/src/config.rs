//! Pipeline configuration (§6.1): the scalar values every stage reads, loaded from a TOML
//! file with the teacher's read-if-exists-else-default precedence
//! (`agtrace_runtime::config::Config::load_from`). The structured coding-sync and analysis
//! blocks (code schemes, auto-coders) are deployment code, not config-file data — spec.md's
//! Non-goals exclude config-file parsing beyond a straightforward TOML load, and an
//! auto-coder is a Rust function pointer that has no TOML representation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reconcile_store::MessageFilter;

use crate::error::{Error, Result};

/// Resolves the pipeline config file path: explicit path, then `RECONCILE_CONFIG`, then
/// `~/.reconcile/config.toml`.
pub fn resolve_config_path(explicit_path: Option<&str>) -> PathBuf {
    if let Some(path) = explicit_path {
        return expand_tilde(path);
    }
    if let Ok(env_path) = std::env::var("RECONCILE_CONFIG") {
        return expand_tilde(&env_path);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".reconcile").join("config.toml");
    }
    PathBuf::from("reconcile.toml")
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipeline_name: String,
    #[serde(default)]
    pub test_participant_uuids: Vec<String>,
    #[serde(default)]
    pub filter_test_messages: bool,
    pub project_start_date: DateTime<Utc>,
    pub project_end_date: DateTime<Utc>,
    #[serde(default)]
    pub default_ws_dataset: Option<String>,
    #[serde(default)]
    pub set_dataset_from_ws_string_value: bool,
    #[serde(default)]
    pub incremental_cache_path: Option<PathBuf>,
    /// Path to the SQLite-backed engagement database every stage reads and writes.
    pub engagement_db_path: PathBuf,
    /// Provenance fields stamped on every `HistoryEntry` (§6.4): the deployment's git
    /// remote url and HEAD commit SHA, resolved once at deploy time rather than by opening
    /// a repository at runtime.
    pub project: String,
    pub commit: String,
}

impl PipelineConfig {
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        Self::load_from(&resolve_config_path(explicit_path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!("no pipeline configuration found at {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The incremental-cache directory this pipeline reads/writes watermarks from: the
    /// explicit `--incremental-cache-path` flag wins, then the config value, then a
    /// pipeline-named subdirectory of the default workspace path.
    pub fn cache_path(&self, explicit: Option<&str>) -> PathBuf {
        if let Some(path) = explicit {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.incremental_cache_path {
            return path.clone();
        }
        PathBuf::from(".reconcile-cache").join(&self.pipeline_name)
    }

    /// The `MessageFilter` every stage applies to engagement-DB reads (SPEC_FULL
    /// supplement 5): excludes (or, in a test run, includes-only) messages whose
    /// participant is in `test_participant_uuids`.
    pub fn message_filter(&self) -> MessageFilter {
        MessageFilter {
            test_participant_uuids: self.test_participant_uuids.clone(),
            exclude_test_participants: self.filter_test_messages,
            ..Default::default()
        }
    }
}

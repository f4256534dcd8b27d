//! Provenance stamping (§6.4): builds the `{user, project, pipeline, commit, timestamp}`
//! tuple attached to every `HistoryEntry`. `project`/`commit` come from the pipeline's own
//! deployment configuration rather than a `git2` query against a runtime repository (the
//! teacher's `agtrace-runtime` resolves these live via `git2` because it inspects a
//! repository under analysis; here they describe the pipeline deployment itself, which has
//! no repository to open at runtime).

use chrono::Utc;
use serde_json::Value;

use reconcile_types::HistoryEntry;

use crate::config::PipelineConfig;

/// Everything a stage needs to stamp a `HistoryEntry`, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub actor: String,
    pub project: String,
    pub pipeline: String,
    pub commit: String,
}

impl Provenance {
    pub fn new(actor: impl Into<String>, config: &PipelineConfig) -> Self {
        Provenance {
            actor: actor.into(),
            project: config.project.clone(),
            pipeline: config.pipeline_name.clone(),
            commit: config.commit.clone(),
        }
    }

    pub fn stamp(&self, origin_name: impl Into<String>, details: Value) -> HistoryEntry {
        HistoryEntry::new(origin_name, details, self.actor.clone(), self.project.clone(), self.pipeline.clone(), self.commit.clone(), Utc::now())
    }
}

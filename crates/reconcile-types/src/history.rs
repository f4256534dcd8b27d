use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance stamp attached to every mutation of a [`crate::Message`] (§3.1, §6.4,
/// Invariant 5). Append-only: a mutation always adds exactly one `HistoryEntry`, never
/// rewrites or removes an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub origin_name: String,
    pub details: serde_json::Value,
    pub actor: String,
    pub project: String,
    pub pipeline: String,
    pub commit: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        origin_name: impl Into<String>,
        details: serde_json::Value,
        actor: impl Into<String>,
        project: impl Into<String>,
        pipeline: impl Into<String>,
        commit: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        HistoryEntry {
            origin_name: origin_name.into(),
            details,
            actor: actor.into(),
            project: project.into(),
            pipeline: pipeline.into(),
            commit: commit.into(),
            timestamp,
        }
    }
}

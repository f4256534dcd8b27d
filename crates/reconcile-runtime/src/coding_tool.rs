//! Coding-tool client abstraction (§4.F). The trait itself (`CodingToolClient`) lives in
//! `reconcile_engine::coding_tool`, not here: `reconcile-engine`'s forward/back-sync and
//! scheme-reconciler functions are generic over it, and `reconcile-engine` cannot depend on
//! `reconcile-runtime` (the dependency would be circular, since this crate already depends
//! on `reconcile-engine`). Re-exported here so callers find it where §4.F names it.
//!
//! `InMemoryCodingTool` is the one concrete client this crate ships, used by tests and by
//! `--dry-run` exercising; a production client (the real coding-tool API) is out of scope
//! per spec.md §1 and would satisfy the same trait.

use std::collections::HashMap;

pub use reconcile_engine::{CodingMessage, CodingToolClient};
use reconcile_types::CodeScheme;

#[derive(Debug, Clone, Default)]
struct Dataset {
    user_ids: Option<Vec<String>>,
    schemes: Vec<CodeScheme>,
    messages: HashMap<String, CodingMessage>,
}

/// Keeps every Coda dataset's user list, code schemes, and messages in memory, keyed by
/// `coda_dataset_id`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCodingTool {
    datasets: HashMap<String, Dataset>,
}

impl InMemoryCodingTool {
    pub fn new() -> Self {
        InMemoryCodingTool::default()
    }
}

impl CodingToolClient for InMemoryCodingTool {
    fn get_dataset_user_ids(&self, coda_dataset_id: &str) -> Option<Vec<String>> {
        self.datasets.get(coda_dataset_id).and_then(|d| d.user_ids.clone())
    }

    fn set_dataset_user_ids(&mut self, coda_dataset_id: &str, user_ids: Vec<String>) {
        self.datasets.entry(coda_dataset_id.to_string()).or_default().user_ids = Some(user_ids);
    }

    fn get_all_code_schemes(&self, coda_dataset_id: &str) -> Vec<CodeScheme> {
        self.datasets.get(coda_dataset_id).map(|d| d.schemes.clone()).unwrap_or_default()
    }

    fn add_and_update_dataset_code_schemes(&mut self, coda_dataset_id: &str, schemes: Vec<CodeScheme>) {
        let dataset = self.datasets.entry(coda_dataset_id.to_string()).or_default();
        for scheme in schemes {
            dataset.schemes.retain(|s| s.scheme_id != scheme.scheme_id);
            dataset.schemes.push(scheme);
        }
    }

    fn add_message_to_dataset(&mut self, coda_dataset_id: &str, message: CodingMessage) {
        self.datasets
            .entry(coda_dataset_id.to_string())
            .or_default()
            .messages
            .insert(message.coda_id.clone(), message);
    }

    fn get_dataset_message(&self, coda_dataset_id: &str, coda_id: &str) -> Option<CodingMessage> {
        self.datasets.get(coda_dataset_id).and_then(|d| d.messages.get(coda_id).cloned())
    }

    fn update_dataset_message(&mut self, coda_dataset_id: &str, message: CodingMessage) {
        self.add_message_to_dataset(coda_dataset_id, message);
    }

    fn iter_dataset_messages(&self, coda_dataset_id: &str) -> Vec<CodingMessage> {
        self.datasets.get(coda_dataset_id).map(|d| d.messages.values().cloned().collect()).unwrap_or_default()
    }
}

//! Coding-tool boundary (§4.F). `reconcile-engine` depends only on this trait and on
//! [`CodingMessage`], never on a concrete coding-tool backend — the concrete in-memory
//! client used by the runtime lives in `reconcile-runtime` and implements this trait.

use chrono::{DateTime, Utc};
use reconcile_types::{CodeScheme, Label};

/// A message as stored on the coding-tool side. Distinct from [`reconcile_types::Message`]
/// because the coding tool only ever sees the fields coders need: text, timestamp and label
/// history. It keeps its own newest-first label history in the same shape as the
/// engagement-db message so [`reconcile_types::latest_labels`] applies unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct CodingMessage {
    pub coda_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub labels: Vec<Label>,
}

impl CodingMessage {
    pub fn new(coda_id: impl Into<String>, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        CodingMessage {
            coda_id: coda_id.into(),
            text: text.into(),
            created_at,
            labels: Vec::new(),
        }
    }

    pub fn latest_labels(&self) -> &[Label] {
        reconcile_types::latest_labels(&self.labels)
    }
}

/// The operations forward sync, back sync and scheme sync need from a coding tool
/// (§4.F–§4.I). A dataset here is identified by its Coda dataset id, not the engagement-db
/// dataset name.
pub trait CodingToolClient {
    fn get_dataset_user_ids(&self, coda_dataset_id: &str) -> Option<Vec<String>>;

    fn set_dataset_user_ids(&mut self, coda_dataset_id: &str, user_ids: Vec<String>);

    fn get_all_code_schemes(&self, coda_dataset_id: &str) -> Vec<CodeScheme>;

    /// Adds schemes present in `schemes` but not yet in the dataset, and overwrites any
    /// scheme whose content differs structurally from what's already there (§4.I).
    fn add_and_update_dataset_code_schemes(&mut self, coda_dataset_id: &str, schemes: Vec<CodeScheme>);

    fn add_message_to_dataset(&mut self, coda_dataset_id: &str, message: CodingMessage);

    fn get_dataset_message(&self, coda_dataset_id: &str, coda_id: &str) -> Option<CodingMessage>;

    fn update_dataset_message(&mut self, coda_dataset_id: &str, message: CodingMessage);

    fn has_message(&self, coda_dataset_id: &str, coda_id: &str) -> bool {
        self.get_dataset_message(coda_dataset_id, coda_id).is_some()
    }

    /// All messages currently in the dataset, for back sync's sweep (§4.H).
    fn iter_dataset_messages(&self, coda_dataset_id: &str) -> Vec<CodingMessage>;
}

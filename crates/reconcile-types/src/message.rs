use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::HistoryEntry;
use crate::label::Label;
use crate::origin::MessageOrigin;

/// Direction a message travelled relative to the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

/// Lifecycle status of a message. `Deleted` messages are retained (never physically
/// removed, per §3.3) but excluded from projection and sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Live,
    Deleted,
}

/// Canonical engagement-database entity (§3.1). `message_id` is unique within the
/// engagement DB; `origin.origin_id` is unique across the upstream universe and is the
/// deduplication key (Invariant 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub participant_uuid: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub channel_operator: String,
    pub status: MessageStatus,
    pub dataset: String,
    /// Newest-first label history. Never truncated; mutation always prepends.
    pub labels: Vec<Label>,
    /// Ordered trail of datasets this message has previously been routed to, oldest first
    /// (Invariant 2: never contains the current `dataset`).
    pub previous_datasets: Vec<String>,
    pub coda_id: Option<String>,
    pub origin: MessageOrigin,
    pub history: Vec<HistoryEntry>,
}

/// Computes the *latest labels* of a label history: the maximal prefix whose elements have
/// pairwise-distinct `scheme_id`s (§3.2 Invariant 2, §4.A). Every history mutation this
/// system performs either overwrites the whole label list or prepends a batch of
/// scheme-distinct labels, so a single front-to-back scan that stops at the first repeated
/// `scheme_id` always yields exactly that maximal prefix. Shared by [`Message`] and by
/// coding-tool-side message types that keep their own label history in the same shape.
pub fn latest_labels(labels: &[Label]) -> &[Label] {
    let mut seen = HashSet::new();
    let mut len = 0;
    for label in labels {
        if !seen.insert(label.scheme_id.as_str()) {
            break;
        }
        len += 1;
    }
    &labels[..len]
}

impl Message {
    pub fn latest_labels(&self) -> &[Label] {
        latest_labels(&self.labels)
    }

    /// Returns the latest label for `scheme_id`, if the scheme appears in the latest-labels
    /// prefix.
    pub fn latest_label_for_scheme(&self, scheme_id: &str) -> Option<&Label> {
        self.latest_labels().iter().find(|l| l.scheme_id == scheme_id)
    }

    /// Appends `entry` to the history log. The only legal way to grow `history`
    /// (Invariant 5: every state-changing operation appends exactly one entry).
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    /// Prepends `new_labels` to the label history, preserving older entries. Callers are
    /// responsible for keeping per-scheme `date_time_utc` non-increasing (Invariant 4).
    pub fn prepend_labels(&mut self, new_labels: impl IntoIterator<Item = Label>) {
        let mut prepended: Vec<Label> = new_labels.into_iter().collect();
        prepended.append(&mut self.labels);
        self.labels = prepended;
    }

    /// Replaces the label history outright (used by back-sync's plain `UPDATE_LABELS`
    /// branch and by WS-correction/cycle-fix clearing).
    pub fn overwrite_labels(&mut self, labels: Vec<Label>) {
        self.labels = labels;
    }

    /// Moves this message to `target`, recording the outgoing dataset in
    /// `previous_datasets` (§4.H step 7, P3).
    pub fn redirect_to(&mut self, target: impl Into<String>) {
        let previous = std::mem::replace(&mut self.dataset, target.into());
        self.previous_datasets.push(previous);
    }

    /// Resets routing to the first dataset this message ever passed through and clears its
    /// label history, as performed by WS cycle-fix (§4.H step 6, P4).
    pub fn reset_to_origin_dataset(&mut self) {
        if let Some(first) = self.previous_datasets.first().cloned() {
            self.dataset = first;
        }
        self.previous_datasets.clear();
        self.labels.clear();
    }
}

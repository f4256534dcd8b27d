//! Origin-keyed deduplication (§4.B). `DuplicateIgnored` is a [`SyncEvent`], not a hard
//! error: it is counted and the adapter run continues.

use reconcile_types::{HistoryEntry, Message};

use crate::sync_event::SyncEvent;

/// The subset of the engagement DB client an adapter needs to de-duplicate and persist
/// incoming messages. `reconcile-store::EngagementDb` implements this; kept as a trait here
/// so `reconcile-sources` never depends on `reconcile-store` directly.
pub trait MessageSink {
    fn has_origin_id(&self, origin_id: &str) -> bool;
    fn insert_message(&mut self, message: Message, history: HistoryEntry);
}

/// Ensures `message` exists in `sink`, inserting it (with `history`) only if no message
/// with the same `origin.origin_id` is already present (Invariant 1).
pub fn ensure_message_exists(sink: &mut dyn MessageSink, message: Message, history: HistoryEntry) -> SyncEvent {
    if sink.has_origin_id(&message.origin.origin_id) {
        tracing::debug!(origin_id = %message.origin.origin_id, "message already in engagement database");
        return SyncEvent::MessageAlreadyInEngagementDb;
    }
    tracing::debug!(dataset = %message.dataset, "adding message to engagement database");
    sink.insert_message(message, history);
    SyncEvent::AddMessageToEngagementDb
}

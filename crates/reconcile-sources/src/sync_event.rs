//! Sync event bookkeeping (§7): every component emits one `SyncEvent` per unit of work,
//! aggregated into a `SyncStats` counter printed at the end of every run. Grounded in
//! `kobotoolbox_to_engagement_db/sync_stats.py`'s `KoboToolBoxSyncEvents`/
//! `KoboToolBoxToEngagementDBSyncStats`.

use std::collections::BTreeMap;
use std::fmt;

/// Kinds of events a source adapter can emit while syncing one upstream record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncEvent {
    ReadRecordFromSource,
    ReadFieldFromRecord,
    FoundNullResponse,
    InvalidIdentifierIgnored,
    MessageAlreadyInEngagementDb,
    AddMessageToEngagementDb,
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncEvent::ReadRecordFromSource => "READ_RECORD_FROM_SOURCE",
            SyncEvent::ReadFieldFromRecord => "READ_FIELD_FROM_RECORD",
            SyncEvent::FoundNullResponse => "FOUND_A_NULL_RESPONSE",
            SyncEvent::InvalidIdentifierIgnored => "INVALID_IDENTIFIER_IGNORED",
            SyncEvent::MessageAlreadyInEngagementDb => "MESSAGE_ALREADY_IN_ENGAGEMENT_DB",
            SyncEvent::AddMessageToEngagementDb => "ADD_MESSAGE_TO_ENGAGEMENT_DB",
        };
        write!(f, "{s}")
    }
}

/// Event counter for one adapter run (or, via [`SyncStats::add_stats`], the aggregate
/// across every source of one stage). Printed per-source and as a grand total (§7,
/// supplement 2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    counts: BTreeMap<SyncEvent, u64>,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, event: SyncEvent) {
        *self.counts.entry(event).or_insert(0) += 1;
    }

    pub fn add_stats(&mut self, other: &SyncStats) {
        for (event, count) in &other.counts {
            *self.counts.entry(*event).or_insert(0) += count;
        }
    }

    pub fn count(&self, event: SyncEvent) -> u64 {
        self.counts.get(&event).copied().unwrap_or(0)
    }

    pub fn print_summary(&self) {
        for (event, count) in &self.counts {
            tracing::info!(event = %event, count, "sync event");
        }
    }
}

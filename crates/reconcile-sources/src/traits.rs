//! The adapter contract every source conforms to (§4.D), mirroring the teacher's
//! `LogProvider`/`SessionParser` discovery+parse split: one trait for pulling raw upstream
//! records, one method for mapping a record to canonical message proposals.

use chrono::{DateTime, Utc};

use reconcile_types::Message;

use crate::error::Result;

/// A per-source incremental position: either a submission-time watermark (flow/web-form
/// platforms) or an opaque cursor (group crawler's min-message-id).
#[derive(Debug, Clone, PartialEq)]
pub enum Watermark {
    Timestamp(DateTime<Utc>),
    Cursor(i64),
}

/// One `(dataset, Message)` proposal produced by mapping an upstream record (§4.D step 2).
/// An adapter may emit more than one proposal per record (one per configured question /
/// answer field).
#[derive(Debug, Clone)]
pub struct MessageProposal {
    pub dataset: String,
    pub message: Message,
}

/// Result of mapping one upstream record. `null_fields` lists configured fields that were
/// absent from the record: each one is skipped rather than failing the whole record
/// (supplement 3, `FOUND_A_NULL_RESPONSE`).
#[derive(Debug, Clone, Default)]
pub struct MapOutcome {
    pub proposals: Vec<MessageProposal>,
    pub null_fields: Vec<String>,
}

/// Conforms every concrete source to the same two-step shape: `fetch` pulls a finite,
/// non-restartable batch since an optional watermark; `map` turns one record into zero or
/// more message proposals.
pub trait SourceAdapter {
    type Record;

    /// Source identifier used as the incremental-cache key (§4.C).
    fn source_id(&self) -> &str;

    /// Pulls upstream records submitted after `since`, ascending by submission time so that
    /// a crash mid-run leaves a consistent high-watermark (§4.D Ordering).
    fn fetch(&self, since: Option<&Watermark>) -> Result<Vec<Self::Record>>;

    /// Maps one upstream record to its message proposals.
    fn map(&self, record: &Self::Record) -> Result<MapOutcome>;

    /// Watermark to advance to after `record` has been fully committed.
    fn watermark_for(&self, record: &Self::Record) -> Watermark;
}

//! Upstream source adapters: pulling batches from heterogeneous upstream channels,
//! mapping them to canonical messages, de-duplicating by origin id, and validating
//! participant identity fields.

pub mod adapters;
pub mod dedup;
pub mod error;
pub mod identity;
pub mod sync_event;
pub mod traits;

pub use adapters::{FlowPlatformAdapter, GroupCrawlerAdapter, WebFormAdapter};
pub use dedup::{ensure_message_exists, MessageSink};
pub use error::{Error, Result};
pub use identity::IdentityTable;
pub use sync_event::{SyncEvent, SyncStats};
pub use traits::{MapOutcome, MessageProposal, SourceAdapter, Watermark};

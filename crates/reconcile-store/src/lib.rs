//! Persistence layer: the SQLite-backed engagement database client and the incremental
//! per-source watermark cache.

pub mod cache;
pub mod engagement_db;
pub mod error;

pub use cache::Cache;
pub use engagement_db::{EngagementDb, EngagementDbTransaction, MessageFilter};
pub use error::{Error, Result};

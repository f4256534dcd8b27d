//! Runtime assembly for the reconciliation pipeline: config loading, provenance stamping,
//! the in-memory coding-tool client, per-stage sync stats, and the CLI-facing ops that tie
//! `reconcile-sources`/`reconcile-store`/`reconcile-engine` together.

pub mod coding_tool;
pub mod config;
pub mod error;
pub mod ops;
pub mod provenance;
pub mod stats;

pub use coding_tool::{CodingMessage, CodingToolClient, InMemoryCodingTool};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use ops::{project_column_view, sync_coda_to_engagement_db, sync_engagement_db_to_coda, sync_source_to_engagement_db, write_column_view_csv, ProjectionKind, WatermarkKind};
pub use provenance::Provenance;
pub use stats::StageStats;

//! Pure sync and coding logic: forward sync (engagement-db -> Coda), back sync
//! (Coda -> engagement-db) with WS correction and cycle detection, code-scheme
//! reconciliation, the two-pass imputation engine, and column-view projection. No I/O:
//! callers (`reconcile-runtime`) own the engagement-db connection and the concrete
//! coding-tool client and pass data in and out as plain values.

pub mod back_sync;
pub mod coding_tool;
pub mod config;
pub mod error;
pub mod forward_sync;
pub mod imputation;
pub mod projection;
pub mod scheme_sync;

pub use back_sync::{update_message_from_coda, BackSyncEvent};
pub use coding_tool::{CodingMessage, CodingToolClient};
pub use config::{CodaDatasetConfig, CodaSyncConfig, CodeSchemeConfig};
pub use error::{Error, Result};
pub use forward_sync::sync_message_to_coda;
pub use imputation::{
    impute_age_category, impute_kenya_location, impute_not_reviewed_or_coding_error, impute_ws_coding_error, AgeCategoryConfig, AgeRange,
    KenyaLocationConfig, LocationHierarchy, StaticKenyaLocationHierarchy,
};
pub use projection::{
    impute_consent_withdrawn, impute_not_internally_consistent, impute_true_missing, project_per_message, project_per_participant,
    AnalysisColumnConfig, ColumnViewRow, DatasetType,
};
pub use scheme_sync::{sync_users_and_code_schemes, SchemeSyncReport, UserIdSource};

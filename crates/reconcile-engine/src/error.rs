use reconcile_types::Error as TypesError;

/// Result type for reconcile-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds raised by sync and imputation (§7). `CycleDetected` is not actually
/// constructed as an error in normal operation — cycles trigger [`crate::back_sync::fix_ws_cycle`]
/// instead — but the variant is kept so callers can report it if a cycle fix itself fails.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("label references an unknown scheme or code: {0}")]
    LabelSchemeViolation(#[from] TypesError),

    #[error("label '{code_id}' is not valid for Coda dataset '{dataset}' (scheme '{scheme_id}')")]
    InvalidCodaLabel {
        dataset: String,
        scheme_id: String,
        code_id: String,
    },

    #[error("WS code could not be mapped to any dataset for message '{message_id}'")]
    NoRedirectTarget { message_id: String },

    #[error("cycle fix failed for message '{message_id}': {reason}")]
    CycleDetected { message_id: String, reason: String },

    #[error("no dataset configuration found for engagement dataset '{0}'")]
    UnknownDataset(String),

    #[error("age-category imputation misconfigured: {0}")]
    AgeCategoryMisconfigured(String),
}

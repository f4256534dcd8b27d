use std::fmt;

/// Result type for reconcile-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the engagement DB client and incremental cache (§4.C, §4.E, §7).
#[derive(Debug)]
pub enum Error {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// A cache file exists but failed to parse; treated as absent by callers, logged here
    /// for visibility (§7 `CorruptedCache`).
    CorruptedCache { path: String, reason: String },
    NotFound { message_id: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Sqlite(e) => write!(f, "sqlite error: {e}"),
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Json(e) => write!(f, "json error: {e}"),
            Error::CorruptedCache { path, reason } => write!(f, "corrupted cache file '{path}': {reason}"),
            Error::NotFound { message_id } => write!(f, "no message with id '{message_id}'"),
        }
    }
}

impl std::error::Error for Error {}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Sqlite(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

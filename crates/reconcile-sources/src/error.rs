use std::fmt;

/// Result type for reconcile-sources operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while pulling and mapping upstream records (§4.D, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An identity field (e.g. phone number) failed validation and
    /// `ignore_invalid_identifiers` was false.
    InvalidIdentifier { reason: String },
    /// A label produced for forward-sync referenced an unknown scheme or code.
    LabelSchemeViolation { scheme_id: String, code_id: String },
    /// The upstream client returned a record this adapter doesn't know how to map.
    UnsupportedRecord { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidIdentifier { reason } => write!(f, "invalid identifier: {reason}"),
            Error::LabelSchemeViolation { scheme_id, code_id } => {
                write!(f, "label '{code_id}' is not valid for scheme '{scheme_id}'")
            }
            Error::UnsupportedRecord { reason } => write!(f, "unsupported upstream record: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

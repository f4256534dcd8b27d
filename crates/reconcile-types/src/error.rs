use std::fmt;

/// Result type for reconcile-types operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while looking things up in the data model (schemes, codes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A code scheme has no code with the requested id.
    UnknownCode { scheme_id: String, code_id: String },
    /// A label referenced a scheme id that isn't among the ones passed in.
    UnknownScheme { scheme_id: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownCode { scheme_id, code_id } => {
                write!(f, "code '{code_id}' not found in scheme '{scheme_id}'")
            }
            Error::UnknownScheme { scheme_id } => {
                write!(f, "no code scheme with id '{scheme_id}'")
            }
        }
    }
}

impl std::error::Error for Error {}

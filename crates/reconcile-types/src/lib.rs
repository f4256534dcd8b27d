//! Shared data model for the engagement data pipeline: messages, their label and
//! provenance history, code schemes, and origin identifiers. This crate has no I/O; it is
//! the vocabulary that `reconcile-sources`, `reconcile-store`, `reconcile-engine` and
//! `reconcile-runtime` all build on.

pub mod code_scheme;
pub mod error;
pub mod history;
pub mod label;
pub mod message;
pub mod origin;

pub use code_scheme::{duplicate_schemes, Code, CodeScheme, CodeType};
pub use error::{Error, Result};
pub use history::HistoryEntry;
pub use label::{Label, LabelOrigin};
pub use message::{latest_labels, Direction, Message, MessageStatus};
pub use origin::MessageOrigin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a [`Label`] came from: a human coder, or a pipeline stage that stamped it
/// automatically (auto-coder, imputation, WS-correction cycle fix, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOrigin {
    pub location: String,
    pub name: String,
    pub source_type: String,
}

impl LabelOrigin {
    pub fn new(location: impl Into<String>, name: impl Into<String>, source_type: impl Into<String>) -> Self {
        LabelOrigin {
            location: location.into(),
            name: name.into(),
            source_type: source_type.into(),
        }
    }

    /// An origin stamped by a pipeline component rather than a human coder, per §4.J / §9
    /// ("context value threaded through operations that need to stamp `origin.location`").
    pub fn pipeline(location: impl Into<String>, component: impl Into<String>) -> Self {
        LabelOrigin::new(location, component, "pipeline")
    }
}

/// A single code assignment against one scheme, as it sits in a [`crate::Message`]'s label
/// history (§3.1). Labels are immutable; mutation of a message's labels is always expressed
/// as pushing a new `Label` onto the front of the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub scheme_id: String,
    pub code_id: String,
    pub date_time_utc: DateTime<Utc>,
    pub origin: LabelOrigin,
    pub checked: bool,
}

impl Label {
    pub fn new(
        scheme_id: impl Into<String>,
        code_id: impl Into<String>,
        date_time_utc: DateTime<Utc>,
        origin: LabelOrigin,
        checked: bool,
    ) -> Self {
        Label {
            scheme_id: scheme_id.into(),
            code_id: code_id.into(),
            date_time_utc,
            origin,
            checked,
        }
    }

    /// A `SPECIAL-MANUALLY_UNCODED` label for `scheme_id`, always unchecked (§3.3, §4.A).
    pub fn manually_uncoded(scheme_id: impl Into<String>, date_time_utc: DateTime<Utc>, origin: LabelOrigin) -> Self {
        Label::new(
            scheme_id,
            crate::code_scheme::special_codes::MANUALLY_UNCODED,
            date_time_utc,
            origin,
            false,
        )
    }

    pub fn is_manually_uncoded(&self) -> bool {
        self.code_id == crate::code_scheme::special_codes::MANUALLY_UNCODED
    }
}

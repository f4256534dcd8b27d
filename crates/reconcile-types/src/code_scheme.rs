use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Well-known control codes (§3.1, §4.H, §4.J).
pub mod control_codes {
    pub const WRONG_SCHEME: &str = "WRONG_SCHEME";
    pub const NOT_CODED: &str = "NOT_CODED";
    pub const STOP: &str = "STOP";
}

/// Well-known special/imputed code ids (§3.3, §4.J).
pub mod special_codes {
    pub const MANUALLY_UNCODED: &str = "SPECIAL-MANUALLY_UNCODED";
    pub const NOT_REVIEWED: &str = "NOT_REVIEWED";
    pub const CODING_ERROR: &str = "CODING_ERROR";
    pub const TRUE_MISSING: &str = "TRUE_MISSING";
    pub const NOT_INTERNALLY_CONSISTENT: &str = "NOT_INTERNALLY_CONSISTENT";
    pub const STOP: &str = "STOP";
}

/// Identifier for the distinguished WS-Correct-Dataset scheme (§3.1).
pub const WS_CORRECT_DATASET_SCHEME_ID: &str = "WS-Correct-Dataset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeType {
    Normal,
    Meta,
    Control,
}

/// A single selectable code within a [`CodeScheme`] (§3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub code_id: String,
    pub code_type: CodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_code: Option<String>,
    #[serde(default)]
    pub match_values: Vec<String>,
    #[serde(default)]
    pub string_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
}

impl Code {
    pub fn normal(code_id: impl Into<String>, string_value: impl Into<String>) -> Self {
        let string_value = string_value.into();
        Code {
            code_id: code_id.into(),
            code_type: CodeType::Normal,
            control_code: None,
            meta_code: None,
            match_values: Vec::new(),
            string_value,
            numeric_value: None,
        }
    }

    pub fn control(code_id: impl Into<String>, control_code: impl Into<String>) -> Self {
        Code {
            code_id: code_id.into(),
            code_type: CodeType::Control,
            control_code: Some(control_code.into()),
            meta_code: None,
            match_values: Vec::new(),
            string_value: String::new(),
            numeric_value: None,
        }
    }

    pub fn meta(code_id: impl Into<String>, meta_code: impl Into<String>) -> Self {
        Code {
            code_id: code_id.into(),
            code_type: CodeType::Meta,
            control_code: None,
            meta_code: Some(meta_code.into()),
            match_values: Vec::new(),
            string_value: String::new(),
            numeric_value: None,
        }
    }

    pub fn with_match_values(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.match_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_numeric_value(mut self, value: f64) -> Self {
        self.numeric_value = Some(value);
        self
    }
}

/// A named set of [`Code`]s a dataset's labels may draw from (§3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeScheme {
    pub scheme_id: String,
    pub codes: Vec<Code>,
}

impl CodeScheme {
    pub fn new(scheme_id: impl Into<String>, codes: Vec<Code>) -> Self {
        CodeScheme {
            scheme_id: scheme_id.into(),
            codes,
        }
    }

    pub fn get_code_with_code_id(&self, code_id: &str) -> Result<&Code> {
        self.codes
            .iter()
            .find(|c| c.code_id == code_id)
            .ok_or_else(|| Error::UnknownCode {
                scheme_id: self.scheme_id.clone(),
                code_id: code_id.to_string(),
            })
    }

    pub fn get_code_with_match_value(&self, match_value: &str) -> Option<&Code> {
        self.codes.iter().find(|c| c.match_values.iter().any(|v| v == match_value))
    }

    pub fn get_code_with_meta_code(&self, meta_code: &str) -> Option<&Code> {
        self.codes
            .iter()
            .find(|c| c.meta_code.as_deref() == Some(meta_code))
    }

    pub fn get_code_with_control_code(&self, control_code: &str) -> Option<&Code> {
        self.codes
            .iter()
            .find(|c| c.control_code.as_deref() == Some(control_code))
    }

    /// Produces the duplicated scheme for copy number `count` (2, 3, ...), suffixing the
    /// scheme id `-2`, `-3`, ... as described in §3.1 and exercised by §4.I / P8.
    pub fn duplicate(&self, count: u32) -> CodeScheme {
        if count <= 1 {
            return self.clone();
        }
        CodeScheme {
            scheme_id: format!("{}-{}", self.scheme_id, count),
            codes: self.codes.clone(),
        }
    }
}

/// Builds the `count` code schemes produced by duplicating `scheme` (§3.1, P8): the original,
/// then `scheme_id-2`, `scheme_id-3`, ... up to `scheme_id-count`.
pub fn duplicate_schemes(scheme: &CodeScheme, count: u32) -> Vec<CodeScheme> {
    (1..=count.max(1)).map(|n| scheme.duplicate(n)).collect()
}

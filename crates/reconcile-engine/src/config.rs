//! Coding-sync configuration: which engagement-db dataset maps to which Coda dataset, what
//! code schemes it expects, and how WS redirects are resolved (§4.F–§4.I, §6.1).

use reconcile_types::{CodeScheme, Label};

use crate::error::{Error, Result};

/// Auto-coder: a pure function from message text to an optional label, used by forward
/// sync when a message has no existing labels (§4.G).
pub type AutoCoder = fn(text: &str) -> Option<Label>;

/// Configuration for one configured code scheme within a Coda dataset (§4.D, §4.I).
/// `coda_code_schemes_count` expands the scheme into `count` duplicated copies suffixed
/// `-2`, `-3`, ... (§3.1, P8).
#[derive(Clone)]
pub struct CodeSchemeConfig {
    pub code_scheme: CodeScheme,
    pub coda_code_schemes_count: u32,
    pub auto_coder: Option<AutoCoder>,
}

impl CodeSchemeConfig {
    pub fn new(code_scheme: CodeScheme) -> Self {
        CodeSchemeConfig {
            code_scheme,
            coda_code_schemes_count: 1,
            auto_coder: None,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.coda_code_schemes_count = count;
        self
    }

    pub fn with_auto_coder(mut self, auto_coder: AutoCoder) -> Self {
        self.auto_coder = Some(auto_coder);
        self
    }
}

/// Per-dataset sync configuration, mirroring `CodaDatasetConfiguration`.
#[derive(Clone)]
pub struct CodaDatasetConfig {
    pub engagement_db_dataset: String,
    pub coda_dataset_id: String,
    pub code_scheme_configs: Vec<CodeSchemeConfig>,
    pub update_users_and_code_schemes: bool,
    pub dataset_users_file_url: Option<String>,
    /// Match values that redirect a WS code to this dataset (§4.H step 3a).
    pub ws_code_match_values: Vec<String>,
}

impl CodaDatasetConfig {
    pub fn code_schemes(&self) -> Vec<CodeScheme> {
        self.code_scheme_configs
            .iter()
            .flat_map(|c| reconcile_types::duplicate_schemes(&c.code_scheme, c.coda_code_schemes_count))
            .collect()
    }
}

/// Top-level coding-sync configuration, mirroring `CodaSyncConfiguration`.
#[derive(Clone)]
pub struct CodaSyncConfig {
    pub dataset_configs: Vec<CodaDatasetConfig>,
    pub ws_correct_dataset_code_scheme: CodeScheme,
    pub project_users_file_url: Option<String>,
    pub default_ws_dataset: Option<String>,
    pub set_dataset_from_ws_string_value: bool,
}

impl CodaSyncConfig {
    pub fn dataset_config_by_engagement_db_dataset(&self, dataset: &str) -> Result<&CodaDatasetConfig> {
        self.dataset_configs
            .iter()
            .find(|c| c.engagement_db_dataset == dataset)
            .ok_or_else(|| Error::UnknownDataset(dataset.to_string()))
    }

    /// Finds the dataset configuration whose `ws_code_match_values` intersects `match_values`
    /// (§4.H step 3a).
    pub fn dataset_config_by_ws_match_value(&self, match_values: &[String]) -> Option<&CodaDatasetConfig> {
        self.dataset_configs
            .iter()
            .find(|c| c.ws_code_match_values.iter().any(|v| match_values.contains(v)))
    }
}

//! Example Coda-sync and analysis configuration for a single "gender" dataset.
//!
//! `CodaSyncConfig`/`AnalysisColumnConfig` are deployment code, not config-file data (an
//! `AutoCoder` is a function pointer with no TOML representation, per
//! `reconcile_runtime::config`'s own module doc). A real pipeline forks this module to
//! describe its own datasets and code schemes; what ships here is a small illustrative
//! wiring so the binary has something concrete to run end-to-end.

use reconcile_engine::{AnalysisColumnConfig, CodaDatasetConfig, CodaSyncConfig, CodeSchemeConfig, DatasetType};
use reconcile_types::{Code, CodeScheme};

pub fn example_coda_sync_config() -> CodaSyncConfig {
    let gender_scheme = CodeScheme::new("gender-scheme", vec![Code::normal("male", "male"), Code::normal("female", "female")]);

    CodaSyncConfig {
        dataset_configs: vec![CodaDatasetConfig {
            engagement_db_dataset: "gender".to_string(),
            coda_dataset_id: "gender".to_string(),
            code_scheme_configs: vec![CodeSchemeConfig::new(gender_scheme)],
            update_users_and_code_schemes: true,
            dataset_users_file_url: None,
            ws_code_match_values: Vec::new(),
        }],
        ws_correct_dataset_code_scheme: CodeScheme::new(reconcile_types::code_scheme::WS_CORRECT_DATASET_SCHEME_ID, vec![]),
        project_users_file_url: None,
        default_ws_dataset: None,
        set_dataset_from_ws_string_value: false,
    }
}

pub fn example_analysis_column_configs() -> Vec<AnalysisColumnConfig> {
    vec![AnalysisColumnConfig {
        analysis_dataset: "gender".to_string(),
        engagement_db_datasets: vec!["gender".to_string()],
        dataset_type: DatasetType::Demographic,
        raw_field: "gender_raw".to_string(),
        coding_schemes: vec![CodeScheme::new("gender-scheme", vec![Code::normal("male", "male"), Code::normal("female", "female")])],
    }]
}

//! Scheme sync: keeps each Coda dataset's user list and code schemes in step with
//! configuration (§4.I, `ensure_coda_users_and_code_schemes_up_to_date`).

use std::collections::HashMap;

use reconcile_types::CodeScheme;

use crate::coding_tool::CodingToolClient;
use crate::config::CodaSyncConfig;

/// Source of the user ids a dataset should have: either its own `dataset_users_file_url`, or
/// the project-wide default (§4.I).
pub trait UserIdSource {
    fn user_ids(&self, file_url: &str) -> Vec<String>;
}

/// Per-dataset summary of what this pass changed, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeSyncReport {
    pub coda_dataset_id: String,
    pub users_updated: bool,
    pub schemes_added_or_updated: Vec<String>,
}

/// Builds the full set of schemes a dataset's Coda instance should carry: every configured
/// scheme (expanded for `coda_code_schemes_count`) plus the WS-Correct-Dataset scheme that's
/// shared across all datasets.
fn expected_schemes(config: &CodaSyncConfig, dataset_config: &crate::config::CodaDatasetConfig) -> Vec<CodeScheme> {
    let mut schemes = dataset_config.code_schemes();
    schemes.push(config.ws_correct_dataset_code_scheme.clone());
    schemes
}

/// Brings every dataset configured with `update_users_and_code_schemes` up to date: pushes
/// user ids if they differ, and adds/overwrites any code scheme whose content differs from
/// what the dataset already has (§4.I). Schemes present in Coda but absent from configuration
/// are left alone and just logged about, never deleted.
pub fn sync_users_and_code_schemes<C: CodingToolClient, U: UserIdSource>(
    config: &CodaSyncConfig,
    coding_tool: &mut C,
    user_ids: &U,
    dry_run: bool,
) -> Vec<SchemeSyncReport> {
    let default_user_ids = config
        .project_users_file_url
        .as_deref()
        .map(|url| user_ids.user_ids(url))
        .unwrap_or_default();

    let mut reports = Vec::new();

    for dataset_config in &config.dataset_configs {
        if !dataset_config.update_users_and_code_schemes {
            tracing::debug!(dataset = %dataset_config.coda_dataset_id, "not updating users or code schemes for this dataset");
            continue;
        }

        let mut report = SchemeSyncReport {
            coda_dataset_id: dataset_config.coda_dataset_id.clone(),
            ..Default::default()
        };

        let configured_user_ids = match &dataset_config.dataset_users_file_url {
            Some(url) => user_ids.user_ids(url),
            None => default_user_ids.clone(),
        };
        let current_user_ids = coding_tool.get_dataset_user_ids(&dataset_config.coda_dataset_id);
        let users_differ = match &current_user_ids {
            None => true,
            Some(current) => {
                let mut a = current.clone();
                let mut b = configured_user_ids.clone();
                a.sort();
                b.sort();
                a != b
            }
        };
        if users_differ {
            if !dry_run {
                coding_tool.set_dataset_user_ids(&dataset_config.coda_dataset_id, configured_user_ids);
            }
            report.users_updated = true;
        }

        let expected = expected_schemes(config, dataset_config);
        let expected_by_id: HashMap<&str, &CodeScheme> = expected.iter().map(|s| (s.scheme_id.as_str(), s)).collect();

        let current_schemes = coding_tool.get_all_code_schemes(&dataset_config.coda_dataset_id);
        let current_by_id: HashMap<&str, &CodeScheme> = current_schemes.iter().map(|s| (s.scheme_id.as_str(), s)).collect();

        for scheme_id in current_by_id.keys() {
            if !expected_by_id.contains_key(scheme_id) {
                tracing::warn!(dataset = %dataset_config.coda_dataset_id, scheme_id, "code scheme exists in Coda but not in configuration; ignoring");
            }
        }

        let mut to_update = Vec::new();
        for scheme in &expected {
            match current_by_id.get(scheme.scheme_id.as_str()) {
                None => to_update.push(scheme.clone()),
                Some(current) if *current != scheme => to_update.push(scheme.clone()),
                Some(_) => {}
            }
        }

        if !to_update.is_empty() {
            report.schemes_added_or_updated = to_update.iter().map(|s| s.scheme_id.clone()).collect();
            if !dry_run {
                coding_tool.add_and_update_dataset_code_schemes(&dataset_config.coda_dataset_id, to_update);
            }
        }

        reports.push(report);
    }

    reports
}

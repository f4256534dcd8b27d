//! Column-view projector (§4.K) and imputation pass 2, which runs over the projected rows
//! rather than over individual messages (§4.J steps 5-7).

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use reconcile_types::{code_scheme::special_codes, CodeScheme, CodeType, Label, LabelOrigin, Message};

const IMPUTATION_LOCATION: &str = "imputation";

/// Distinguishes demographic columns, which get `NOT_INTERNALLY_CONSISTENT` collapsing
/// (§4.J step 6), from research-question-answer columns, which don't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetType {
    Demographic,
    ResearchQuestionAnswer,
}

/// Configuration for one analysis column: which engagement-db dataset(s) feed it, the raw
/// text field name, and the code scheme(s) whose latest label become the coded column(s).
/// Duplicated schemes (`-1`, `-2`, ...) each produce their own column (§4.K).
#[derive(Clone)]
pub struct AnalysisColumnConfig {
    pub analysis_dataset: String,
    pub engagement_db_datasets: Vec<String>,
    pub dataset_type: DatasetType,
    pub raw_field: String,
    pub coding_schemes: Vec<CodeScheme>,
}

/// One projected row: either a single message (per-message view) or everything a
/// participant contributed across the configured datasets (per-participant view).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnViewRow {
    pub participant_uuid: String,
    pub raw_fields: HashMap<String, String>,
    pub coded_columns: HashMap<String, Label>,
    pub consent_withdrawn: bool,
}

/// Builds one row per message (§4.K "per-message row"): `raw_field` holds the message text,
/// and each configured scheme contributes its latest label, if any.
pub fn project_per_message(configs: &[AnalysisColumnConfig], messages: &[Message]) -> Vec<ColumnViewRow> {
    let mut rows = Vec::new();
    for config in configs {
        for message in messages {
            if !config.engagement_db_datasets.iter().any(|d| d == &message.dataset) {
                continue;
            }
            let mut row = ColumnViewRow {
                participant_uuid: message.participant_uuid.clone(),
                ..Default::default()
            };
            row.raw_fields.insert(config.raw_field.clone(), message.text.clone());
            for scheme in &config.coding_schemes {
                if let Some(label) = message.latest_label_for_scheme(&scheme.scheme_id) {
                    row.coded_columns.insert(scheme.scheme_id.clone(), label.clone());
                }
            }
            rows.push(row);
        }
    }
    rows
}

/// Builds one row per participant (§4.K "per-participant row"): folds every message a
/// participant sent across all configured datasets into a single row, keyed by participant.
/// Where a participant has more than one message for the same dataset, the most recent one
/// wins.
pub fn project_per_participant(configs: &[AnalysisColumnConfig], messages: &[Message]) -> Vec<ColumnViewRow> {
    let mut by_participant: HashMap<String, ColumnViewRow> = HashMap::new();
    let mut latest_per_dataset: HashMap<(String, String), chrono::DateTime<Utc>> = HashMap::new();

    for config in configs {
        for message in messages {
            if !config.engagement_db_datasets.iter().any(|d| d == &message.dataset) {
                continue;
            }
            let key = (message.participant_uuid.clone(), config.analysis_dataset.clone());
            let is_newest = match latest_per_dataset.get(&key) {
                Some(existing) => message.timestamp > *existing,
                None => true,
            };
            if !is_newest {
                continue;
            }
            latest_per_dataset.insert(key, message.timestamp);

            let row = by_participant.entry(message.participant_uuid.clone()).or_insert_with(|| ColumnViewRow {
                participant_uuid: message.participant_uuid.clone(),
                ..Default::default()
            });
            row.raw_fields.insert(config.raw_field.clone(), message.text.clone());
            for scheme in &config.coding_schemes {
                match message.latest_label_for_scheme(&scheme.scheme_id) {
                    Some(label) => {
                        row.coded_columns.insert(scheme.scheme_id.clone(), label.clone());
                    }
                    None => {
                        row.coded_columns.remove(&scheme.scheme_id);
                    }
                }
            }
        }
    }

    by_participant.into_values().collect()
}

fn now_label(scheme_id: impl Into<String>, code_id: impl Into<String>) -> Label {
    Label::new(scheme_id, code_id, Utc::now(), LabelOrigin::pipeline(IMPUTATION_LOCATION, "Column View Imputation"), false)
}

/// §4.J step 5: a row missing a configured column's raw field gets an empty string and a
/// `TRUE_MISSING` label instead of being left absent, so downstream analysis always sees
/// every configured column.
pub fn impute_true_missing(rows: &mut [ColumnViewRow], configs: &[AnalysisColumnConfig]) {
    for row in rows.iter_mut() {
        for config in configs {
            if !row.raw_fields.contains_key(&config.raw_field) {
                row.raw_fields.insert(config.raw_field.clone(), String::new());
                for scheme in &config.coding_schemes {
                    row.coded_columns.insert(scheme.scheme_id.clone(), now_label(scheme.scheme_id.clone(), special_codes::TRUE_MISSING));
                }
            }
        }
    }
}

/// §4.J step 6 (demographic columns only): collapses ≥2 distinct `NORMAL` code ids in a
/// column down to a single `NOT_INTERNALLY_CONSISTENT` label. Demographic columns in this
/// model carry one label per scheme already (latest-labels semantics), so "≥2 distinct
/// NORMAL codes" is evaluated across the demographic columns configured for the same
/// analysis dataset rather than within a single column.
pub fn impute_not_internally_consistent(rows: &mut [ColumnViewRow], configs: &[AnalysisColumnConfig]) {
    for config in configs {
        if config.dataset_type != DatasetType::Demographic {
            continue;
        }
        let scheme_ids: Vec<&str> = config.coding_schemes.iter().map(|s| s.scheme_id.as_str()).collect();
        for row in rows.iter_mut() {
            let mut normal_code_ids: Vec<String> = Vec::new();
            for scheme_id in &scheme_ids {
                if let Some(label) = row.coded_columns.get(*scheme_id) {
                    let is_normal = config
                        .coding_schemes
                        .iter()
                        .find(|s| s.scheme_id == *scheme_id)
                        .and_then(|s| s.get_code_with_code_id(&label.code_id).ok())
                        .map(|c| c.code_type == CodeType::Normal)
                        .unwrap_or(false);
                    if is_normal && !normal_code_ids.contains(&label.code_id) {
                        normal_code_ids.push(label.code_id.clone());
                    }
                }
            }
            if normal_code_ids.len() >= 2 {
                for scheme_id in &scheme_ids {
                    let is_normal = row
                        .coded_columns
                        .get(*scheme_id)
                        .map(|label| {
                            config
                                .coding_schemes
                                .iter()
                                .find(|s| s.scheme_id == *scheme_id)
                                .and_then(|s| s.get_code_with_code_id(&label.code_id).ok())
                                .map(|c| c.code_type == CodeType::Normal)
                                .unwrap_or(false)
                        })
                        .unwrap_or(false);
                    if is_normal {
                        row.coded_columns.insert((*scheme_id).to_string(), now_label(*scheme_id, special_codes::NOT_INTERNALLY_CONSISTENT));
                    }
                }
            }
        }
    }
}

/// §4.J step 7: a participant is STOP-labelled if any of their column labels (any dataset,
/// any of their rows) carries a `STOP` control code. STOP propagates across every row
/// belonging to that participant, not just the row the label happened to land on — in the
/// per-message view a STOP signal on one message must still STOP every other message that
/// same participant sent (Invariant 3, P6). STOP participants get every raw field replaced
/// with `"STOP"` and every coded column replaced with a single `STOP` label; everyone else
/// gets `consent_withdrawn = false`.
pub fn impute_consent_withdrawn(rows: &mut [ColumnViewRow], schemes_by_id: &HashMap<String, &CodeScheme>) {
    let is_stop_label = |scheme_id: &str, label: &Label| {
        schemes_by_id
            .get(scheme_id)
            .and_then(|scheme| scheme.get_code_with_code_id(&label.code_id).ok())
            .map(|code| code.control_code.as_deref() == Some(reconcile_types::code_scheme::control_codes::STOP))
            .unwrap_or(false)
    };

    let mut stopped_participants: HashSet<String> = HashSet::new();
    for row in rows.iter() {
        if row.coded_columns.iter().any(|(scheme_id, label)| is_stop_label(scheme_id, label)) {
            stopped_participants.insert(row.participant_uuid.clone());
        }
    }

    for row in rows.iter_mut() {
        let stopped = stopped_participants.contains(&row.participant_uuid);
        row.consent_withdrawn = stopped;
        if stopped {
            for value in row.raw_fields.values_mut() {
                *value = "STOP".to_string();
            }
            let scheme_ids: Vec<String> = row.coded_columns.keys().cloned().collect();
            for scheme_id in scheme_ids {
                row.coded_columns.insert(scheme_id.clone(), now_label(scheme_id, special_codes::STOP));
            }
        }
    }
}

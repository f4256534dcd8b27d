//! Back sync: Coda -> engagement-db (§4.H). Applies a coder's labels back onto the
//! engagement-db message, detecting and resolving WS ("wrong scheme") redirects and the
//! cycles they can create.

use reconcile_types::{code_scheme::control_codes, Code, CodeScheme, Label, LabelOrigin, Message};

use crate::coding_tool::{CodingMessage, CodingToolClient};
use crate::config::{CodaDatasetConfig, CodaSyncConfig};
use crate::error::{Error, Result};

/// Outcome of reconciling one engagement-db message against its Coda counterpart (§4.H).
/// `UpdateLabels` corresponds to what the coding-tool sync log calls
/// `UPDATE_ENGAGEMENT_DB_LABELS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackSyncEvent {
    LabelsMatch,
    WsCorrection,
    FixWsCycle,
    UpdateLabels,
}

/// Finds the code scheme among `code_schemes` that `label` belongs to, tolerating the
/// `-2`/`-3`/... suffixes scheme duplication adds to a scheme id.
pub(crate) fn code_for_label(label: &Label, code_schemes: &[&CodeScheme]) -> Result<Code> {
    for scheme in code_schemes {
        if label.scheme_id.starts_with(scheme.scheme_id.as_str()) {
            return scheme
                .get_code_with_code_id(&label.code_id)
                .map(|code| code.clone())
                .map_err(Error::LabelSchemeViolation);
        }
    }
    Err(Error::LabelSchemeViolation(reconcile_types::Error::UnknownScheme {
        scheme_id: label.scheme_id.clone(),
    }))
}

/// Looks for a WS ("wrong scheme") redirect encoded in `coda_message`'s checked labels: a
/// control code `WRONG_SCHEME` in one of the dataset's normal schemes, paired with a label
/// in the WS-Correct-Dataset scheme naming the intended target. If either is present without
/// the other, logs a warning and treats the message as not WS-coded, deferring to a later
/// imputation pass rather than guessing (§4.H, §4.J).
fn get_ws_code(coda_message: &CodingMessage, dataset_config: &CodaDatasetConfig, ws_code_scheme: &CodeScheme) -> Result<Option<Code>> {
    let normal_schemes: Vec<&CodeScheme> = dataset_config.code_scheme_configs.iter().map(|c| &c.code_scheme).collect();
    let (ws_code_in_normal_scheme, code_in_ws_scheme) =
        ws_signal_mismatch(coda_message.latest_labels(), &normal_schemes, ws_code_scheme)?;

    if ws_code_in_normal_scheme != code_in_ws_scheme.is_some() {
        tracing::warn!(
            ws_code_in_normal_scheme,
            code_in_ws_scheme = code_in_ws_scheme.is_some(),
            "not WS-correcting message because normal-scheme and WS-scheme labels disagree"
        );
        return Ok(None);
    }

    if let Some(code) = &code_in_ws_scheme {
        if code.control_code.as_deref() == Some(control_codes::NOT_CODED) {
            tracing::warn!("code in WS-Correct-Dataset scheme is NOT_CODED; cannot redirect message");
            return Ok(None);
        }
    }

    Ok(code_in_ws_scheme)
}

/// Scans `labels`' latest, checked entries for (a) a `WRONG_SCHEME` control code in one of
/// `normal_schemes` and (b) a label under `ws_scheme`, returning whether each was found and
/// the WS-scheme code if present. Shared by back sync's redirect detection and by the
/// imputation engine's WS-coding-error pass, which runs the same check over the
/// engagement-db message's own labels instead of the coding-tool message's (§4.H step 2,
/// §4.J step 2).
pub(crate) fn ws_signal_mismatch(labels: &[Label], normal_schemes: &[&CodeScheme], ws_scheme: &CodeScheme) -> Result<(bool, Option<Code>)> {
    let mut ws_in_normal = false;
    for label in labels {
        if !label.checked || label.scheme_id == ws_scheme.scheme_id {
            continue;
        }
        let code = code_for_label(label, normal_schemes)?;
        if code.control_code.as_deref() == Some(control_codes::WRONG_SCHEME) {
            ws_in_normal = true;
        }
    }

    let mut ws_present = None;
    for label in labels {
        if !label.checked || label.scheme_id != ws_scheme.scheme_id {
            continue;
        }
        ws_present = Some(
            ws_scheme
                .get_code_with_code_id(&label.code_id)
                .map(|code| code.clone())
                .map_err(Error::LabelSchemeViolation)?,
        );
    }

    Ok((ws_in_normal, ws_present))
}

/// Resolves the target dataset for a WS code, trying the three strategies in order: a
/// dataset configured with a matching `ws_code_match_values` entry, then
/// `set_dataset_from_ws_string_value`, then `default_ws_dataset` (§4.H step 3).
fn resolve_redirect_target(config: &CodaSyncConfig, ws_code: &Code) -> Result<String> {
    if let Some(dataset_config) = config.dataset_config_by_ws_match_value(&ws_code.match_values) {
        return Ok(dataset_config.engagement_db_dataset.clone());
    }
    if config.set_dataset_from_ws_string_value && ws_code.match_values.contains(&ws_code.string_value) {
        return Ok(ws_code.string_value.clone());
    }
    if let Some(default) = &config.default_ws_dataset {
        return Ok(default.clone());
    }
    Err(Error::NoRedirectTarget {
        message_id: String::new(),
    })
}

/// Clears every message in `dataset_ids`' Coda datasets whose latest label is checked,
/// replacing it with `SPECIAL-MANUALLY_UNCODED`, then resets `message` back to the first
/// dataset it ever passed through (§4.H step 5-6, `_fix_ws_cycle`).
fn fix_ws_cycle<C: CodingToolClient>(config: &CodaSyncConfig, coding_tool: &mut C, message: &mut Message) -> Result<()> {
    let mut datasets_to_clear: Vec<&str> = message.previous_datasets.iter().map(String::as_str).collect();
    datasets_to_clear.push(message.dataset.as_str());
    datasets_to_clear.sort_unstable();
    datasets_to_clear.dedup();

    for dataset in datasets_to_clear {
        let dataset_config = config.dataset_config_by_engagement_db_dataset(dataset)?;
        if let Some(coda_id) = &message.coda_id {
            if let Some(mut coda_message) = coding_tool.get_dataset_message(&dataset_config.coda_dataset_id, coda_id) {
                for label in coda_message.latest_labels().to_vec() {
                    if !label.checked {
                        continue;
                    }
                    coda_message.labels.insert(
                        0,
                        Label::new(
                            label.scheme_id.clone(),
                            reconcile_types::code_scheme::special_codes::MANUALLY_UNCODED,
                            chrono::Utc::now(),
                            LabelOrigin::pipeline("fix_ws_cycle", "WS Cycle Fixer"),
                            false,
                        ),
                    );
                }
                coding_tool.update_dataset_message(&dataset_config.coda_dataset_id, coda_message);
            }
        }
    }

    message.reset_to_origin_dataset();
    Ok(())
}

/// Reconciles one engagement-db message with its Coda counterpart (§4.H). Mutates `message`
/// in place (labels, dataset, previous_datasets as applicable); the caller persists it.
pub fn update_message_from_coda<C: CodingToolClient>(
    config: &CodaSyncConfig,
    coding_tool: &mut C,
    message: &mut Message,
    coda_message: &CodingMessage,
) -> Result<BackSyncEvent> {
    let dataset_config = config.dataset_config_by_engagement_db_dataset(&message.dataset)?;
    let ws_code = get_ws_code(coda_message, dataset_config, &config.ws_correct_dataset_code_scheme)?;

    let correct_dataset = match &ws_code {
        Some(code) => Some(resolve_redirect_target(config, code).map_err(|e| {
            if let Error::NoRedirectTarget { .. } = e {
                Error::NoRedirectTarget {
                    message_id: message.message_id.clone(),
                }
            } else {
                e
            }
        })?),
        None => None,
    };

    let labels_match = message.labels == coda_message.labels;
    let message_in_ws_correct_dataset = correct_dataset.as_deref() == Some(message.dataset.as_str());

    if labels_match && (ws_code.is_none() || message_in_ws_correct_dataset) {
        return Ok(BackSyncEvent::LabelsMatch);
    }

    if message_in_ws_correct_dataset {
        tracing::warn!(message_id = %message.message_id, "WS-correcting to the dataset the message is already in; not moving it");
    } else if let Some(target) = correct_dataset {
        if message.previous_datasets.iter().any(|d| d == &target) {
            tracing::warn!(
                message_id = %message.message_id,
                from = %message.dataset,
                to = %target,
                "WS redirect would revisit a previous dataset; fixing cycle instead"
            );
            fix_ws_cycle(config, coding_tool, message)?;
            return Ok(BackSyncEvent::FixWsCycle);
        }

        message.overwrite_labels(Vec::new());
        message.redirect_to(target);
        return Ok(BackSyncEvent::WsCorrection);
    }

    message.overwrite_labels(coda_message.labels.clone());
    Ok(BackSyncEvent::UpdateLabels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodeSchemeConfig};
    use chrono::Utc;
    use reconcile_types::{Direction, MessageOrigin, MessageStatus};

    fn gender_scheme() -> CodeScheme {
        CodeScheme::new(
            "scheme-gender",
            vec![
                Code::normal("gender_male", "male"),
                Code::normal("gender_female", "female"),
                Code::control("gender_ws", control_codes::WRONG_SCHEME),
            ],
        )
    }

    fn ws_scheme() -> CodeScheme {
        CodeScheme::new(
            reconcile_types::code_scheme::WS_CORRECT_DATASET_SCHEME_ID,
            vec![
                Code::normal("ws_age", "age").with_match_values(["age"]),
                Code::control("ws_nc", control_codes::NOT_CODED),
            ],
        )
    }

    fn config() -> CodaSyncConfig {
        CodaSyncConfig {
            dataset_configs: vec![
                crate::config::CodaDatasetConfig {
                    engagement_db_dataset: "gender".to_string(),
                    coda_dataset_id: "coda-gender".to_string(),
                    code_scheme_configs: vec![CodeSchemeConfig::new(gender_scheme())],
                    update_users_and_code_schemes: false,
                    dataset_users_file_url: None,
                    ws_code_match_values: vec![],
                },
                crate::config::CodaDatasetConfig {
                    engagement_db_dataset: "age".to_string(),
                    coda_dataset_id: "coda-age".to_string(),
                    code_scheme_configs: vec![],
                    update_users_and_code_schemes: false,
                    dataset_users_file_url: None,
                    ws_code_match_values: vec!["age".to_string()],
                },
            ],
            ws_correct_dataset_code_scheme: ws_scheme(),
            project_users_file_url: None,
            default_ws_dataset: None,
            set_dataset_from_ws_string_value: false,
        }
    }

    fn message() -> Message {
        Message {
            message_id: "m-1".to_string(),
            participant_uuid: "p-1".to_string(),
            text: "I am 22".to_string(),
            timestamp: Utc::now(),
            direction: Direction::In,
            channel_operator: "telegram".to_string(),
            status: MessageStatus::Live,
            dataset: "gender".to_string(),
            labels: Vec::new(),
            previous_datasets: Vec::new(),
            coda_id: Some("m-1".to_string()),
            origin: MessageOrigin::new("origin-1", "telegram"),
            history: Vec::new(),
        }
    }

    fn label(scheme: &str, code: &str, checked: bool) -> Label {
        Label::new(scheme, code, Utc::now(), LabelOrigin::new("test", "coder", "human"), checked)
    }

    struct NoopCodingTool;
    impl CodingToolClient for NoopCodingTool {
        fn get_dataset_user_ids(&self, _: &str) -> Option<Vec<String>> {
            None
        }
        fn set_dataset_user_ids(&mut self, _: &str, _: Vec<String>) {}
        fn get_all_code_schemes(&self, _: &str) -> Vec<CodeScheme> {
            Vec::new()
        }
        fn add_and_update_dataset_code_schemes(&mut self, _: &str, _: Vec<CodeScheme>) {}
        fn add_message_to_dataset(&mut self, _: &str, _: CodingMessage) {}
        fn get_dataset_message(&self, _: &str, _: &str) -> Option<CodingMessage> {
            None
        }
        fn update_dataset_message(&mut self, _: &str, _: CodingMessage) {}
        fn iter_dataset_messages(&self, _: &str) -> Vec<CodingMessage> {
            Vec::new()
        }
    }

    #[test]
    fn matching_labels_with_no_ws_code_is_labels_match() {
        let cfg = config();
        let mut tool = NoopCodingTool;
        let mut msg = message();
        msg.labels = vec![label("scheme-gender", "gender_male", true)];
        let mut coda_msg = CodingMessage::new("m-1", &msg.text, msg.timestamp);
        coda_msg.labels = msg.labels.clone();
        let event = update_message_from_coda(&cfg, &mut tool, &mut msg, &coda_msg).unwrap();
        assert_eq!(event, BackSyncEvent::LabelsMatch);
    }

    #[test]
    fn plain_label_update_when_no_ws_code() {
        let cfg = config();
        let mut tool = NoopCodingTool;
        let mut msg = message();
        let mut coda_msg = CodingMessage::new("m-1", &msg.text, msg.timestamp);
        coda_msg.labels = vec![label("scheme-gender", "gender_male", true)];
        let event = update_message_from_coda(&cfg, &mut tool, &mut msg, &coda_msg).unwrap();
        assert_eq!(event, BackSyncEvent::UpdateLabels);
        assert_eq!(msg.labels, coda_msg.labels);
    }

    #[test]
    fn ws_code_redirects_to_matching_dataset() {
        let cfg = config();
        let mut tool = NoopCodingTool;
        let mut msg = message();
        let mut coda_msg = CodingMessage::new("m-1", &msg.text, msg.timestamp);
        coda_msg.labels = vec![
            label("scheme-gender", "gender_ws", true),
            label(reconcile_types::code_scheme::WS_CORRECT_DATASET_SCHEME_ID, "ws_age", true),
        ];
        let event = update_message_from_coda(&cfg, &mut tool, &mut msg, &coda_msg).unwrap();
        assert_eq!(event, BackSyncEvent::WsCorrection);
        assert_eq!(msg.dataset, "age");
        assert_eq!(msg.previous_datasets, vec!["gender".to_string()]);
        assert!(msg.labels.is_empty());
    }

    #[test]
    fn mismatched_ws_signal_is_ignored() {
        let cfg = config();
        let mut tool = NoopCodingTool;
        let mut msg = message();
        let mut coda_msg = CodingMessage::new("m-1", &msg.text, msg.timestamp);
        // WS control code present in the normal scheme but no WS-Correct-Dataset label.
        coda_msg.labels = vec![label("scheme-gender", "gender_ws", true)];
        let event = update_message_from_coda(&cfg, &mut tool, &mut msg, &coda_msg).unwrap();
        assert_eq!(event, BackSyncEvent::UpdateLabels);
    }

    #[test]
    fn redirect_into_a_previous_dataset_triggers_cycle_fix() {
        let cfg = config();
        let mut tool = NoopCodingTool;
        let mut msg = message();
        msg.dataset = "gender".to_string();
        msg.previous_datasets = vec!["age".to_string()];
        let mut coda_msg = CodingMessage::new("m-1", &msg.text, msg.timestamp);
        coda_msg.labels = vec![
            label("scheme-gender", "gender_ws", true),
            label(reconcile_types::code_scheme::WS_CORRECT_DATASET_SCHEME_ID, "ws_age", true),
        ];
        let event = update_message_from_coda(&cfg, &mut tool, &mut msg, &coda_msg).unwrap();
        assert_eq!(event, BackSyncEvent::FixWsCycle);
        assert_eq!(msg.dataset, "age");
        assert!(msg.previous_datasets.is_empty());
        assert!(msg.labels.is_empty());
    }
}

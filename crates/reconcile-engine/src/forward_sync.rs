//! Forward sync: engagement-db -> Coda (§4.G). Validates a message's labels against its
//! dataset's configured code schemes, runs the auto-coder when a message arrives uncoded,
//! and creates the corresponding Coda message if one doesn't already exist.

use reconcile_types::{code_scheme::special_codes, CodeScheme, Message};

use crate::config::CodaSyncConfig;
use crate::coding_tool::{CodingMessage, CodingToolClient};
use crate::error::{Error, Result};

/// Every label a message carries must belong to one of its dataset's configured schemes, or
/// to the WS-correct scheme (messages can be labelled `WRONG_SCHEME` before they've been
/// redirected). A code id is valid if the scheme recognises it, or if it's the universal
/// manually-uncoded marker.
fn validate_labels(message: &Message, dataset: &str, valid_schemes: &[&CodeScheme]) -> Result<()> {
    for label in message.latest_labels() {
        let scheme = valid_schemes
            .iter()
            .find(|s| s.scheme_id == label.scheme_id)
            .ok_or_else(|| Error::InvalidCodaLabel {
                dataset: dataset.to_string(),
                scheme_id: label.scheme_id.clone(),
                code_id: label.code_id.clone(),
            })?;

        if label.code_id == special_codes::MANUALLY_UNCODED {
            continue;
        }
        if scheme.get_code_with_code_id(&label.code_id).is_err() {
            return Err(Error::InvalidCodaLabel {
                dataset: dataset.to_string(),
                scheme_id: label.scheme_id.clone(),
                code_id: label.code_id.clone(),
            });
        }
    }
    Ok(())
}

/// Runs the dataset's configured auto-coder against `message.text`, returning a single
/// label to prepend, if any rule matched. Only invoked for messages that arrive with no
/// labels at all.
fn run_auto_coder(config: &CodaSyncConfig, dataset: &str, message: &Message) -> Result<Option<reconcile_types::Label>> {
    let dataset_config = config.dataset_config_by_engagement_db_dataset(dataset)?;
    for scheme_config in &dataset_config.code_scheme_configs {
        if let Some(auto_coder) = scheme_config.auto_coder {
            if let Some(label) = auto_coder(&message.text) {
                return Ok(Some(label));
            }
        }
    }
    Ok(None)
}

/// Pushes `message` to its dataset's Coda dataset, validating its labels first and running
/// the auto-coder if it has none. Returns the `coda_id` to store back on the engagement-db
/// message. If the coding dataset already contains a message with this `coda_id`, skips the
/// push entirely (§4.G) — a coder may already have entered real label data in Coda, and
/// forward sync must never clobber it with stale engagement-db state.
pub fn sync_message_to_coda<C: CodingToolClient>(
    config: &CodaSyncConfig,
    coding_tool: &mut C,
    message: &mut Message,
) -> Result<()> {
    let dataset_config = config.dataset_config_by_engagement_db_dataset(&message.dataset)?;

    if message.labels.is_empty() {
        if let Some(label) = run_auto_coder(config, &message.dataset, message)? {
            message.prepend_labels(vec![label]);
        }
    }

    let mut valid_schemes: Vec<&CodeScheme> = dataset_config.code_scheme_configs.iter().map(|c| &c.code_scheme).collect();
    valid_schemes.push(&config.ws_correct_dataset_code_scheme);
    validate_labels(message, &message.dataset, &valid_schemes)?;

    let coda_id = message.coda_id.clone().unwrap_or_else(|| message.message_id.clone());
    let mut coding_message = CodingMessage::new(coda_id.clone(), message.text.clone(), message.timestamp);
    coding_message.labels = message.labels.clone();

    if coding_tool.has_message(&dataset_config.coda_dataset_id, &coda_id) {
        message.coda_id = Some(coda_id);
        return Ok(());
    }

    coding_tool.add_message_to_dataset(&dataset_config.coda_dataset_id, coding_message);
    message.coda_id = Some(coda_id);
    Ok(())
}

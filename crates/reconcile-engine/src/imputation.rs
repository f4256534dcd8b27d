//! Imputation engine, pass 1: per-message code imputation run before column-view
//! projection (§4.J steps 1-4). Pass 2 (TRUE_MISSING, NOT_INTERNALLY_CONSISTENT, consent
//! withdrawal) runs over the column view instead and lives in [`crate::projection`].

use std::collections::HashMap;

use chrono::Utc;
use reconcile_types::{code_scheme::special_codes, Code, CodeScheme, CodeType, Label, LabelOrigin, Message};

use crate::back_sync::ws_signal_mismatch;
use crate::error::Result;

const IMPUTATION_LOCATION: &str = "imputation";

/// §4.J step 1: a message's latest label on every one of `schemes` must be present and
/// checked, or it gets reset to `NOT_REVIEWED`/`CODING_ERROR`. Idempotent: a message that
/// already satisfies "checked everywhere" is left untouched.
pub fn impute_not_reviewed_or_coding_error(message: &mut Message, schemes: &[&CodeScheme]) {
    let mut any_checked = false;
    let mut any_unchecked_or_missing = false;
    for scheme in schemes {
        match message.latest_label_for_scheme(&scheme.scheme_id) {
            Some(label) if label.checked => any_checked = true,
            _ => any_unchecked_or_missing = true,
        }
    }

    if any_checked && !any_unchecked_or_missing {
        return;
    }

    let now = Utc::now();
    let origin = LabelOrigin::pipeline(IMPUTATION_LOCATION, "Coding Error / Not Reviewed Imputation");

    if any_checked && any_unchecked_or_missing {
        for scheme in schemes {
            message.prepend_labels(vec![Label::new(scheme.scheme_id.clone(), special_codes::MANUALLY_UNCODED, now, origin.clone(), false)]);
        }
        for scheme in schemes {
            message.prepend_labels(vec![Label::new(scheme.scheme_id.clone(), special_codes::CODING_ERROR, now, origin.clone(), false)]);
        }
    } else {
        for scheme in schemes {
            message.prepend_labels(vec![Label::new(scheme.scheme_id.clone(), special_codes::NOT_REVIEWED, now, origin.clone(), false)]);
        }
    }
}

/// §4.J step 2: re-checks the WS mismatch condition over the engagement-db message's own
/// current labels (as opposed to back sync's check, which runs over the coding-tool
/// message). A message that reaches this pass with a WS signal in one place but not the
/// other never got redirected, so it is stamped `CODING_ERROR` under every normal scheme and
/// the WS scheme instead of being left in limbo.
pub fn impute_ws_coding_error(message: &mut Message, normal_schemes: &[&CodeScheme], ws_scheme: &CodeScheme) -> Result<()> {
    let (ws_in_normal, ws_present) = ws_signal_mismatch(&message.labels, normal_schemes, ws_scheme)?;
    if ws_in_normal == ws_present.is_some() {
        return Ok(());
    }

    let now = Utc::now();
    let origin = LabelOrigin::pipeline(IMPUTATION_LOCATION, "WS Coding Error Imputation");
    let mut all_schemes: Vec<&CodeScheme> = normal_schemes.to_vec();
    all_schemes.push(ws_scheme);
    for scheme in all_schemes {
        message.prepend_labels(vec![Label::new(scheme.scheme_id.clone(), special_codes::CODING_ERROR, now, origin.clone(), false)]);
    }
    Ok(())
}

/// One numeric age range mapped to the age-category scheme's match value for that range
/// (§4.J step 3).
#[derive(Debug, Clone)]
pub struct AgeRange {
    pub min: f64,
    pub max: f64,
    pub category_match_value: String,
}

/// Configuration for age-category imputation. At most one may be active in a pipeline
/// (§4.J step 3: "exactly zero or one age-category configuration is permitted").
#[derive(Clone)]
pub struct AgeCategoryConfig {
    pub age_dataset: String,
    pub age_scheme: CodeScheme,
    pub age_category_scheme: CodeScheme,
    pub ranges: Vec<AgeRange>,
}

/// §4.J step 3: reads the latest label under the age scheme and emits a matching
/// age-category label. `NORMAL` codes are matched by numeric range, `META`/`CONTROL` codes
/// are matched by their own meta/control code id. No-ops for messages outside the age
/// dataset or with no age label yet.
pub fn impute_age_category(message: &mut Message, config: &AgeCategoryConfig) -> Result<()> {
    if message.dataset != config.age_dataset {
        return Ok(());
    }
    let Some(age_label) = message.latest_label_for_scheme(&config.age_scheme.scheme_id) else {
        return Ok(());
    };
    let age_code = config.age_scheme.get_code_with_code_id(&age_label.code_id)?.clone();

    let category_code = match age_code.code_type {
        CodeType::Normal => {
            let numeric_value = age_code.numeric_value.ok_or_else(|| {
                crate::error::Error::AgeCategoryMisconfigured(format!("age code '{}' has no numeric_value", age_code.code_id))
            })?;
            let range = config
                .ranges
                .iter()
                .find(|r| r.min <= numeric_value && numeric_value <= r.max)
                .ok_or_else(|| crate::error::Error::AgeCategoryMisconfigured(format!("no age range covers value {numeric_value}")))?;
            config
                .age_category_scheme
                .get_code_with_match_value(&range.category_match_value)
                .ok_or_else(|| {
                    crate::error::Error::AgeCategoryMisconfigured(format!(
                        "age category scheme has no code matching '{}'",
                        range.category_match_value
                    ))
                })?
                .clone()
        }
        CodeType::Meta => config
            .age_category_scheme
            .get_code_with_meta_code(age_code.meta_code.as_deref().unwrap_or_default())
            .ok_or_else(|| crate::error::Error::AgeCategoryMisconfigured("no age category code for this meta code".to_string()))?
            .clone(),
        CodeType::Control => config
            .age_category_scheme
            .get_code_with_control_code(age_code.control_code.as_deref().unwrap_or_default())
            .ok_or_else(|| crate::error::Error::AgeCategoryMisconfigured("no age category code for this control code".to_string()))?
            .clone(),
    };

    let label = Label::new(
        config.age_category_scheme.scheme_id.clone(),
        category_code.code_id,
        Utc::now(),
        LabelOrigin::pipeline(IMPUTATION_LOCATION, "Age Category Imputation"),
        false,
    );
    message.prepend_labels(vec![label]);
    Ok(())
}

/// A location code's place in the constituency/county hierarchy (§4.J step 4).
pub trait LocationHierarchy {
    fn constituency_and_county(&self, location_code_id: &str) -> Option<(Code, Code)>;
}

/// A small built-in hierarchy covering the constituencies configured for a deployment;
/// real deployments can supply a fuller [`LocationHierarchy`] loaded from their own data.
#[derive(Default)]
pub struct StaticKenyaLocationHierarchy {
    entries: HashMap<String, (Code, Code)>,
}

impl StaticKenyaLocationHierarchy {
    pub fn new(entries: HashMap<String, (Code, Code)>) -> Self {
        StaticKenyaLocationHierarchy { entries }
    }
}

impl LocationHierarchy for StaticKenyaLocationHierarchy {
    fn constituency_and_county(&self, location_code_id: &str) -> Option<(Code, Code)> {
        self.entries.get(location_code_id).cloned()
    }
}

/// Configuration for Kenya-location imputation: the dataset and the several schemes that
/// might each carry the raw location code (e.g. ward vs sub-location questions asking the
/// same thing), plus the constituency/county schemes to emit into.
#[derive(Clone)]
pub struct KenyaLocationConfig {
    pub location_dataset: String,
    pub location_schemes: Vec<CodeScheme>,
    pub constituency_scheme_id: String,
    pub county_scheme_id: String,
}

/// §4.J step 4: collects the single location code across `config.location_schemes`. More
/// than one distinct `NORMAL` code collapses the whole message to `CODING_ERROR` under both
/// the constituency and county schemes. A single `NORMAL` code is looked up in `hierarchy`
/// and emits both a constituency and a county label; `META`/`CONTROL` codes are propagated
/// to both schemes unchanged.
pub fn impute_kenya_location<H: LocationHierarchy>(message: &mut Message, config: &KenyaLocationConfig, hierarchy: &H) -> Result<()> {
    if message.dataset != config.location_dataset {
        return Ok(());
    }

    let mut normal_codes: Vec<Code> = Vec::new();
    let mut non_normal_code: Option<Code> = None;
    for scheme in &config.location_schemes {
        let Some(label) = message.latest_label_for_scheme(&scheme.scheme_id) else {
            continue;
        };
        let code = scheme.get_code_with_code_id(&label.code_id)?.clone();
        match code.code_type {
            CodeType::Normal => {
                if !normal_codes.iter().any(|c| c.code_id == code.code_id) {
                    normal_codes.push(code);
                }
            }
            _ => non_normal_code = Some(code),
        }
    }

    let now = Utc::now();
    let origin = LabelOrigin::pipeline(IMPUTATION_LOCATION, "Kenya Location Imputation");

    if normal_codes.len() > 1 {
        for scheme_id in [&config.constituency_scheme_id, &config.county_scheme_id] {
            message.prepend_labels(vec![Label::new(scheme_id.clone(), special_codes::CODING_ERROR, now, origin.clone(), false)]);
        }
        return Ok(());
    }

    if let Some(code) = normal_codes.into_iter().next() {
        let Some((constituency, county)) = hierarchy.constituency_and_county(&code.code_id) else {
            return Ok(());
        };
        message.prepend_labels(vec![Label::new(config.constituency_scheme_id.clone(), constituency.code_id, now, origin.clone(), false)]);
        message.prepend_labels(vec![Label::new(config.county_scheme_id.clone(), county.code_id, now, origin, false)]);
        return Ok(());
    }

    if let Some(code) = non_normal_code {
        for scheme_id in [&config.constituency_scheme_id, &config.county_scheme_id] {
            message.prepend_labels(vec![Label::new(scheme_id.clone(), code.code_id.clone(), now, origin.clone(), false)]);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_types::{code_scheme::control_codes, Direction, MessageOrigin, MessageStatus};

    fn base_message(dataset: &str) -> Message {
        Message {
            message_id: "m-1".to_string(),
            participant_uuid: "p-1".to_string(),
            text: "hi".to_string(),
            timestamp: Utc::now(),
            direction: Direction::In,
            channel_operator: "telegram".to_string(),
            status: MessageStatus::Live,
            dataset: dataset.to_string(),
            labels: Vec::new(),
            previous_datasets: Vec::new(),
            coda_id: None,
            origin: MessageOrigin::new("origin-1", "telegram"),
            history: Vec::new(),
        }
    }

    fn label(scheme: &str, code: &str, checked: bool) -> Label {
        Label::new(scheme, code, Utc::now(), LabelOrigin::new("test", "coder", "human"), checked)
    }

    #[test]
    fn fully_checked_message_is_untouched() {
        let scheme = CodeScheme::new("gender", vec![Code::normal("male", "male")]);
        let mut msg = base_message("gender");
        msg.labels = vec![label("gender", "male", true)];
        impute_not_reviewed_or_coding_error(&mut msg, &[&scheme]);
        assert_eq!(msg.labels.len(), 1);
    }

    #[test]
    fn no_checked_labels_becomes_not_reviewed() {
        let scheme = CodeScheme::new("gender", vec![Code::normal("male", "male")]);
        let mut msg = base_message("gender");
        impute_not_reviewed_or_coding_error(&mut msg, &[&scheme]);
        assert_eq!(msg.latest_label_for_scheme("gender").unwrap().code_id, special_codes::NOT_REVIEWED);
    }

    #[test]
    fn mixed_checked_and_missing_becomes_coding_error() {
        let gender = CodeScheme::new("gender", vec![Code::normal("male", "male")]);
        let age = CodeScheme::new("age", vec![Code::normal("a22", "22")]);
        let mut msg = base_message("gender");
        msg.labels = vec![label("gender", "male", true)];
        impute_not_reviewed_or_coding_error(&mut msg, &[&gender, &age]);
        assert_eq!(msg.latest_label_for_scheme("gender").unwrap().code_id, special_codes::CODING_ERROR);
        assert_eq!(msg.latest_label_for_scheme("age").unwrap().code_id, special_codes::CODING_ERROR);
    }

    #[test]
    fn age_category_maps_numeric_range() {
        let age_scheme = CodeScheme::new("age", vec![Code::normal("a22", "22").with_numeric_value(22.0)]);
        let category_scheme = CodeScheme::new(
            "age_category",
            vec![Code::normal("18-25", "18-25").with_match_values(["young_adult"])],
        );
        let config = AgeCategoryConfig {
            age_dataset: "age".to_string(),
            age_scheme,
            age_category_scheme,
            ranges: vec![AgeRange {
                min: 18.0,
                max: 25.0,
                category_match_value: "young_adult".to_string(),
            }],
        };
        let mut msg = base_message("age");
        msg.labels = vec![label("age", "a22", true)];
        impute_age_category(&mut msg, &config).unwrap();
        assert_eq!(msg.latest_label_for_scheme("age_category").unwrap().code_id, "18-25");
    }

    #[test]
    fn kenya_location_collapses_conflicting_normal_codes() {
        // Two distinct schemes both resolving to a NORMAL code for the same message.
        let ward_scheme = CodeScheme::new("ward", vec![Code::normal("ward_a", "A")]);
        let sub_location_scheme = CodeScheme::new("sub_location", vec![Code::normal("sl_b", "B")]);
        let config = KenyaLocationConfig {
            location_dataset: "location".to_string(),
            location_schemes: vec![ward_scheme, sub_location_scheme],
            constituency_scheme_id: "constituency".to_string(),
            county_scheme_id: "county".to_string(),
        };
        let hierarchy = StaticKenyaLocationHierarchy::default();
        let mut msg = base_message("location");
        msg.labels = vec![label("ward", "ward_a", true), label("sub_location", "sl_b", true)];
        impute_kenya_location(&mut msg, &config, &hierarchy).unwrap();
        assert_eq!(msg.latest_label_for_scheme("constituency").unwrap().code_id, special_codes::CODING_ERROR);
        assert_eq!(msg.latest_label_for_scheme("county").unwrap().code_id, special_codes::CODING_ERROR);
    }

    #[test]
    fn kenya_location_resolves_hierarchy_for_single_code() {
        let ward_scheme = CodeScheme::new("ward", vec![Code::normal("ward_a", "A")]);
        let mut entries = HashMap::new();
        entries.insert(
            "ward_a".to_string(),
            (Code::normal("nairobi_west", "Nairobi West"), Code::normal("nairobi", "Nairobi")),
        );
        let hierarchy = StaticKenyaLocationHierarchy::new(entries);
        let config = KenyaLocationConfig {
            location_dataset: "location".to_string(),
            location_schemes: vec![ward_scheme],
            constituency_scheme_id: "constituency".to_string(),
            county_scheme_id: "county".to_string(),
        };
        let mut msg = base_message("location");
        msg.labels = vec![label("ward", "ward_a", true)];
        impute_kenya_location(&mut msg, &config, &hierarchy).unwrap();
        assert_eq!(msg.latest_label_for_scheme("constituency").unwrap().code_id, "nairobi_west");
        assert_eq!(msg.latest_label_for_scheme("county").unwrap().code_id, "nairobi");
    }

    #[test]
    fn ws_coding_error_flags_mismatch() {
        let gender = CodeScheme::new(
            "gender",
            vec![Code::normal("male", "male"), Code::control("ws", control_codes::WRONG_SCHEME)],
        );
        let ws_scheme = CodeScheme::new(reconcile_types::code_scheme::WS_CORRECT_DATASET_SCHEME_ID, vec![]);
        let mut msg = base_message("gender");
        msg.labels = vec![label("gender", "ws", true)];
        impute_ws_coding_error(&mut msg, &[&gender], &ws_scheme).unwrap();
        assert_eq!(msg.latest_label_for_scheme("gender").unwrap().code_id, special_codes::CODING_ERROR);
    }
}

//! Identity resolution for upstream records: phone-number validation, URN formatting, and
//! de-identification via an external UUID table (§4.D step 1, S7).
//!
//! Grounded in `kobotoolbox_to_engagement_db.py`'s
//! `_validate_phone_number_and_format_as_urn` / `_get_participant_uuid_for_response`.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// External table that maps a stable identity URN to an opaque, de-identified
/// `participant_uuid`. A production implementation would be backed by a managed lookup
/// service; out of scope here per spec.md §1 ("credential loading and blob-fetch glue").
pub trait IdentityTable: Send + Sync {
    fn data_to_uuid(&self, urn: &str) -> String;
}

/// Normalizes a raw phone number, validates it against `country_code`/`valid_length`/
/// `valid_prefixes`, and formats it as a `tel:+<number>` URN.
///
/// Mirrors the original's normalisation: strip everything but digits, then strip leading
/// zeros, before checking the country code / prefix / length.
pub fn validate_phone_number_and_format_as_urn(
    phone_number: &str,
    country_code: &str,
    valid_length: usize,
    valid_prefixes: Option<&HashSet<&str>>,
) -> Result<String> {
    let digits_only: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();
    let normalized = digits_only.trim_start_matches('0').to_string();

    if normalized.is_empty() {
        return Err(Error::InvalidIdentifier {
            reason: "invalid phone number".to_string(),
        });
    }

    let with_country_code = if normalized.starts_with(country_code) {
        normalized
    } else {
        if let Some(prefixes) = valid_prefixes {
            if !prefixes.iter().any(|p| normalized.starts_with(p)) {
                let mut sorted: Vec<&&str> = prefixes.iter().collect();
                sorted.sort();
                let joined = sorted.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ");
                return Err(Error::InvalidIdentifier {
                    reason: format!("phone number must contain a valid prefix; valid prefixes specified: {joined}"),
                });
            }
        }
        format!("{country_code}{normalized}")
    };

    if with_country_code.len() != valid_length {
        return Err(Error::InvalidIdentifier {
            reason: format!(
                "invalid phone number length; expected length is {valid_length}, got {}",
                with_country_code.len()
            ),
        });
    }

    Ok(format!("tel:+{with_country_code}"))
}

/// Kenya mobile number defaults used throughout the pipeline (§4.D step 1, S7): country
/// code `254`, total length 12, mobile prefixes `{7, 10, 11}`.
pub fn validate_kenya_mobile_number(phone_number: &str) -> Result<String> {
    let prefixes: HashSet<&str> = ["7", "10", "11"].into_iter().collect();
    validate_phone_number_and_format_as_urn(phone_number, "254", 12, Some(&prefixes))
}

/// Resolves the `participant_uuid` for an upstream record that may carry a raw identity
/// field (§4.D step 1).
///
/// If `identity_field` is `Some` and validates, looks it up (de-identified) via
/// `uuid_table`. Otherwise falls back to `fallback_response_id` (then the uuid is *not*
/// de-identified). When validation fails and `ignore_invalid_identifiers` is false, the
/// whole record fails.
pub fn resolve_participant_uuid(
    identity_field: Option<&str>,
    fallback_response_id: &str,
    uuid_table: &dyn IdentityTable,
    ignore_invalid_identifiers: bool,
) -> Result<String> {
    let Some(identity) = identity_field else {
        return Ok(fallback_response_id.to_string());
    };

    match validate_kenya_mobile_number(identity) {
        Ok(urn) => Ok(uuid_table.data_to_uuid(&urn)),
        Err(e) => {
            if ignore_invalid_identifiers {
                tracing::warn!(error = %e, "using response id as participant_uuid instead");
                Ok(fallback_response_id.to_string())
            } else {
                Err(Error::InvalidIdentifier {
                    reason: format!("invalid participant id '{identity}': {e}"),
                })
            }
        }
    }
}

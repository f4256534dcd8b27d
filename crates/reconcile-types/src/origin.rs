use serde::{Deserialize, Serialize};

/// Identifies the upstream record a [`crate::Message`] was ingested from. `origin_id` is
/// unique across the upstream universe and is the deduplication key (§3.1, §4.B).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageOrigin {
    pub origin_id: String,
    pub origin_type: String,
}

impl MessageOrigin {
    pub fn new(origin_id: impl Into<String>, origin_type: impl Into<String>) -> Self {
        MessageOrigin {
            origin_id: origin_id.into(),
            origin_type: origin_type.into(),
        }
    }

    /// Builds an `origin_id` from `{source_kind, form/flow id, response id, field id}` as
    /// described in §4.D.2.
    pub fn build_origin_id(
        source_kind: &str,
        flow_or_form_id: &str,
        response_id: &str,
        field_id: &str,
    ) -> String {
        format!("{source_kind}_{flow_or_form_id}_{response_id}_{field_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_composite_origin_id() {
        let id = MessageOrigin::build_origin_id("kobotoolbox", "form-1", "resp-42", "q_gender");
        assert_eq!(id, "kobotoolbox_form-1_resp-42_q_gender");
    }
}

//! SMS flow-platform adapter, modelled on `rapid_pro_to_engagement_db`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use reconcile_types::{Direction, Message, MessageOrigin, MessageStatus};

use crate::error::Result;
use crate::identity::IdentityTable;
use crate::traits::{MapOutcome, MessageProposal, SourceAdapter, Watermark};

/// Configuration for syncing one flow result field to an engagement-db dataset, mirroring
/// `rapid_pro_to_engagement_db/configuration.py`'s `FlowResultConfiguration`.
#[derive(Debug, Clone)]
pub struct FlowResultConfiguration {
    pub flow_name: String,
    pub flow_result_field: String,
    pub engagement_db_dataset: String,
}

impl FlowResultConfiguration {
    pub fn new(
        flow_name: impl Into<String>,
        flow_result_field: impl Into<String>,
        engagement_db_dataset: impl Into<String>,
    ) -> Self {
        FlowResultConfiguration {
            flow_name: flow_name.into(),
            flow_result_field: flow_result_field.into(),
            engagement_db_dataset: engagement_db_dataset.into(),
        }
    }
}

/// One run of a flow, as returned by the upstream flow platform client. `result_fields`
/// holds every result field the run captured, keyed by field name.
#[derive(Debug, Clone)]
pub struct FlowRecord {
    pub flow_name: String,
    pub run_id: String,
    pub contact_urn: String,
    pub result_fields: HashMap<String, String>,
    pub created_on: DateTime<Utc>,
}

/// The concrete flow-platform API client. Out of scope per spec.md §1 ("concrete upstream
/// ... client libraries"); callers inject a real implementation.
pub trait FlowPlatformClient: Send + Sync {
    fn fetch_runs(&self, flow_name: &str, since: Option<DateTime<Utc>>) -> Result<Vec<FlowRecord>>;
}

pub struct FlowPlatformAdapter<'a> {
    source_id: String,
    configs: Vec<FlowResultConfiguration>,
    client: &'a dyn FlowPlatformClient,
    uuid_table: &'a dyn IdentityTable,
    ignore_invalid_identifiers: bool,
}

impl<'a> FlowPlatformAdapter<'a> {
    pub fn new(
        source_id: impl Into<String>,
        configs: Vec<FlowResultConfiguration>,
        client: &'a dyn FlowPlatformClient,
        uuid_table: &'a dyn IdentityTable,
        ignore_invalid_identifiers: bool,
    ) -> Self {
        FlowPlatformAdapter {
            source_id: source_id.into(),
            configs,
            client,
            uuid_table,
            ignore_invalid_identifiers,
        }
    }
}

impl<'a> SourceAdapter for FlowPlatformAdapter<'a> {
    type Record = FlowRecord;

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch(&self, since: Option<&Watermark>) -> Result<Vec<FlowRecord>> {
        let since_ts = match since {
            Some(Watermark::Timestamp(ts)) => Some(*ts),
            _ => None,
        };
        let mut flow_names: Vec<&str> = self.configs.iter().map(|c| c.flow_name.as_str()).collect();
        flow_names.sort();
        flow_names.dedup();

        let mut records = Vec::new();
        for flow_name in flow_names {
            records.extend(self.client.fetch_runs(flow_name, since_ts)?);
        }
        records.sort_by_key(|r| r.created_on);
        Ok(records)
    }

    fn map(&self, record: &FlowRecord) -> Result<MapOutcome> {
        let participant_uuid = crate::identity::resolve_participant_uuid(
            Some(&record.contact_urn),
            &record.run_id,
            self.uuid_table,
            self.ignore_invalid_identifiers,
        )?;

        let mut outcome = MapOutcome::default();
        for config in &self.configs {
            if config.flow_name != record.flow_name {
                continue;
            }
            let Some(value) = record.result_fields.get(&config.flow_result_field) else {
                tracing::warn!(field = %config.flow_result_field, "found no response for flow result field; skipping");
                outcome.null_fields.push(config.flow_result_field.clone());
                continue;
            };

            let origin_id = MessageOrigin::build_origin_id(
                "flow_platform",
                &record.flow_name,
                &record.run_id,
                &config.flow_result_field,
            );

            let message = Message {
                message_id: origin_id.clone(),
                participant_uuid: participant_uuid.clone(),
                text: value.clone(),
                timestamp: record.created_on,
                direction: Direction::In,
                channel_operator: "flow_platform".to_string(),
                status: MessageStatus::Live,
                dataset: config.engagement_db_dataset.clone(),
                labels: Vec::new(),
                previous_datasets: Vec::new(),
                coda_id: None,
                origin: MessageOrigin::new(origin_id, "flow_platform"),
                history: Vec::new(),
            };

            outcome.proposals.push(MessageProposal {
                dataset: config.engagement_db_dataset.clone(),
                message,
            });
        }
        Ok(outcome)
    }

    fn watermark_for(&self, record: &FlowRecord) -> Watermark {
        Watermark::Timestamp(record.created_on)
    }
}

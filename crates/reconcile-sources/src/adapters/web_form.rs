//! Web-form-platform adapter, modelled on `kobotoolbox_to_engagement_db.py`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use reconcile_types::{Direction, Message, MessageOrigin, MessageStatus};

use crate::error::Result;
use crate::identity::IdentityTable;
use crate::traits::{MapOutcome, MessageProposal, SourceAdapter, Watermark};

/// Configuration for syncing one form question/answer column to an engagement-db
/// dataset, mirroring the original's per-question `question_configurations` entries.
#[derive(Debug, Clone)]
pub struct QuestionConfiguration {
    pub data_column_name: String,
    pub engagement_db_dataset: String,
}

impl QuestionConfiguration {
    pub fn new(data_column_name: impl Into<String>, engagement_db_dataset: impl Into<String>) -> Self {
        QuestionConfiguration {
            data_column_name: data_column_name.into(),
            engagement_db_dataset: engagement_db_dataset.into(),
        }
    }
}

/// One response submitted to the form, as returned by the upstream form-platform client.
#[derive(Debug, Clone)]
pub struct WebFormRecord {
    pub response_id: String,
    pub form_uuid: String,
    pub asset_uid: String,
    pub submission_time: DateTime<Utc>,
    /// Answer for the participant-identity question, if the form asked one.
    pub participant_id_answer: Option<String>,
    pub answers: HashMap<String, String>,
}

/// The concrete form-platform API client. Out of scope per spec.md §1; callers inject a
/// real implementation.
pub trait WebFormClient: Send + Sync {
    fn fetch_responses(&self, asset_uid: &str, since: Option<DateTime<Utc>>) -> Result<Vec<WebFormRecord>>;
}

pub struct WebFormAdapter<'a> {
    asset_uid: String,
    questions: Vec<QuestionConfiguration>,
    client: &'a dyn WebFormClient,
    uuid_table: &'a dyn IdentityTable,
    ignore_invalid_identifiers: bool,
}

impl<'a> WebFormAdapter<'a> {
    pub fn new(
        asset_uid: impl Into<String>,
        questions: Vec<QuestionConfiguration>,
        client: &'a dyn WebFormClient,
        uuid_table: &'a dyn IdentityTable,
        ignore_invalid_identifiers: bool,
    ) -> Self {
        WebFormAdapter {
            asset_uid: asset_uid.into(),
            questions,
            client,
            uuid_table,
            ignore_invalid_identifiers,
        }
    }
}

impl<'a> SourceAdapter for WebFormAdapter<'a> {
    type Record = WebFormRecord;

    fn source_id(&self) -> &str {
        &self.asset_uid
    }

    fn fetch(&self, since: Option<&Watermark>) -> Result<Vec<WebFormRecord>> {
        let since_ts = match since {
            Some(Watermark::Timestamp(ts)) => Some(*ts),
            _ => None,
        };
        let mut records = self.client.fetch_responses(&self.asset_uid, since_ts)?;
        records.sort_by_key(|r| r.submission_time);
        Ok(records)
    }

    fn map(&self, record: &WebFormRecord) -> Result<MapOutcome> {
        let participant_uuid = crate::identity::resolve_participant_uuid(
            record.participant_id_answer.as_deref(),
            &record.response_id,
            self.uuid_table,
            self.ignore_invalid_identifiers,
        )?;

        let mut outcome = MapOutcome::default();
        for question in &self.questions {
            let Some(answer) = record.answers.get(&question.data_column_name) else {
                tracing::warn!(column = %question.data_column_name, "found no response for column; skipping");
                outcome.null_fields.push(question.data_column_name.clone());
                continue;
            };

            let origin_id = format!(
                "kobotoolbox_form_asset_id_{}.response_uuid_{}.data_column_name_{}",
                self.asset_uid, record.response_id, question.data_column_name
            );

            let message = Message {
                message_id: origin_id.clone(),
                participant_uuid: participant_uuid.clone(),
                text: answer.clone(),
                timestamp: record.submission_time,
                direction: Direction::In,
                channel_operator: "kobotoolbox".to_string(),
                status: MessageStatus::Live,
                dataset: question.engagement_db_dataset.clone(),
                labels: Vec::new(),
                previous_datasets: Vec::new(),
                coda_id: None,
                origin: MessageOrigin::new(origin_id, "kobotoolbox"),
                history: Vec::new(),
            };

            outcome.proposals.push(MessageProposal {
                dataset: question.engagement_db_dataset.clone(),
                message,
            });
        }
        Ok(outcome)
    }

    fn watermark_for(&self, record: &WebFormRecord) -> Watermark {
        Watermark::Timestamp(record.submission_time)
    }
}

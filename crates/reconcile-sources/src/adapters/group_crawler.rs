//! Messaging-group crawler adapter, modelled on `telegram_to_engagement_db`. Unlike the
//! flow-platform and web-form adapters, this source is cursor-based: the watermark is the
//! latest seen `message.id`, not a timestamp.

use chrono::{DateTime, Utc};

use reconcile_types::{Direction, Message, MessageOrigin, MessageStatus};

use crate::error::Result;
use crate::traits::{MapOutcome, MessageProposal, SourceAdapter, Watermark};

/// One message posted in the crawled group.
#[derive(Debug, Clone)]
pub struct GroupMessageRecord {
    pub group_id: String,
    pub message_id: i64,
    pub author_uuid: String,
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

/// The concrete group-crawler API client. Out of scope per spec.md §1; callers inject a
/// real implementation.
pub trait GroupCrawlerClient: Send + Sync {
    fn fetch_messages_since(&self, group_id: &str, min_message_id: Option<i64>) -> Result<Vec<GroupMessageRecord>>;
}

pub struct GroupCrawlerAdapter<'a> {
    group_id: String,
    engagement_db_dataset: String,
    client: &'a dyn GroupCrawlerClient,
}

impl<'a> GroupCrawlerAdapter<'a> {
    pub fn new(group_id: impl Into<String>, engagement_db_dataset: impl Into<String>, client: &'a dyn GroupCrawlerClient) -> Self {
        GroupCrawlerAdapter {
            group_id: group_id.into(),
            engagement_db_dataset: engagement_db_dataset.into(),
            client,
        }
    }
}

impl<'a> SourceAdapter for GroupCrawlerAdapter<'a> {
    type Record = GroupMessageRecord;

    fn source_id(&self) -> &str {
        &self.group_id
    }

    fn fetch(&self, since: Option<&Watermark>) -> Result<Vec<GroupMessageRecord>> {
        let min_id = match since {
            Some(Watermark::Cursor(id)) => Some(*id),
            _ => None,
        };
        let mut records = self.client.fetch_messages_since(&self.group_id, min_id)?;
        records.sort_by_key(|r| r.message_id);
        Ok(records)
    }

    fn map(&self, record: &GroupMessageRecord) -> Result<MapOutcome> {
        let origin_id = MessageOrigin::build_origin_id(
            "group_crawler",
            &record.group_id,
            &record.message_id.to_string(),
            "text",
        );

        let message = Message {
            message_id: origin_id.clone(),
            participant_uuid: record.author_uuid.clone(),
            text: record.text.clone(),
            timestamp: record.posted_at,
            direction: Direction::In,
            channel_operator: "group_crawler".to_string(),
            status: MessageStatus::Live,
            dataset: self.engagement_db_dataset.clone(),
            labels: Vec::new(),
            previous_datasets: Vec::new(),
            coda_id: None,
            origin: MessageOrigin::new(origin_id, "group_crawler"),
            history: Vec::new(),
        };

        Ok(MapOutcome {
            proposals: vec![MessageProposal {
                dataset: self.engagement_db_dataset.clone(),
                message,
            }],
            null_fields: Vec::new(),
        })
    }

    fn watermark_for(&self, record: &GroupMessageRecord) -> Watermark {
        Watermark::Cursor(record.message_id)
    }
}

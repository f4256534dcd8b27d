//! Integration coverage for two of spec §8.1's source-ingestion properties, exercised
//! through the real `sync_source_to_engagement_db` stage against a real `Cache` and a real
//! `EngagementDb` (the unit tests near the dedup/cache implementations only exercise each
//! piece in isolation).

use std::cell::RefCell;

use chrono::Utc;
use tempfile::TempDir;

use reconcile_runtime::{sync_source_to_engagement_db, WatermarkKind};
use reconcile_sources::{MapOutcome, MessageProposal, SourceAdapter, SyncEvent, Watermark};
use reconcile_store::{Cache, EngagementDb};
use reconcile_types::{Direction, Message, MessageOrigin, MessageStatus};

fn provenance() -> reconcile_runtime::Provenance {
    reconcile_runtime::Provenance::new(
        "pipeline-runner",
        &reconcile_runtime::PipelineConfig {
            pipeline_name: "test".to_string(),
            test_participant_uuids: vec![],
            filter_test_messages: false,
            project_start_date: Default::default(),
            project_end_date: Default::default(),
            default_ws_dataset: None,
            set_dataset_from_ws_string_value: false,
            incremental_cache_path: None,
            engagement_db_path: std::path::PathBuf::from("engagement.db"),
            project: "git@github.com:org/project.git".to_string(),
            commit: "abc123".to_string(),
        },
    )
}

fn record(id: i64) -> Message {
    Message {
        message_id: format!("m-{id}"),
        participant_uuid: "p-1".to_string(),
        text: format!("message {id}"),
        timestamp: Utc::now(),
        direction: Direction::In,
        channel_operator: "kobotoolbox".to_string(),
        status: MessageStatus::Live,
        dataset: "gender".to_string(),
        labels: Vec::new(),
        previous_datasets: Vec::new(),
        coda_id: None,
        origin: MessageOrigin::new(format!("origin-{id}"), "kobotoolbox"),
        history: Vec::new(),
    }
}

/// An upstream stub that ignores `since` entirely and always returns the full fixed record
/// set, so the test exercises the engagement DB's own dedup rather than server-side
/// watermark filtering.
struct FullReplayAdapter {
    records: Vec<Message>,
    fetch_calls: RefCell<u32>,
}

impl SourceAdapter for FullReplayAdapter {
    type Record = Message;

    fn source_id(&self) -> &str {
        "full-replay"
    }

    fn fetch(&self, _since: Option<&Watermark>) -> reconcile_sources::Result<Vec<Message>> {
        *self.fetch_calls.borrow_mut() += 1;
        Ok(self.records.clone())
    }

    fn map(&self, record: &Message) -> reconcile_sources::Result<MapOutcome> {
        Ok(MapOutcome {
            proposals: vec![MessageProposal {
                dataset: record.dataset.clone(),
                message: record.clone(),
            }],
            null_fields: Vec::new(),
        })
    }

    fn watermark_for(&self, record: &Message) -> Watermark {
        Watermark::Cursor(record.message_id.trim_start_matches("m-").parse().unwrap())
    }
}

#[test]
fn running_the_ingestor_twice_yields_the_same_message_set() {
    let dir = TempDir::new().unwrap();
    let cache = Cache::new(dir.path());
    let mut db = EngagementDb::open_in_memory().unwrap();
    let adapter = FullReplayAdapter {
        records: vec![record(1), record(2), record(3)],
        fetch_calls: RefCell::new(0),
    };

    let first = sync_source_to_engagement_db(&adapter, WatermarkKind::Cursor, &cache, &mut db, &provenance(), false).unwrap();
    assert_eq!(first.count(SyncEvent::AddMessageToEngagementDb), 3);

    let second = sync_source_to_engagement_db(&adapter, WatermarkKind::Cursor, &cache, &mut db, &provenance(), false).unwrap();
    assert_eq!(second.count(SyncEvent::AddMessageToEngagementDb), 0);
    assert_eq!(second.count(SyncEvent::MessageAlreadyInEngagementDb), 3);

    let stored = db.get_by_filter(&reconcile_store::MessageFilter::default()).unwrap();
    assert_eq!(stored.len(), 3);
}

#[test]
fn corrupted_watermark_is_treated_as_absent_without_losing_monotonicity() {
    let dir = TempDir::new().unwrap();
    let cache = Cache::new(dir.path());
    let mut db = EngagementDb::open_in_memory().unwrap();
    let adapter = FullReplayAdapter {
        records: vec![record(1), record(2)],
        fetch_calls: RefCell::new(0),
    };

    sync_source_to_engagement_db(&adapter, WatermarkKind::Cursor, &cache, &mut db, &provenance(), false).unwrap();
    assert_eq!(cache.get_cursor("full-replay").unwrap(), Some(2));

    // Simulate a crash that left the watermark file truncated mid-write.
    std::fs::write(dir.path().join("full-replay.txt"), "not-a-nu").unwrap();
    assert_eq!(cache.get_cursor("full-replay").unwrap(), None);

    // A run against the corrupted watermark must still succeed (full re-fetch), not abort,
    // and must leave the watermark at least as far along as every message actually
    // committed from this source.
    let stats = sync_source_to_engagement_db(&adapter, WatermarkKind::Cursor, &cache, &mut db, &provenance(), false).unwrap();
    assert_eq!(stats.count(SyncEvent::MessageAlreadyInEngagementDb), 2);
    assert_eq!(cache.get_cursor("full-replay").unwrap(), Some(2));

    let stored = db.get_by_filter(&reconcile_store::MessageFilter::default()).unwrap();
    assert_eq!(stored.len(), 2);
}

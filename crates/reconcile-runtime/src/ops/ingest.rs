//! Source-adapter sync stages (§4.D wired to §4.C/§4.E): `sync flow-to-engagement-db`,
//! `sync web-form-to-engagement-db`, `sync group-to-engagement-db`. One generic core, since
//! every source adapter conforms to the same `fetch`/`map`/`watermark_for` shape; the three
//! CLI-facing names differ only in which `Watermark` variant the source's cache entry
//! holds.

use serde_json::json;

use reconcile_sources::{ensure_message_exists, SourceAdapter, SyncEvent, SyncStats, Watermark};
use reconcile_store::{Cache, EngagementDb};

use crate::error::Result;
use crate::provenance::Provenance;

/// Which cache representation a source's watermark is stored as (§4.C, §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkKind {
    Timestamp,
    Cursor,
}

fn load_watermark(cache: &Cache, source_id: &str, kind: WatermarkKind) -> Result<Option<Watermark>> {
    match kind {
        WatermarkKind::Timestamp => Ok(cache.get_date_time(source_id)?.map(Watermark::Timestamp)),
        WatermarkKind::Cursor => Ok(cache.get_cursor(source_id)?.map(Watermark::Cursor)),
    }
}

fn save_watermark(cache: &Cache, source_id: &str, watermark: &Watermark) -> Result<()> {
    match watermark {
        Watermark::Timestamp(ts) => cache.set_date_time(source_id, *ts)?,
        Watermark::Cursor(cursor) => cache.set_cursor(source_id, *cursor)?,
    }
    Ok(())
}

/// Pulls everything new from `adapter` since its cached watermark, de-duplicates into `db`,
/// and advances the cache to the last record seen. A record whose mapping fails (e.g. an
/// invalid identifier with `ignore_invalid_identifiers` off) is logged and skipped rather
/// than aborting the rest of the batch (§7 `ValidationError`, "abort record").
pub fn sync_source_to_engagement_db<A: SourceAdapter>(
    adapter: &A,
    watermark_kind: WatermarkKind,
    cache: &Cache,
    db: &mut EngagementDb,
    provenance: &Provenance,
    dry_run: bool,
) -> Result<SyncStats> {
    let since = load_watermark(cache, adapter.source_id(), watermark_kind)?;
    let records = adapter.fetch(since.as_ref())?;
    let mut stats = SyncStats::new();
    let mut latest_watermark = since;

    for record in &records {
        stats.add_event(SyncEvent::ReadRecordFromSource);
        let outcome = match adapter.map(record) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(source_id = adapter.source_id(), error = %e, "skipping record that failed to map");
                latest_watermark = Some(adapter.watermark_for(record));
                continue;
            }
        };

        for field in &outcome.null_fields {
            stats.add_event(SyncEvent::FoundNullResponse);
            tracing::debug!(source_id = adapter.source_id(), field, "missing field in upstream record");
        }

        for proposal in outcome.proposals {
            stats.add_event(SyncEvent::ReadFieldFromRecord);
            if dry_run {
                tracing::info!(dataset = %proposal.dataset, "dry run: would add message to engagement database");
                continue;
            }
            let history = provenance.stamp("source_sync", json!({"source_id": adapter.source_id(), "dataset": proposal.dataset}));
            let event = ensure_message_exists(db, proposal.message, history);
            stats.add_event(event);
        }

        latest_watermark = Some(adapter.watermark_for(record));
    }

    if !dry_run {
        if let Some(watermark) = &latest_watermark {
            save_watermark(cache, adapter.source_id(), watermark)?;
        }
    }

    stats.print_summary();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use reconcile_sources::{GroupCrawlerAdapter, MapOutcome, MessageProposal};
    use reconcile_types::{Direction, Message, MessageOrigin, MessageStatus};
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct StubGroupClient {
        messages: RefCell<Vec<reconcile_sources::adapters::GroupMessageRecord>>,
    }
    impl reconcile_sources::adapters::group_crawler::GroupCrawlerClient for StubGroupClient {
        fn fetch_messages_since(&self, _group_id: &str, min_id: Option<i64>) -> reconcile_sources::Result<Vec<reconcile_sources::adapters::GroupMessageRecord>> {
            Ok(self
                .messages
                .borrow()
                .iter()
                .filter(|m| match min_id {
                    Some(min) => m.message_id > min,
                    None => true,
                })
                .cloned()
                .collect())
        }
    }

    fn group_record(id: i64) -> reconcile_sources::adapters::GroupMessageRecord {
        reconcile_sources::adapters::GroupMessageRecord {
            group_id: "group-1".to_string(),
            message_id: id,
            author_uuid: "p-1".to_string(),
            text: format!("message {id}"),
            posted_at: Utc::now(),
        }
    }

    fn provenance() -> Provenance {
        Provenance::new(
            "pipeline-runner",
            &crate::config::PipelineConfig {
                pipeline_name: "test".to_string(),
                test_participant_uuids: vec![],
                filter_test_messages: false,
                project_start_date: DateTime::<Utc>::default(),
                project_end_date: DateTime::<Utc>::default(),
                default_ws_dataset: None,
                set_dataset_from_ws_string_value: false,
                incremental_cache_path: None,
                engagement_db_path: std::path::PathBuf::from("engagement.db"),
                project: "git@github.com:org/project.git".to_string(),
                commit: "abc123".to_string(),
            },
        )
    }

    fn sample_message(origin_id: &str) -> Message {
        Message {
            message_id: format!("m-{origin_id}"),
            participant_uuid: "p-1".to_string(),
            text: "hello".to_string(),
            timestamp: Utc::now(),
            direction: Direction::In,
            channel_operator: "telegram".to_string(),
            status: MessageStatus::Live,
            dataset: "group-dataset".to_string(),
            labels: Vec::new(),
            previous_datasets: Vec::new(),
            coda_id: None,
            origin: MessageOrigin::new(origin_id, "telegram"),
            history: Vec::new(),
        }
    }

    struct FixedAdapter;
    impl SourceAdapter for FixedAdapter {
        type Record = Message;

        fn source_id(&self) -> &str {
            "fixed-1"
        }

        fn fetch(&self, _since: Option<&Watermark>) -> reconcile_sources::Result<Vec<Message>> {
            Ok(vec![sample_message("origin-1")])
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

        fn watermark_for(&self, _record: &Message) -> Watermark {
            Watermark::Cursor(1)
        }
    }

    #[test]
    fn syncs_records_and_advances_cursor_watermark() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let mut db = EngagementDb::open_in_memory().unwrap();
        let adapter = FixedAdapter;
        let stats = sync_source_to_engagement_db(&adapter, WatermarkKind::Cursor, &cache, &mut db, &provenance(), false).unwrap();
        assert_eq!(stats.count(SyncEvent::AddMessageToEngagementDb), 1);
        assert_eq!(cache.get_cursor("fixed-1").unwrap(), Some(1));
    }

    #[test]
    fn dry_run_does_not_mutate_db_or_cache() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let mut db = EngagementDb::open_in_memory().unwrap();
        let adapter = FixedAdapter;
        sync_source_to_engagement_db(&adapter, WatermarkKind::Cursor, &cache, &mut db, &provenance(), true).unwrap();
        assert!(db.get_by_origin_id("origin-1").unwrap().is_none());
        assert_eq!(cache.get_cursor("fixed-1").unwrap(), None);
    }

    #[test]
    fn group_crawler_adapter_advances_a_cursor_watermark() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path());
        let mut db = EngagementDb::open_in_memory().unwrap();
        let client = StubGroupClient {
            messages: RefCell::new(vec![group_record(1), group_record(2)]),
        };
        let adapter = GroupCrawlerAdapter::new("group-1", "group-dataset", &client);
        let stats = sync_source_to_engagement_db(&adapter, WatermarkKind::Cursor, &cache, &mut db, &provenance(), false).unwrap();
        assert_eq!(stats.count(SyncEvent::AddMessageToEngagementDb), 2);
        assert_eq!(cache.get_cursor("group-1").unwrap(), Some(2));
    }
}

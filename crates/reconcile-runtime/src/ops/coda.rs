//! Coding-tool sync stages (§4.G-§4.I wired to §4.E/§4.F): `sync engagement-db-to-coda`
//! (scheme reconciliation + forward sync) and `sync coda-to-engagement-db` (back sync with
//! WS correction and cycle detection).

use serde_json::json;

use reconcile_engine::{BackSyncEvent, CodaSyncConfig, CodingToolClient, SchemeSyncReport, UserIdSource};
use reconcile_store::{EngagementDb, MessageFilter};
use reconcile_types::MessageStatus;

use crate::error::Result;
use crate::provenance::Provenance;
use crate::stats::StageStats;

/// Forward syncs every live, filtered message to Coda (§4.G), first reconciling users and
/// code schemes per dataset unless `skip_updating_users_and_code_schemes` is set
/// (§6.3 `--skip-updating-coda-users-and-code-schemes`).
pub fn sync_engagement_db_to_coda<C: CodingToolClient, U: UserIdSource>(
    db: &mut EngagementDb,
    coding_tool: &mut C,
    config: &CodaSyncConfig,
    user_ids: &U,
    filter: &MessageFilter,
    skip_updating_users_and_code_schemes: bool,
    dry_run: bool,
) -> Result<(Vec<SchemeSyncReport>, StageStats)> {
    let scheme_reports = if skip_updating_users_and_code_schemes {
        tracing::info!("skipping coda user/code-scheme reconciliation for this run");
        Vec::new()
    } else {
        reconcile_engine::sync_users_and_code_schemes(config, coding_tool, user_ids, dry_run)
    };

    let mut stats = StageStats::new();
    let messages = db.get_by_filter(filter)?;

    for mut message in messages {
        if message.status != MessageStatus::Live {
            continue;
        }
        if dry_run {
            tracing::info!(message_id = %message.message_id, "dry run: would forward-sync message to coda");
            stats.add("would_forward_sync");
            continue;
        }
        match reconcile_engine::sync_message_to_coda(config, coding_tool, &mut message) {
            Ok(()) => {
                db.set_message(&message)?;
                stats.add("forward_synced");
            }
            Err(e) => {
                tracing::warn!(message_id = %message.message_id, error = %e, "forward sync failed for message");
                stats.add("forward_sync_failed");
            }
        }
    }

    stats.print_summary();
    Ok((scheme_reports, stats))
}

/// Pulls every Coda message across all configured datasets and applies the coder's labels
/// back onto the matching engagement-db message, running WS correction and cycle detection
/// as needed (§4.H).
pub fn sync_coda_to_engagement_db<C: CodingToolClient>(
    db: &mut EngagementDb,
    coding_tool: &mut C,
    config: &CodaSyncConfig,
    provenance: &Provenance,
    dry_run: bool,
) -> Result<StageStats> {
    let mut stats = StageStats::new();

    for dataset_config in &config.dataset_configs {
        for coding_message in coding_tool.iter_dataset_messages(&dataset_config.coda_dataset_id) {
            let Some(mut message) = db.get_by_coda_id(&coding_message.coda_id)? else {
                tracing::warn!(coda_id = %coding_message.coda_id, "coda message has no matching engagement-db message");
                continue;
            };

            if dry_run {
                tracing::info!(message_id = %message.message_id, "dry run: would back-sync coda labels");
                stats.add("would_back_sync");
                continue;
            }

            match reconcile_engine::update_message_from_coda(config, coding_tool, &mut message, &coding_message) {
                Ok(event) => {
                    stats.add(format!("{event:?}"));
                    if event != BackSyncEvent::LabelsMatch {
                        let history = provenance.stamp(
                            "back_sync",
                            json!({"coda_id": coding_message.coda_id, "event": format!("{event:?}")}),
                        );
                        message.push_history(history);
                        db.set_message(&message)?;
                    }
                }
                Err(e) => {
                    tracing::warn!(message_id = %message.message_id, error = %e, "back sync failed for message");
                    stats.add("back_sync_failed");
                }
            }
        }
    }

    stats.print_summary();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reconcile_engine::{CodaDatasetConfig, CodeSchemeConfig};
    use reconcile_types::{Code, CodeScheme, Direction, Message, MessageOrigin};

    use crate::coding_tool::InMemoryCodingTool;

    struct FixedUserIds;
    impl UserIdSource for FixedUserIds {
        fn user_ids(&self, file_url: &str) -> Vec<String> {
            vec![format!("{file_url}-user")]
        }
    }

    fn config() -> CodaSyncConfig {
        CodaSyncConfig {
            dataset_configs: vec![CodaDatasetConfig {
                engagement_db_dataset: "gender".to_string(),
                coda_dataset_id: "coda-gender".to_string(),
                code_scheme_configs: vec![CodeSchemeConfig::new(CodeScheme::new("gender-scheme", vec![Code::normal("male", "male")]))],
                update_users_and_code_schemes: true,
                dataset_users_file_url: None,
                ws_code_match_values: vec![],
            }],
            ws_correct_dataset_code_scheme: CodeScheme::new(reconcile_types::code_scheme::WS_CORRECT_DATASET_SCHEME_ID, vec![]),
            project_users_file_url: Some("gs://project-users".to_string()),
            default_ws_dataset: None,
            set_dataset_from_ws_string_value: false,
        }
    }

    fn provenance() -> Provenance {
        Provenance::new(
            "pipeline-runner",
            &crate::config::PipelineConfig {
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

    fn message() -> Message {
        Message {
            message_id: "m-1".to_string(),
            participant_uuid: "p-1".to_string(),
            text: "I am male".to_string(),
            timestamp: Utc::now(),
            direction: Direction::In,
            channel_operator: "kobotoolbox".to_string(),
            status: MessageStatus::Live,
            dataset: "gender".to_string(),
            labels: Vec::new(),
            previous_datasets: Vec::new(),
            coda_id: None,
            origin: MessageOrigin::new("origin-1", "kobotoolbox"),
            history: Vec::new(),
        }
    }

    #[test]
    fn forward_sync_pushes_message_and_reconciles_schemes() {
        let mut db = EngagementDb::open_in_memory().unwrap();
        db.set_message(&message()).unwrap();
        let mut tool = InMemoryCodingTool::new();
        let filter = MessageFilter::default();
        let (reports, stats) = sync_engagement_db_to_coda(&mut db, &mut tool, &config(), &FixedUserIds, &filter, false, false).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].users_updated);
        assert_eq!(stats.count("forward_synced"), 1);
        let stored = db.get_by_origin_id("origin-1").unwrap().unwrap();
        assert!(stored.coda_id.is_some());
    }

    #[test]
    fn skip_flag_leaves_schemes_and_users_untouched() {
        let mut db = EngagementDb::open_in_memory().unwrap();
        db.set_message(&message()).unwrap();
        let mut tool = InMemoryCodingTool::new();
        let filter = MessageFilter::default();
        let (reports, _stats) = sync_engagement_db_to_coda(&mut db, &mut tool, &config(), &FixedUserIds, &filter, true, false).unwrap();
        assert!(reports.is_empty());
        assert!(tool.get_dataset_user_ids("coda-gender").is_none());
    }

    #[test]
    fn back_sync_applies_coda_labels_to_matching_message() {
        let mut db = EngagementDb::open_in_memory().unwrap();
        let mut msg = message();
        msg.coda_id = Some("coda-1".to_string());
        db.set_message(&msg).unwrap();

        let mut tool = InMemoryCodingTool::new();
        let mut coding_message = reconcile_engine::CodingMessage::new("coda-1", "I am male", Utc::now());
        coding_message.labels.push(reconcile_types::Label::new(
            "gender-scheme",
            "male",
            Utc::now(),
            reconcile_types::LabelOrigin::new("coda", "coder-1", "human"),
            true,
        ));
        tool.add_message_to_dataset("coda-gender", coding_message);

        let stats = sync_coda_to_engagement_db(&mut db, &mut tool, &config(), &provenance(), false).unwrap();
        assert_eq!(stats.count("UpdateLabels"), 1);
        let updated = db.get_by_coda_id("coda-1").unwrap().unwrap();
        assert_eq!(updated.latest_labels().len(), 1);
        assert_eq!(updated.history.len(), 1);
    }

    #[test]
    fn back_sync_skips_coda_messages_with_no_matching_db_message() {
        let mut db = EngagementDb::open_in_memory().unwrap();
        let mut tool = InMemoryCodingTool::new();
        tool.add_message_to_dataset("coda-gender", reconcile_engine::CodingMessage::new("coda-orphan", "hi", Utc::now()));
        let stats = sync_coda_to_engagement_db(&mut db, &mut tool, &config(), &provenance(), false).unwrap();
        assert_eq!(stats.count("UpdateLabels"), 0);
    }
}

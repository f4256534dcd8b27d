use std::fs::File;
use std::io::{self, Write};

use reconcile_engine::UserIdSource;
use reconcile_runtime::{Error, PipelineConfig, ProjectionKind, Provenance, Result};
use reconcile_store::EngagementDb;

use crate::args::{Cli, Commands, SyncCommand};
use crate::deployment;

/// No concrete upstream/downstream client library is wired into this build (out of scope);
/// a deployment that wants to run this stage links its own `SourceAdapter`/`CodingToolClient`
/// implementation against `reconcile-runtime` directly.
fn not_configured(what: &str) -> Error {
    Error::NotConfigured(format!("no concrete {what} client is wired into this build"))
}

/// A deployment's own project-users file lookup. The generic binary has none configured;
/// a real deployment injects a `UserIdSource` that reads its own contacts file.
struct NoUserIds;
impl UserIdSource for NoUserIds {
    fn user_ids(&self, _file_url: &str) -> Vec<String> {
        Vec::new()
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let provenance = Provenance::new("reconcile-cli", &config);

    match cli.command {
        Commands::Sync { command } => run_sync(command, &cli, &config, &provenance),
        Commands::EngagementDbToAnalysis { output, per_participant } => run_analysis(&config, output.as_deref(), per_participant),
    }
}

fn run_sync(command: SyncCommand, cli: &Cli, config: &PipelineConfig, provenance: &Provenance) -> Result<()> {
    match command {
        SyncCommand::FlowToEngagementDb => Err(not_configured("flow-platform")),
        SyncCommand::WebFormToEngagementDb => Err(not_configured("web-form")),
        SyncCommand::GroupToEngagementDb => Err(not_configured("group-crawler")),

        SyncCommand::EngagementDbToCoda {
            skip_updating_coda_users_and_code_schemes,
        } => {
            let mut db = EngagementDb::open(&config.engagement_db_path)?;
            let mut coding_tool = reconcile_runtime::InMemoryCodingTool::new();
            let coda_config = deployment::example_coda_sync_config();
            let filter = config.message_filter();
            let (reports, stats) = reconcile_runtime::sync_engagement_db_to_coda(
                &mut db,
                &mut coding_tool,
                &coda_config,
                &NoUserIds,
                &filter,
                skip_updating_coda_users_and_code_schemes,
                cli.dry_run,
            )?;
            for report in &reports {
                tracing::info!(coda_dataset_id = %report.coda_dataset_id, users_updated = report.users_updated, schemes_added_or_updated = report.schemes_added_or_updated.len(), "scheme sync report");
            }
            tracing::info!(forward_synced = stats.count("forward_synced"), "forward sync complete");
            Ok(())
        }

        SyncCommand::CodaToEngagementDb => {
            let mut db = EngagementDb::open(&config.engagement_db_path)?;
            let mut coding_tool = reconcile_runtime::InMemoryCodingTool::new();
            let coda_config = deployment::example_coda_sync_config();
            reconcile_runtime::sync_coda_to_engagement_db(&mut db, &mut coding_tool, &coda_config, provenance, cli.dry_run)?;
            Ok(())
        }
    }
}

fn run_analysis(config: &PipelineConfig, output: Option<&str>, per_participant: bool) -> Result<()> {
    let db = EngagementDb::open(&config.engagement_db_path)?;
    let column_configs = deployment::example_analysis_column_configs();
    let filter = config.message_filter();
    let kind = if per_participant { ProjectionKind::PerParticipant } else { ProjectionKind::PerMessage };
    let rows = reconcile_runtime::project_column_view(&db, &column_configs, &filter, kind)?;

    match output {
        Some(path) => {
            let file = File::create(path)?;
            reconcile_runtime::write_column_view_csv(file, &rows, &column_configs)?;
        }
        None => {
            let stdout = io::stdout();
            reconcile_runtime::write_column_view_csv(stdout.lock(), &rows, &column_configs)?;
        }
    }

    tracing::info!(rows = rows.len(), "analysis export complete");
    Ok(())
}

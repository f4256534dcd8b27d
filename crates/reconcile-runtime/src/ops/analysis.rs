//! `engagement-db-to-analysis`: projects the coded corpus into per-message or
//! per-participant rows (§4.K), applies imputation pass 2 (§4.J steps 5-7), and writes the
//! result as CSV (§6.2 "Analysis exports"). Statistical regression output and participation
//! maps are out of scope per spec.md §1; only the CSV writer is implemented here.

use std::collections::HashMap;
use std::io::Write;

use reconcile_engine::{
    impute_consent_withdrawn, impute_not_internally_consistent, impute_true_missing, project_per_message, project_per_participant,
    AnalysisColumnConfig, ColumnViewRow,
};
use reconcile_store::{EngagementDb, MessageFilter};
use reconcile_types::{CodeScheme, MessageStatus};

use crate::error::Result;

/// Whether the CSV export carries one row per message or one row per participant (§4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    PerMessage,
    PerParticipant,
}

/// Runs the full projection + imputation-pass-2 pipeline and returns the resulting rows,
/// ready to export.
pub fn project_column_view(db: &EngagementDb, configs: &[AnalysisColumnConfig], filter: &MessageFilter, kind: ProjectionKind) -> Result<Vec<ColumnViewRow>> {
    let messages: Vec<_> = db.get_by_filter(filter)?.into_iter().filter(|m| m.status == MessageStatus::Live).collect();

    let mut rows = match kind {
        ProjectionKind::PerMessage => project_per_message(configs, &messages),
        ProjectionKind::PerParticipant => project_per_participant(configs, &messages),
    };

    impute_true_missing(&mut rows, configs);
    impute_not_internally_consistent(&mut rows, configs);

    let schemes_by_id: HashMap<String, &CodeScheme> = configs
        .iter()
        .flat_map(|c| c.coding_schemes.iter())
        .map(|s| (s.scheme_id.clone(), s))
        .collect();
    impute_consent_withdrawn(&mut rows, &schemes_by_id);

    Ok(rows)
}

/// Writes `rows` as a CSV keyed by the raw fields and coding-scheme columns named in
/// `configs`, plus `participant_uuid` and `consent_withdrawn` (§6.2).
pub fn write_column_view_csv<W: Write>(writer: W, rows: &[ColumnViewRow], configs: &[AnalysisColumnConfig]) -> Result<()> {
    let mut raw_fields: Vec<&str> = configs.iter().map(|c| c.raw_field.as_str()).collect();
    raw_fields.sort_unstable();
    raw_fields.dedup();

    let mut scheme_ids: Vec<&str> = configs.iter().flat_map(|c| c.coding_schemes.iter()).map(|s| s.scheme_id.as_str()).collect();
    scheme_ids.sort_unstable();
    scheme_ids.dedup();

    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["participant_uuid".to_string(), "consent_withdrawn".to_string()];
    header.extend(raw_fields.iter().map(|f| f.to_string()));
    header.extend(scheme_ids.iter().map(|s| s.to_string()));
    csv_writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.participant_uuid.clone(), row.consent_withdrawn.to_string()];
        for field in &raw_fields {
            record.push(row.raw_fields.get(*field).cloned().unwrap_or_default());
        }
        for scheme_id in &scheme_ids {
            record.push(row.coded_columns.get(*scheme_id).map(|l| l.code_id.clone()).unwrap_or_default());
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

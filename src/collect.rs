//! Metric collection
//!
//! Walks a derivatives tree for per-subject serialized metric tables,
//! attaches subject attributes to every row, and concatenates everything
//! into one long table. Unknown subjects do not abort the scan: they are
//! accumulated and reported once at the end.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::CohortError;
use crate::naming;
use crate::sources::MetricFileRow;
use crate::types::{MatchParams, MetricRow, MetricTable, SubjectTable};

/// Collect all matching metric files under `root` into one table.
///
/// The walk is sorted by file name, so concatenation order is
/// deterministic. Unreadable or unparsable metric files are hard
/// failures; subjects missing from `subjects` are reported in a single
/// aggregated warning after the full scan and their rows carry no
/// attributes.
pub fn collect_metrics(
    root: &Path,
    subjects: &SubjectTable,
    params: &MatchParams,
) -> Result<MetricTable, CohortError> {
    let mut rows: Vec<MetricRow> = Vec::new();
    let mut missing: BTreeSet<String> = BTreeSet::new();
    let mut files = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !naming::matches_metric_file(entry.path(), params) {
            continue;
        }
        files += 1;
        debug!(path = %entry.path().display(), "loading metric file");

        let name = entry.file_name().to_string_lossy();
        let subject_id = naming::subject_from_filename(&name)?.to_string();

        let text = fs::read_to_string(entry.path())?;
        let file_rows: Vec<MetricFileRow> = serde_json::from_str(&text)?;

        let record = subjects.get(&subject_id);
        if record.is_none() {
            missing.insert(subject_id);
        }

        for file_row in file_rows {
            rows.push(MetricRow {
                participant: file_row.participant,
                session: file_row.session,
                metric: file_row.metric,
                value: file_row.value,
                subject_details: record.map(|r| r.subject_details.clone()),
                questionnaire: record
                    .map(|r| r.questionnaire.clone())
                    .unwrap_or_default(),
            });
        }
    }

    if !missing.is_empty() {
        warn!(
            count = missing.len(),
            subjects = ?missing,
            "could not locate subjects found in metric files"
        );
    }
    info!(files, rows = rows.len(), "metric collection finished");

    Ok(MetricTable { rows })
}

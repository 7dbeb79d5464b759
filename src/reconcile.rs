//! Identity reconciliation
//!
//! Merges the scanner-table and clinical-database registries into one
//! canonical subject table: an outer join on the shared subject identifier,
//! renamed into the canonical vocabulary, keyed by the database identifier
//! and deduplicated keeping the first occurrence.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::CohortError;
use crate::sources::{ClinicalRow, ScannerRow};
use crate::types::{SubjectDetails, SubjectRecord, SubjectTable};

/// Age in whole years as of `today`, decremented by one if the birthday
/// has not yet occurred this year
pub fn calculate_age(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Date-of-birth formats accepted from the clinical database
const DOB_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

fn parse_date_of_birth(raw: &str) -> Result<NaiveDate, CohortError> {
    DOB_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| CohortError::DateParseError(raw.to_string()))
}

/// Reconcile the two registries into the canonical subject table.
///
/// `today` is injected so age derivation stays a pure function of its
/// inputs; callers normally pass `Utc::now().date_naive()`.
///
/// Rows that survive the outer join without a database identifier cannot
/// be keyed by the canonical index and are dropped; they are reported in
/// one aggregated warning. Unparsable dates of birth abort the pipeline.
pub fn reconcile_subjects(
    scanner: &[ScannerRow],
    clinical: &[ClinicalRow],
    today: NaiveDate,
) -> Result<SubjectTable, CohortError> {
    // First occurrence wins per shared identifier on the scanner side
    let mut scanner_by_id: BTreeMap<&str, &ScannerRow> = BTreeMap::new();
    for row in scanner {
        scanner_by_id.entry(row.id_number.as_str()).or_insert(row);
    }

    let mut table = SubjectTable::new();
    let mut unkeyed: Vec<String> = Vec::new();
    let mut matched_scanner_ids: Vec<&str> = Vec::new();

    for row in clinical {
        let scan = scanner_by_id.get(row.id_number.as_str()).copied();
        if scan.is_some() {
            matched_scanner_ids.push(row.id_number.as_str());
        }

        let Some(database_id) = row.database_id.clone() else {
            unkeyed.push(row.id_number.clone());
            continue;
        };

        let date_of_birth = row
            .date_of_birth
            .as_deref()
            .map(parse_date_of_birth)
            .transpose()?;
        let age = date_of_birth.map(|dob| calculate_age(dob, today));

        let details = SubjectDetails {
            id_number: Some(row.id_number.clone()),
            questionnaire_id: row.questionnaire_id.clone(),
            sex: row.sex.clone(),
            age,
            date_of_birth,
            height: scan.and_then(|s| s.height),
            weight: scan.and_then(|s| s.weight),
            dominant_hand: row.dominant_hand.clone(),
            study: scan.and_then(|s| s.study.clone()),
            group: scan.and_then(|s| s.group.clone()),
            condition: scan.and_then(|s| s.condition.clone()),
        };

        table.insert_first(SubjectRecord {
            id: database_id,
            subject_details: details,
            questionnaire: Default::default(),
        });
    }

    // Scanner rows with no clinical counterpart are the outer-join
    // remainder; without a database identifier they cannot be kept
    for id in scanner_by_id.keys() {
        if !matched_scanner_ids.contains(id) {
            unkeyed.push((*id).to_string());
        }
    }

    if !unkeyed.is_empty() {
        warn!(
            count = unkeyed.len(),
            identifiers = ?unkeyed,
            "dropping registry rows with no database identifier"
        );
    }

    Ok(table)
}

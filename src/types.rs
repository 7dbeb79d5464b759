//! Core types for the neurocohort pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: canonical subject records, collected metric rows, and the
//! flattened longitudinal output.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Demographic and study attributes of one subject, under the
/// `subject_details` namespace.
///
/// `study`, `group` and `condition` stay open-typed: the registries mix
/// strings with coded numeric values, and both must survive the fusion
/// stage untouched when they are not strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectDetails {
    /// Shared scanner identifier ("ID Number") used for the registry join
    pub id_number: Option<String>,
    /// Identifier in the self-report questionnaire registry
    pub questionnaire_id: Option<String>,
    pub sex: Option<String>,
    /// Age in whole years, derived from the date of birth
    pub age: Option<i32>,
    pub date_of_birth: Option<NaiveDate>,
    /// Height (cm)
    pub height: Option<f64>,
    /// Weight (kg)
    pub weight: Option<f64>,
    pub dominant_hand: Option<String>,
    pub study: Option<serde_json::Value>,
    pub group: Option<serde_json::Value>,
    pub condition: Option<serde_json::Value>,
}

/// Self-report fields keyed by arbitrary column names, under the
/// `questionnaire` namespace.
pub type QuestionnaireFields = BTreeMap<String, serde_json::Value>;

/// One canonical subject: identifier plus the two attribute namespaces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// Canonical (database) subject identifier
    pub id: String,
    pub subject_details: SubjectDetails,
    pub questionnaire: QuestionnaireFields,
}

/// Subject table keyed by the canonical identifier.
///
/// Iteration order is sorted by identifier, which keeps every downstream
/// stage deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectTable {
    rows: BTreeMap<String, SubjectRecord>,
}

impl SubjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping the first occurrence: a record whose identifier is
    /// already present is discarded. Returns whether the record was kept.
    pub fn insert_first(&mut self, record: SubjectRecord) -> bool {
        match self.rows.entry(record.id.clone()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Insert or replace, used by stages with explicit overwrite semantics
    pub fn upsert(&mut self, record: SubjectRecord) {
        self.rows.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<&SubjectRecord> {
        self.rows.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SubjectRecord> {
        self.rows.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectRecord> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<SubjectRecord> for SubjectTable {
    fn from_iter<I: IntoIterator<Item = SubjectRecord>>(iter: I) -> Self {
        let mut table = SubjectTable::new();
        for record in iter {
            table.insert_first(record);
        }
        table
    }
}

/// One collected metric row: a (participant, session, metric) triple with
/// its value and the subject attributes joined in at collection time.
///
/// `subject_details` is `None` and `questionnaire` empty when the subject
/// was not found in the subject table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub participant: String,
    /// Raw session timestamp string as recorded in the metric file
    pub session: String,
    /// Parcellation label this value was aggregated over
    pub metric: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_details: Option<SubjectDetails>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub questionnaire: QuestionnaireFields,
}

/// Concatenation of per-subject metric files into one long table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Calendar/time components derived from one session timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    pub year: i32,
    pub month: u32,
    pub day_in_month: u32,
    /// Day of week, Monday = 0
    pub day_in_week: u32,
    pub hour: u32,
    /// Seconds-of-day component of (timestamp - anchor), not total elapsed
    /// seconds; the anchor is 2000-01-01T00:00:00
    pub numeric_time: i64,
    pub timestamp: NaiveDateTime,
}

/// One flattened longitudinal row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongitudinalRow {
    pub session_details: SessionDetails,
    pub metric: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_details: Option<SubjectDetails>,
    /// Questionnaire fields, including the participant identifier under
    /// the "participant" key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub questionnaire: QuestionnaireFields,
}

impl LongitudinalRow {
    /// Participant identifier, read back from the questionnaire namespace
    pub fn participant(&self) -> Option<&str> {
        self.questionnaire.get("participant").and_then(|v| v.as_str())
    }
}

/// The restructured longitudinal dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongitudinalTable {
    pub rows: Vec<LongitudinalRow>,
}

impl LongitudinalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parameters selecting which metric files belong to one analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchParams {
    /// Brain atlas the metrics were aggregated over
    pub parcellation_scheme: String,
    pub parcellation_type: String,
    /// Short MRI sequence code (e.g. "dt")
    pub acquisition: String,
    /// Name of the reconstruction software directory
    pub reconstruction_software: String,
    /// Aggregation measure; doubles as a filename substring
    pub measure: String,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            parcellation_scheme: "brainnetome".to_string(),
            parcellation_type: "wholeBrain".to_string(),
            acquisition: "dt".to_string(),
            reconstruction_software: "dipy".to_string(),
            measure: "nanmean".to_string(),
        }
    }
}

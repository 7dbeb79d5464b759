//! Questionnaire fusion
//!
//! Unions the canonical subject table with the self-report questionnaire
//! registry. Subjects missing from the questionnaire are back-filled from
//! their canonical attributes; study/group/condition are copied into the
//! questionnaire namespace for every subject, with string values
//! capitalized and a known registry typo corrected.

use serde_json::Value;

use crate::sources::QuestionnaireRow;
use crate::types::{SubjectRecord, SubjectTable};

/// Canonical field → questionnaire column, applied only when a subject has
/// no questionnaire row of their own
const BACKFILL_COLUMNS: &[(CanonicalField, &str)] = &[
    (CanonicalField::Sex, "Sex"),
    (CanonicalField::Age, "Age (years)"),
    (CanonicalField::Weight, "Weight (kg)"),
    (CanonicalField::Height, "Height (cm)"),
    (CanonicalField::DominantHand, "Dominant Hand"),
];

/// Canonical field → questionnaire column, applied to every subject
const ADDITION_COLUMNS: &[(CanonicalField, &str)] = &[
    (CanonicalField::Study, "Study"),
    (CanonicalField::Group, "Group"),
    (CanonicalField::Condition, "Condition"),
];

#[derive(Debug, Clone, Copy)]
enum CanonicalField {
    Sex,
    Age,
    Weight,
    Height,
    DominantHand,
    Study,
    Group,
    Condition,
}

impl CanonicalField {
    fn value(self, record: &SubjectRecord) -> Option<Value> {
        let d = &record.subject_details;
        match self {
            CanonicalField::Sex => d.sex.clone().map(Value::from),
            CanonicalField::Age => d.age.map(Value::from),
            CanonicalField::Weight => d.weight.map(Value::from),
            CanonicalField::Height => d.height.map(Value::from),
            CanonicalField::DominantHand => d.dominant_hand.clone().map(Value::from),
            CanonicalField::Study => d.study.clone(),
            CanonicalField::Group => d.group.clone(),
            CanonicalField::Condition => d.condition.clone(),
        }
    }
}

/// Capitalize a string value (first character upper, rest lower) and fix
/// the "Lerner" registry typo. Non-string values pass through unchanged.
pub fn capitalize_fix(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let mut chars = s.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>()
                    + &chars.as_str().to_lowercase(),
                None => String::new(),
            };
            Value::String(capitalized.replace("Lerner", "Learner"))
        }
        other => other.clone(),
    }
}

/// Fuse the canonical subject table with the questionnaire registry.
///
/// The result contains every questionnaire subject and every canonical
/// subject. Back-fill never overwrites questionnaire values for subjects
/// already present in the questionnaire registry.
pub fn fuse_questionnaire(
    canonical: &SubjectTable,
    questionnaire: &[QuestionnaireRow],
) -> SubjectTable {
    let mut fused = SubjectTable::new();

    // Questionnaire rows first; duplicates keep the first occurrence
    for row in questionnaire {
        let subject_details = canonical
            .get(&row.id)
            .map(|r| r.subject_details.clone())
            .unwrap_or_default();
        fused.insert_first(SubjectRecord {
            id: row.id.clone(),
            subject_details,
            questionnaire: row.fields.clone(),
        });
    }

    // Back-fill canonical subjects absent from the questionnaire
    for record in canonical.iter() {
        if fused.contains(&record.id) {
            continue;
        }
        let mut backfilled = SubjectRecord {
            id: record.id.clone(),
            subject_details: record.subject_details.clone(),
            questionnaire: Default::default(),
        };
        for (field, column) in BACKFILL_COLUMNS {
            if let Some(value) = field.value(record) {
                backfilled
                    .questionnaire
                    .insert((*column).to_string(), value);
            }
        }
        fused.insert_first(backfilled);
    }

    // Study/group/condition are copied for every canonical subject,
    // overwriting whatever the questionnaire carried
    for record in canonical.iter() {
        let Some(target) = fused.get_mut(&record.id) else {
            continue;
        };
        for (field, column) in ADDITION_COLUMNS {
            if let Some(value) = field.value(record) {
                target
                    .questionnaire
                    .insert((*column).to_string(), capitalize_fix(&value));
            }
        }
    }

    fused
}

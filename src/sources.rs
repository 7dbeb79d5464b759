//! Raw registry rows and table-file readers
//!
//! The three subject registries arrive as flat tabular files (NDJSON or a
//! JSON array of rows) with their own column vocabularies. The row structs
//! here keep the vendor column names; renaming into the canonical
//! vocabulary happens in the reconciler.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CohortError;
use crate::types::QuestionnaireFields;

/// One row of the MRI scanner table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerRow {
    /// Shared subject identifier; the scanner table calls it "ID"
    #[serde(rename = "ID")]
    pub id_number: String,
    #[serde(rename = "Height")]
    pub height: Option<f64>,
    #[serde(rename = "Weight")]
    pub weight: Option<f64>,
    #[serde(rename = "Study")]
    pub study: Option<serde_json::Value>,
    #[serde(rename = "Group")]
    pub group: Option<serde_json::Value>,
    #[serde(rename = "Condition")]
    pub condition: Option<serde_json::Value>,
}

/// One row of the clinical database table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalRow {
    /// Shared subject identifier, joinable with [`ScannerRow::id_number`]
    #[serde(rename = "ID Number")]
    pub id_number: String,
    /// Database identifier, the canonical subject key
    #[serde(rename = "ID")]
    pub database_id: Option<String>,
    #[serde(rename = "Questionnaire ID")]
    pub questionnaire_id: Option<String>,
    #[serde(rename = "First Name")]
    pub first_name: Option<String>,
    #[serde(rename = "Last Name")]
    pub last_name: Option<String>,
    #[serde(rename = "Date Of Birth")]
    pub date_of_birth: Option<String>,
    #[serde(rename = "Dominant Hand")]
    pub dominant_hand: Option<String>,
    #[serde(rename = "Sex")]
    pub sex: Option<String>,
}

/// One row of the self-report questionnaire table: the identifier plus
/// whatever columns the questionnaire happens to carry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireRow {
    pub id: String,
    #[serde(flatten)]
    pub fields: QuestionnaireFields,
}

/// One row of a per-subject serialized metric file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFileRow {
    pub participant: String,
    /// Session timestamp string; parsed during restructuring
    pub session: String,
    pub metric: String,
    pub value: f64,
}

/// Parse a JSON array of rows
pub fn parse_array<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, CohortError> {
    let rows: Vec<T> = serde_json::from_str(json)?;
    Ok(rows)
}

/// Parse NDJSON (newline-delimited JSON), one row per line
pub fn parse_ndjson<T: DeserializeOwned>(ndjson: &str) -> Result<Vec<T>, CohortError> {
    let mut rows = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(row) => rows.push(row),
            Err(e) => {
                return Err(CohortError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(rows)
}

/// Read a table file, accepting either a JSON array or NDJSON
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CohortError> {
    let text = fs::read_to_string(path)?;
    if text.trim_start().starts_with('[') {
        parse_array(&text)
    } else {
        parse_ndjson(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ndjson_scanner_rows() {
        let ndjson = r#"
{"ID": "123", "Height": 178.0, "Weight": 70.5, "Study": "longitudinal", "Group": "lerner", "Condition": "active"}

{"ID": "456", "Height": null, "Weight": null, "Study": null, "Group": null, "Condition": null}
"#;
        let rows: Vec<ScannerRow> = parse_ndjson(ndjson).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id_number, "123");
        assert_eq!(rows[0].height, Some(178.0));
        assert!(rows[1].height.is_none());
    }

    #[test]
    fn test_parse_array_clinical_rows() {
        let json = r#"[
            {"ID Number": "123", "ID": "sub01", "Questionnaire ID": "q7",
             "First Name": "A", "Last Name": "B", "Date Of Birth": "1990-03-20",
             "Dominant Hand": "right", "Sex": "F"}
        ]"#;
        let rows: Vec<ClinicalRow> = parse_array(json).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].database_id.as_deref(), Some("sub01"));
        assert_eq!(rows[0].date_of_birth.as_deref(), Some("1990-03-20"));
    }

    #[test]
    fn test_questionnaire_row_keeps_arbitrary_columns() {
        let json = r#"{"id": "sub01", "Sex": "F", "Mood score": 4}"#;
        let row: QuestionnaireRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, "sub01");
        assert_eq!(row.fields.get("Sex").unwrap(), "F");
        assert_eq!(row.fields.get("Mood score").unwrap(), 4);
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let ndjson = "{\"ID\": \"1\"}\nnot json\n";
        let err = parse_ndjson::<ScannerRow>(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}

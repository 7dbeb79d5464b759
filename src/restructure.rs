//! Longitudinal restructuring
//!
//! Filters collected metric rows down to participants with enough distinct
//! sessions, derives calendar/time components from the session timestamp,
//! and flattens the (participant, session, metric) index into plain
//! columns, with the participant identifier moved into the questionnaire
//! namespace.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::error::CohortError;
use crate::types::{
    LongitudinalRow, LongitudinalTable, MetricTable, SessionDetails,
};

/// Default minimum number of distinct sessions per participant
pub const DEFAULT_MIN_SESSIONS: usize = 2;

/// Fixed reference date the numeric-time component is measured against
pub fn time_anchor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .expect("valid anchor date")
        .and_hms_opt(0, 0, 0)
        .expect("valid anchor time")
}

/// Session timestamp formats accepted from metric files
const SESSION_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y%m%d%H%M",
];

/// Parse a session string to a timestamp. Malformed timestamps abort the
/// pipeline; date-only sessions resolve to midnight.
pub fn parse_session_timestamp(raw: &str) -> Result<NaiveDateTime, CohortError> {
    for fmt in SESSION_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts);
        }
    }
    Err(CohortError::TimestampParseError(raw.to_string()))
}

fn session_details(timestamp: NaiveDateTime) -> SessionDetails {
    let delta = timestamp - time_anchor();
    SessionDetails {
        year: timestamp.year(),
        month: timestamp.month(),
        day_in_month: timestamp.day(),
        day_in_week: timestamp.weekday().num_days_from_monday(),
        hour: timestamp.hour(),
        // Seconds-of-day component of the delta, matching a "seconds"
        // time-delta field rather than total duration
        numeric_time: delta.num_seconds().rem_euclid(86_400),
        timestamp,
    }
}

/// Restructure the collected metric table into the longitudinal dataset.
///
/// Participants with fewer than `min_sessions` distinct sessions are
/// removed; removed and retained counts are reported as informational
/// log records, not errors.
pub fn restructure_data(
    data: &MetricTable,
    min_sessions: usize,
) -> Result<LongitudinalTable, CohortError> {
    let mut sessions_per_participant: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for row in &data.rows {
        sessions_per_participant
            .entry(row.participant.as_str())
            .or_default()
            .insert(row.session.as_str());
    }

    let retained: BTreeSet<&str> = sessions_per_participant
        .iter()
        .filter(|(_, sessions)| sessions.len() >= min_sessions)
        .map(|(participant, _)| *participant)
        .collect();

    info!(
        removed = sessions_per_participant.len() - retained.len(),
        min_sessions,
        "removed participants with insufficient sessions"
    );
    info!(retained = retained.len(), "participants in longitudinal table");

    let mut rows = Vec::new();
    for row in &data.rows {
        if !retained.contains(row.participant.as_str()) {
            continue;
        }
        let timestamp = parse_session_timestamp(&row.session)?;

        let mut questionnaire = row.questionnaire.clone();
        questionnaire.insert(
            "participant".to_string(),
            serde_json::Value::String(row.participant.clone()),
        );

        rows.push(LongitudinalRow {
            session_details: session_details(timestamp),
            metric: row.metric.clone(),
            value: row.value,
            subject_details: row.subject_details.clone(),
            questionnaire,
        });
    }

    Ok(LongitudinalTable { rows })
}

/// First-visit and last-visit subtables produced by [`split_sessions`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSplit {
    pub first: LongitudinalTable,
    pub last: LongitudinalTable,
}

/// Split a longitudinal table into first-visit and last-visit subtables,
/// one row per participant each, in table order.
///
/// With `drop_single_session`, participants whose first and last
/// timestamps are identical are removed from both subtables.
pub fn split_sessions(data: &LongitudinalTable, drop_single_session: bool) -> SessionSplit {
    // Keyed by participant, in first-seen order
    let mut order: Vec<&str> = Vec::new();
    let mut bounds: BTreeMap<&str, (&LongitudinalRow, &LongitudinalRow)> = BTreeMap::new();

    for row in &data.rows {
        let Some(participant) = row.participant() else {
            continue;
        };
        match bounds.entry(participant) {
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                slot.get_mut().1 = row;
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                order.push(participant);
                slot.insert((row, row));
            }
        }
    }

    let mut split = SessionSplit::default();
    for participant in order {
        let (first, last) = bounds[participant];
        if drop_single_session
            && first.session_details.timestamp == last.session_details.timestamp
        {
            continue;
        }
        split.first.rows.push(first.clone());
        split.last.rows.push(last.clone());
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricRow, MetricTable};
    use pretty_assertions::assert_eq;

    fn metric_row(participant: &str, session: &str, metric: &str, value: f64) -> MetricRow {
        MetricRow {
            participant: participant.to_string(),
            session: session.to_string(),
            metric: metric.to_string(),
            value,
            subject_details: None,
            questionnaire: Default::default(),
        }
    }

    fn three_participants() -> MetricTable {
        MetricTable {
            rows: vec![
                metric_row("p1", "2021-01-01 09:00:00", "SFG_L_7_1", 0.1),
                metric_row("p2", "2021-01-01 09:00:00", "SFG_L_7_1", 0.2),
                metric_row("p2", "2021-06-01 09:00:00", "SFG_L_7_1", 0.3),
                metric_row("p3", "2021-01-01 09:00:00", "SFG_L_7_1", 0.4),
                metric_row("p3", "2021-06-01 09:00:00", "SFG_L_7_1", 0.5),
                metric_row("p3", "2021-12-01 09:00:00", "SFG_L_7_1", 0.6),
            ],
        }
    }

    fn participants(table: &LongitudinalTable) -> BTreeSet<&str> {
        table.rows.iter().filter_map(|r| r.participant()).collect()
    }

    #[test]
    fn test_min_session_filter() {
        let table = restructure_data(&three_participants(), 2).unwrap();
        let kept = participants(&table);
        assert_eq!(kept, BTreeSet::from(["p2", "p3"]));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_duplicate_sessions_do_not_count_twice() {
        // Two metrics from the same session: one distinct session only
        let data = MetricTable {
            rows: vec![
                metric_row("p1", "2021-01-01 09:00:00", "SFG_L_7_1", 0.1),
                metric_row("p1", "2021-01-01 09:00:00", "SFG_R_7_1", 0.2),
            ],
        };
        let table = restructure_data(&data, 2).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_time_components() {
        // 2021-03-02 was a Tuesday
        let data = MetricTable {
            rows: vec![
                metric_row("p1", "2021-03-02 14:30:10", "SFG_L_7_1", 0.1),
                metric_row("p1", "2021-06-01 09:00:00", "SFG_L_7_1", 0.2),
            ],
        };
        let table = restructure_data(&data, 2).unwrap();

        let details = &table.rows[0].session_details;
        assert_eq!(details.year, 2021);
        assert_eq!(details.month, 3);
        assert_eq!(details.day_in_month, 2);
        assert_eq!(details.day_in_week, 1);
        assert_eq!(details.hour, 14);
        assert_eq!(details.numeric_time, 14 * 3600 + 30 * 60 + 10);
        assert_eq!(
            details.timestamp,
            parse_session_timestamp("2021-03-02 14:30:10").unwrap()
        );
    }

    #[test]
    fn test_participant_moves_into_questionnaire_namespace() {
        let table = restructure_data(&three_participants(), 2).unwrap();
        assert_eq!(table.rows[0].participant(), Some("p2"));
    }

    #[test]
    fn test_compact_session_format() {
        assert_eq!(
            parse_session_timestamp("202101011200").unwrap(),
            parse_session_timestamp("2021-01-01 12:00:00").unwrap()
        );
    }

    #[test]
    fn test_malformed_timestamp_is_a_hard_failure() {
        let data = MetricTable {
            rows: vec![
                metric_row("p1", "whenever", "SFG_L_7_1", 0.1),
                metric_row("p1", "2021-06-01 09:00:00", "SFG_L_7_1", 0.2),
            ],
        };
        let err = restructure_data(&data, 2).unwrap_err();
        assert!(matches!(err, CohortError::TimestampParseError(_)));
    }

    #[test]
    fn test_split_sessions() {
        let table = restructure_data(&three_participants(), 2).unwrap();
        let split = split_sessions(&table, true);

        assert_eq!(participants(&split.first), BTreeSet::from(["p2", "p3"]));
        assert_eq!(split.first.len(), 2);
        assert_eq!(split.last.len(), 2);

        let p3_first = split.first.rows.iter().find(|r| r.participant() == Some("p3")).unwrap();
        let p3_last = split.last.rows.iter().find(|r| r.participant() == Some("p3")).unwrap();
        assert_eq!(p3_first.value, 0.4);
        assert_eq!(p3_last.value, 0.6);
    }

    #[test]
    fn test_split_drops_identical_first_and_last_timestamps() {
        // Two rows, same session: a single-session participant
        let data = MetricTable {
            rows: vec![
                metric_row("p1", "2021-01-01 09:00:00", "SFG_L_7_1", 0.1),
                metric_row("p1", "2021-01-01 09:00:00", "SFG_R_7_1", 0.2),
            ],
        };
        let table = restructure_data(&data, 1).unwrap();

        let dropped = split_sessions(&table, true);
        assert!(dropped.first.is_empty());
        assert!(dropped.last.is_empty());

        let kept = split_sessions(&table, false);
        assert_eq!(kept.first.len(), 1);
        assert_eq!(kept.last.len(), 1);
    }
}

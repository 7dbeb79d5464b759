//! Neurocohort - longitudinal cohort assembly for MRI-derived connectivity metrics
//!
//! Neurocohort reconciles heterogeneous subject registries (an MRI scanner
//! table, a clinical database, and a self-report questionnaire) into one
//! canonical subject table, collects per-subject connectivity metric files
//! into a long table, and restructures it into a longitudinal dataset keyed
//! by participant and session. A small companion module maps scalar values
//! onto labeled template volumes for visualization.
//!
//! ## Pipeline
//!
//! registry reconciliation → questionnaire fusion → metric collection →
//! longitudinal restructuring

pub mod collect;
pub mod error;
pub mod fuse;
pub mod naming;
pub mod pipeline;
pub mod reconcile;
pub mod restructure;
pub mod sources;
pub mod types;
pub mod volume;

pub use error::CohortError;
pub use pipeline::{CohortPipeline, PipelineConfig};
pub use reconcile::{calculate_age, reconcile_subjects};
pub use fuse::fuse_questionnaire;
pub use collect::collect_metrics;
pub use restructure::{restructure_data, split_sessions, SessionSplit};
pub use types::{
    LongitudinalRow, LongitudinalTable, MatchParams, MetricRow, MetricTable,
    SessionDetails, SubjectDetails, SubjectRecord, SubjectTable,
};

/// Crate version reported by the CLI
pub const COHORT_VERSION: &str = env!("CARGO_PKG_VERSION");

//! Pipeline orchestration
//!
//! This module provides the public API for assembling a cohort: registry
//! reconciliation, questionnaire fusion, metric collection, and
//! longitudinal restructuring, driven by one explicit configuration.

use chrono::Utc;
use std::path::PathBuf;

use crate::collect::collect_metrics;
use crate::error::CohortError;
use crate::fuse::fuse_questionnaire;
use crate::reconcile::reconcile_subjects;
use crate::restructure::{restructure_data, DEFAULT_MIN_SESSIONS};
use crate::sources::{self, ClinicalRow, QuestionnaireRow, ScannerRow};
use crate::types::{LongitudinalTable, MatchParams, MetricTable, SubjectTable};

/// All inputs of one pipeline run. There are no embedded defaults for any
/// path: every location is injected by the caller.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scanner-derived subject table (NDJSON or JSON array)
    pub scanner_table: PathBuf,
    /// Clinical-database subject table (NDJSON or JSON array)
    pub clinical_table: PathBuf,
    /// Self-report questionnaire table (NDJSON or JSON array)
    pub questionnaire: PathBuf,
    /// Root of the derivatives tree holding per-subject metric files
    pub metrics_root: PathBuf,
    pub params: MatchParams,
    /// Minimum distinct sessions per participant
    pub min_sessions: usize,
}

impl PipelineConfig {
    pub fn new(
        scanner_table: impl Into<PathBuf>,
        clinical_table: impl Into<PathBuf>,
        questionnaire: impl Into<PathBuf>,
        metrics_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scanner_table: scanner_table.into(),
            clinical_table: clinical_table.into(),
            questionnaire: questionnaire.into(),
            metrics_root: metrics_root.into(),
            params: MatchParams::default(),
            min_sessions: DEFAULT_MIN_SESSIONS,
        }
    }
}

/// Cohort assembly pipeline.
///
/// Stages:
/// 1. Identity reconciliation - scanner + clinical registries to one canonical table
/// 2. Questionnaire fusion - union with the self-report registry, back-filling gaps
/// 3. Metric collection - walk the derivatives tree and attach subject attributes
/// 4. Restructuring - session filtering and longitudinal flattening
pub struct CohortPipeline {
    config: PipelineConfig,
}

impl CohortPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stages 1-2: the fused subject table
    pub fn subjects(&self) -> Result<SubjectTable, CohortError> {
        let scanner: Vec<ScannerRow> = sources::read_rows(&self.config.scanner_table)?;
        let clinical: Vec<ClinicalRow> = sources::read_rows(&self.config.clinical_table)?;
        let questionnaire: Vec<QuestionnaireRow> =
            sources::read_rows(&self.config.questionnaire)?;

        let canonical =
            reconcile_subjects(&scanner, &clinical, Utc::now().date_naive())?;
        Ok(fuse_questionnaire(&canonical, &questionnaire))
    }

    /// Stage 3: the concatenated metric table for the fused subjects
    pub fn collect(&self, subjects: &SubjectTable) -> Result<MetricTable, CohortError> {
        collect_metrics(&self.config.metrics_root, subjects, &self.config.params)
    }

    /// The full pipeline: subject fusion, collection, restructuring
    pub fn assemble(&self) -> Result<LongitudinalTable, CohortError> {
        let subjects = self.subjects()?;
        let data = self.collect(&subjects)?;
        restructure_data(&data, self.config.min_sessions)
    }
}

//! Metric filename grammar
//!
//! Per-subject metric files follow a BIDS-derivative naming convention:
//!
//! `<recon>/sub-<subject>_ses-<session>_acq-<acq>..._label-<type>..._meas-<measure>_atlas-<scheme>_dseg.json`
//!
//! Filename-based metadata extraction is fragile, so both the match
//! predicate and the subject-identifier extraction live here, behind one
//! parsing surface, and nowhere else.

use std::path::Path;

use crate::error::CohortError;
use crate::types::MatchParams;

/// Extension of serialized per-subject metric tables
pub const METRIC_EXTENSION: &str = "json";

/// Whether `path` names a metric file for the given matching parameters.
///
/// A file matches when its parent directory is the reconstruction software
/// name and its stem carries `acq-<acquisition>` then `label-<type>` and
/// ends with `_meas-<measure>_atlas-<scheme>_dseg`.
pub fn matches_metric_file(path: &Path, params: &MatchParams) -> bool {
    let parent_is_recon = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .map(|n| n == params.reconstruction_software)
        .unwrap_or(false);
    if !parent_is_recon {
        return false;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(stem) = name.strip_suffix(&format!(".{METRIC_EXTENSION}")) else {
        return false;
    };

    let suffix = format!(
        "_meas-{}_atlas-{}_dseg",
        params.measure, params.parcellation_scheme
    );
    let Some(body) = stem.strip_suffix(suffix.as_str()) else {
        return false;
    };

    let acq = format!("acq-{}", params.acquisition);
    let label = format!("label-{}", params.parcellation_type);
    match (body.find(&acq), body.find(&label)) {
        (Some(acq_at), Some(label_at)) => acq_at <= label_at,
        _ => false,
    }
}

/// Extract the subject identifier from a metric filename: the last
/// `-`-separated part of the first `_`-separated segment
/// (`sub-ABC12_ses-...` → `ABC12`).
pub fn subject_from_filename(name: &str) -> Result<&str, CohortError> {
    let first_segment = name.split('_').next().unwrap_or("");
    match first_segment.rsplit('-').next() {
        Some(subject) if !subject.is_empty() => Ok(subject),
        _ => Err(CohortError::MalformedFilename(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn params() -> MatchParams {
        MatchParams::default()
    }

    fn path(recon: &str, name: &str) -> PathBuf {
        PathBuf::from("derivatives").join("sub-01").join(recon).join(name)
    }

    #[test]
    fn test_matching_filename() {
        let p = path(
            "dipy",
            "sub-01_ses-202101011200_acq-dt_space-anat_label-wholeBrain_meas-nanmean_atlas-brainnetome_dseg.json",
        );
        assert!(matches_metric_file(&p, &params()));
    }

    #[test]
    fn test_wrong_reconstruction_directory() {
        let p = path(
            "mrtrix",
            "sub-01_ses-202101011200_acq-dt_label-wholeBrain_meas-nanmean_atlas-brainnetome_dseg.json",
        );
        assert!(!matches_metric_file(&p, &params()));
    }

    #[test]
    fn test_wrong_acquisition() {
        let p = path(
            "dipy",
            "sub-01_ses-202101011200_acq-ep_label-wholeBrain_meas-nanmean_atlas-brainnetome_dseg.json",
        );
        assert!(!matches_metric_file(&p, &params()));
    }

    #[test]
    fn test_wrong_measure_or_atlas() {
        let p = path(
            "dipy",
            "sub-01_acq-dt_label-wholeBrain_meas-nanstd_atlas-brainnetome_dseg.json",
        );
        assert!(!matches_metric_file(&p, &params()));

        let p = path(
            "dipy",
            "sub-01_acq-dt_label-wholeBrain_meas-nanmean_atlas-schaefer_dseg.json",
        );
        assert!(!matches_metric_file(&p, &params()));
    }

    #[test]
    fn test_segment_order_is_enforced() {
        let p = path(
            "dipy",
            "sub-01_label-wholeBrain_acq-dt_meas-nanmean_atlas-brainnetome_dseg.json",
        );
        assert!(!matches_metric_file(&p, &params()));
    }

    #[test]
    fn test_wrong_extension() {
        let p = path(
            "dipy",
            "sub-01_acq-dt_label-wholeBrain_meas-nanmean_atlas-brainnetome_dseg.tsv",
        );
        assert!(!matches_metric_file(&p, &params()));
    }

    #[test]
    fn test_subject_extraction() {
        let name =
            "sub-ABC12_ses-202101011200_acq-dt_label-wholeBrain_meas-nanmean_atlas-brainnetome_dseg.json";
        assert_eq!(subject_from_filename(name).unwrap(), "ABC12");
    }

    #[test]
    fn test_subject_extraction_without_prefix() {
        // No "-" in the first segment: the whole segment is the identifier
        assert_eq!(subject_from_filename("ABC12_rest.json").unwrap(), "ABC12");
    }

    #[test]
    fn test_subject_extraction_rejects_empty() {
        assert!(subject_from_filename("sub-_ses-1.json").is_err());
    }
}

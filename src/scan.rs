//! Scan identity extraction from DAQ paths.
//!
//! DAQ output lives under an experiment folder such as `ue_251023_FXL`
//! (facility prefix, run code, beamline tag) with one directory per scan
//! beneath it. The identity derived here labels transfers and keys the
//! in-process deduplication of completion events.

use std::fmt;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

static EXPERIMENT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}_[0-9]+_[A-Z]+").ok());

/// Stable identity of one acquisition scan.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ScanIdentity {
    /// Experiment folder name, when the path contains one.
    pub experiment: Option<String>,
    /// Final segment of the scan directory. Never empty.
    pub scan_name: String,
    /// Scan directory the identity was derived from.
    pub source_path: Utf8PathBuf,
}

impl ScanIdentity {
    /// Derives the identity of the scan directory `scan_dir`.
    ///
    /// Trailing separators are ignored. The first path segment that follows
    /// the experiment naming convention becomes [`Self::experiment`].
    #[must_use]
    pub fn parse(scan_dir: impl AsRef<Utf8Path>) -> Self {
        let raw = scan_dir.as_ref().as_str();
        let trimmed = trim_trailing_separators(raw);

        let experiment = trimmed
            .split('/')
            .find(|segment| is_experiment_segment(segment))
            .map(str::to_owned);

        let scan_name = match trimmed.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ if !raw.is_empty() => raw.to_owned(),
            _ => String::from("."),
        };

        Self {
            experiment,
            scan_name,
            source_path: Utf8PathBuf::from(trimmed),
        }
    }

    /// Derives the identity of the scan directory containing `marker`.
    #[must_use]
    pub fn from_marker(marker: impl AsRef<Utf8Path>) -> Self {
        let path = marker.as_ref();
        match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => Self::parse(parent),
            _ => Self::parse(path),
        }
    }

    /// Returns the idempotency key for this scan.
    ///
    /// Uses `experiment/scan_name` when the experiment is known and the
    /// source path otherwise.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.experiment {
            Some(experiment) => format!("{experiment}/{}", self.scan_name),
            None => self.source_path.to_string(),
        }
    }
}

impl fmt::Display for ScanIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Returns whether `segment` follows the experiment folder convention.
#[must_use]
pub fn is_experiment_segment(segment: &str) -> bool {
    EXPERIMENT_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(segment))
}

fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_reference_scan_directory() {
        let identity =
            ScanIdentity::parse("/xfel/ffs/dat/ue_251023_FXL/rawData/251023_alignment_00001_DIR");

        assert_eq!(identity.experiment.as_deref(), Some("ue_251023_FXL"));
        assert_eq!(identity.scan_name, "251023_alignment_00001_DIR");
        assert_eq!(
            identity.key(),
            "ue_251023_FXL/251023_alignment_00001_DIR"
        );
    }

    #[rstest]
    #[case("ue_251023_FXL", true)]
    #[case("ms_1_A", true)]
    #[case("ue_251023_FXL_extra", true)]
    #[case("UE_251023_FXL", false)]
    #[case("ue_FXL_251023", false)]
    #[case("u_251023_FXL", false)]
    #[case("ue_251023_fxl", false)]
    #[case("rawData", false)]
    fn recognises_experiment_segments(#[case] segment: &str, #[case] expected: bool) {
        assert_eq!(is_experiment_segment(segment), expected);
    }

    #[test]
    fn first_matching_segment_wins() {
        let identity = ScanIdentity::parse("/d/ue_1_AAA/ms_2_BBB/scan");
        assert_eq!(identity.experiment.as_deref(), Some("ue_1_AAA"));
    }

    #[test]
    fn missing_experiment_is_absent() {
        let identity = ScanIdentity::parse("/data/rawData/scan01");
        assert_eq!(identity.experiment, None);
        assert_eq!(identity.scan_name, "scan01");
        assert_eq!(identity.key(), "/data/rawData/scan01");
    }

    #[test]
    fn trailing_separators_are_ignored() {
        let identity = ScanIdentity::parse("/d/ue_1_X/rawData/scan01//");
        assert_eq!(identity.scan_name, "scan01");
        assert_eq!(identity.source_path, Utf8PathBuf::from("/d/ue_1_X/rawData/scan01"));
    }

    #[test]
    fn marker_path_resolves_to_parent_directory() {
        let identity = ScanIdentity::from_marker("/d/ue_1_X/rawData/scan01/part1.done");
        assert_eq!(identity.scan_name, "scan01");
        assert_eq!(identity.experiment.as_deref(), Some("ue_1_X"));
    }

    #[rstest]
    #[case("", ".")]
    #[case("/", "/")]
    #[case("///", "///")]
    #[case("scan", "scan")]
    #[case("done.marker", "done.marker")]
    fn scan_name_is_never_empty(#[case] input: &str, #[case] expected: &str) {
        let identity = ScanIdentity::parse(input);
        assert_eq!(identity.scan_name, expected);
        assert!(!identity.scan_name.is_empty());
    }
}

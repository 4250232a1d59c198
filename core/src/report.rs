//! Comparison results and their summary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detector::Skipped;
use crate::policy::SourceLabels;
use crate::{DriftIssue, SchemaSet, Severity};

/// Issue counts by severity. `passed` is true when there are no errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub passed: bool,
}

impl Summary {
    /// Aggregates a list of issues.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_drift_core::{DriftIssue, IssueKind, Severity, Summary};
    ///
    /// let issues = vec![
    ///     DriftIssue::new(Severity::Warning, IssueKind::Missing, "a.b", "missing"),
    ///     DriftIssue::new(Severity::Info, IssueKind::EnumDiff, "a.c", "superset"),
    /// ];
    /// let summary = Summary::from_issues(&issues);
    /// assert_eq!((summary.errors, summary.warnings, summary.info), (0, 1, 1));
    /// assert!(summary.passed);
    /// ```
    pub fn from_issues(issues: &[DriftIssue]) -> Self {
        let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();
        let errors = count(Severity::Error);
        Self {
            errors,
            warnings: count(Severity::Warning),
            info: count(Severity::Info),
            passed: errors == 0,
        }
    }

    /// Number of issues with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Error => self.errors,
            Severity::Warning => self.warnings,
            Severity::Info => self.info,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (errors: {}, warnings: {}, info: {})",
            if self.passed { "PASSED" } else { "FAILED" },
            self.errors,
            self.warnings,
            self.info
        )
    }
}

/// Whether the breaking-change detector contributed to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectorStatus {
    /// The tool ran and its findings were merged into the issues.
    Ran,
    /// The tool was requested but could not produce a result.
    Skipped,
    /// No baseline or no detector was supplied.
    #[default]
    NotConfigured,
}

impl fmt::Display for DetectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ran => write!(f, "ran"),
            Self::Skipped => write!(f, "skipped"),
            Self::NotConfigured => write!(f, "not_configured"),
        }
    }
}

/// Side-channel record of the detector step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectorReport {
    pub status: DetectorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Number of `breaking` issues the detector contributed.
    #[serde(default)]
    pub issues: usize,
}

/// Output of one drift check.
///
/// # Examples
///
/// ```
/// use schema_drift_core::{ComparisonResult, DriftIssue, IssueKind, Severity};
///
/// let mut result = ComparisonResult::new(
///     "2026-01-01T00:00:00Z",
///     vec![
///         DriftIssue::new(Severity::Error, IssueKind::TypeMismatch, "updates.Session.count", "type differs"),
///         DriftIssue::new(Severity::Warning, IssueKind::Missing, "internal.Debug.trace", "missing"),
///     ],
/// );
/// assert!(!result.passed());
///
/// result.retain_issues(|issue| !issue.path.starts_with("updates."));
/// assert!(result.passed());
/// assert_eq!(result.summary.warnings, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// RFC 3339 time the check ran.
    pub timestamp: String,
    pub source_version_a: Option<String>,
    pub source_version_b: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_b: Option<String>,
    #[serde(default)]
    pub labels: SourceLabels,
    pub issues: Vec<DriftIssue>,
    pub summary: Summary,
    #[serde(default)]
    pub detector: DetectorReport,
}

impl ComparisonResult {
    pub fn new(timestamp: impl Into<String>, issues: Vec<DriftIssue>) -> Self {
        let summary = Summary::from_issues(&issues);
        Self {
            timestamp: timestamp.into(),
            source_version_a: None,
            source_version_b: None,
            digest_a: None,
            digest_b: None,
            labels: SourceLabels::default(),
            issues,
            summary,
            detector: DetectorReport::default(),
        }
    }

    /// Copies version and digest provenance from the two loaded sources.
    pub fn with_sources(mut self, set_a: &SchemaSet, set_b: &SchemaSet) -> Self {
        self.source_version_a = set_a.version.clone();
        self.source_version_b = set_b.version.clone();
        self.digest_a = set_a.digest.clone();
        self.digest_b = set_b.digest.clone();
        self
    }

    pub fn with_labels(mut self, labels: SourceLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Records the outcome of the breaking-change detector. Detected issues
    /// are appended after the drift issues.
    pub fn record_detector(&mut self, outcome: Result<Vec<DriftIssue>, Skipped>) {
        self.detector = match outcome {
            Ok(issues) => {
                let count = issues.len();
                self.issues.extend(issues);
                DetectorReport {
                    status: DetectorStatus::Ran,
                    reason: None,
                    issues: count,
                }
            }
            Err(skipped) => DetectorReport {
                status: DetectorStatus::Skipped,
                reason: Some(skipped.reason),
                issues: 0,
            },
        };
        self.summary = Summary::from_issues(&self.issues);
    }

    /// Drops issues for which `keep` returns false and recomputes the
    /// summary.
    pub fn retain_issues(&mut self, keep: impl FnMut(&DriftIssue) -> bool) {
        self.issues.retain(keep);
        self.summary = Summary::from_issues(&self.issues);
    }

    pub fn passed(&self) -> bool {
        self.summary.passed
    }

    /// Issues in report order: by severity, then path, then kind.
    ///
    /// The sort is stable, so issues sharing all three keep discovery order.
    pub fn sorted_issues(&self) -> Vec<&DriftIssue> {
        let mut issues: Vec<&DriftIssue> = self.issues.iter().collect();
        issues.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.path.cmp(&b.path))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        issues
    }
}

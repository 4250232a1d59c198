use std::path::Path;

use crate::DriftIssue;

/// Reason a breaking-change detector produced no result.
///
/// Never fatal: the run continues with the primary comparison and records
/// the reason in the report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("detector skipped: {reason}")]
pub struct Skipped {
    pub reason: String,
}

impl Skipped {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Capability that compares two versions of the same specification and
/// reports incompatible changes.
///
/// Implementations translate their findings into [`DriftIssue`]s of kind
/// [`IssueKind::Breaking`](crate::IssueKind::Breaking), keeping their own
/// severity judgment.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use schema_drift_core::{BreakingChangeDetector, DriftIssue, Skipped};
///
/// struct Offline;
///
/// impl BreakingChangeDetector for Offline {
///     fn name(&self) -> &str {
///         "offline"
///     }
///
///     fn detect(&self, _baseline: &Path, _current: &Path) -> Result<Vec<DriftIssue>, Skipped> {
///         Err(Skipped::new("no network"))
///     }
/// }
///
/// let outcome = Offline.detect(Path::new("old.json"), Path::new("new.json"));
/// assert_eq!(outcome.unwrap_err().reason, "no network");
/// ```
pub trait BreakingChangeDetector {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn detect(&self, baseline: &Path, current: &Path) -> Result<Vec<DriftIssue>, Skipped>;
}

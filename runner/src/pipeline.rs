//! The drift check pipeline.
//!
//! Loads both sources, compares them, filters ignored issues, optionally runs
//! a breaking-change detector against a baseline, and assembles the
//! [`ComparisonResult`].

use std::path::PathBuf;

use chrono::Utc;
use schema_drift_core::{BreakingChangeDetector, ComparisonResult, DiffEngine};
use schema_drift_loader::{DriftConfig, load_library, load_spec};
use tracing::{debug, info};

use crate::error::Result;

/// Inputs of one drift check.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    /// Schema library export (side A).
    pub library: PathBuf,
    /// Generated specification (side B).
    pub spec: PathBuf,
    /// Previously captured specification for the breaking-change detector.
    pub baseline: Option<PathBuf>,
    pub config: DriftConfig,
}

impl CheckRequest {
    pub fn new(library: impl Into<PathBuf>, spec: impl Into<PathBuf>) -> Self {
        Self {
            library: library.into(),
            spec: spec.into(),
            baseline: None,
            config: DriftConfig::default(),
        }
    }

    pub fn with_baseline(mut self, baseline: impl Into<PathBuf>) -> Self {
        self.baseline = Some(baseline.into());
        self
    }

    pub fn with_config(mut self, config: DriftConfig) -> Self {
        self.config = config;
        self
    }
}

/// Runs a drift check.
///
/// Drift never fails this function; it is reported in the returned result.
/// The detector runs only when both a detector and a baseline are supplied,
/// and its failures are recorded as a skipped step.
///
/// # Errors
///
/// Returns [`RunnerError::Load`](crate::RunnerError::Load) if either input
/// cannot be loaded or an `ignore_paths` pattern is invalid.
///
/// # Examples
///
/// ```no_run
/// use schema_drift_runner::{CheckRequest, run_check};
///
/// let request = CheckRequest::new("schemas/export.json", "openapi.json");
/// let result = run_check(&request, None).unwrap();
/// println!("{}", result.summary);
/// ```
pub fn run_check(
    request: &CheckRequest,
    detector: Option<&dyn BreakingChangeDetector>,
) -> Result<ComparisonResult> {
    let config = &request.config;
    let filter = config.issue_filter()?;

    let mut library = load_library(&request.library)?;
    let mut spec = load_spec(&request.spec)?;
    if !config.ignore_types.is_empty() {
        library.retain_names(|name| !config.is_type_ignored(name));
        spec.retain_names(|name| !config.is_type_ignored(name));
    }
    info!(
        library = %request.library.display(),
        spec = %request.spec.display(),
        library_types = library.len(),
        spec_types = spec.len(),
        "comparing schema sources"
    );

    let issues = DiffEngine::new(&library, &spec)
        .with_policy(config.severity.clone())
        .with_labels(config.labels.clone())
        .compare_all();

    let mut result = ComparisonResult::new(Utc::now().to_rfc3339(), issues)
        .with_sources(&library, &spec)
        .with_labels(config.labels.clone());

    match (detector, request.baseline.as_deref()) {
        (Some(detector), Some(baseline)) => {
            debug!(detector = detector.name(), baseline = %baseline.display(), "running detector");
            result.record_detector(detector.detect(baseline, &request.spec));
        }
        (Some(detector), None) => {
            debug!(detector = detector.name(), "no baseline given, detector not run");
        }
        (None, _) => {}
    }

    if !filter.is_empty() {
        let before = result.issues.len();
        result.retain_issues(|issue| !filter.is_ignored(issue));
        debug!(dropped = before - result.issues.len(), "applied ignore_paths");
    }

    info!(
        errors = result.summary.errors,
        warnings = result.summary.warnings,
        info = result.summary.info,
        detector = %result.detector.status,
        "drift check finished"
    );
    Ok(result)
}

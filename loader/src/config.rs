//! Run configuration for drift checks.
//!
//! Defines the YAML-serializable configuration that controls side labels,
//! severities, ignored types and paths, and the external breaking-change
//! detector. Every section is optional.
//!
//! # Example YAML
//!
//! ```yaml
//! labels:
//!   a: schemas
//!   b: openapi
//! severity:
//!   missing_from_b: error
//!   enum_only_in_b: warning
//! ignore_types:
//!   - InternalDebug
//! ignore_paths:
//!   - '^updates\.Session\.debug'
//! detector:
//!   binary: oasdiff
//!   timeout_secs: 20
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use regex::Regex;
use schema_drift_core::{DriftIssue, SeverityPolicy, SourceLabels};
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, Result};

/// Settings for the external breaking-change detector.
///
/// # Examples
///
/// ```
/// # use schema_drift_loader::DetectorConfig;
/// let detector = DetectorConfig::default();
/// assert_eq!(detector.binary, None);
/// assert_eq!(detector.args, ["breaking", "{baseline}", "{current}", "--format", "json"]);
/// assert_eq!(detector.timeout_secs, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path or name of the structural diff tool. `None` disables the step.
    pub binary: Option<String>,
    /// Argument template; `{baseline}` and `{current}` are replaced with the
    /// two document paths.
    pub args: Vec<String>,
    /// Seconds to wait before the tool is killed.
    pub timeout_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            binary: None,
            args: ["breaking", "{baseline}", "{current}", "--format", "json"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout_secs: 30,
        }
    }
}

/// Top-level drift check configuration.
///
/// Loaded from a YAML file (typically `.schema-drift.yml` in the repository
/// root). Command-line flags take precedence over these values.
///
/// # Examples
///
/// ```no_run
/// use schema_drift_loader::DriftConfig;
///
/// let config = DriftConfig::load(".schema-drift.yml").unwrap();
/// if config.is_type_ignored("InternalDebug") {
///     println!("InternalDebug is excluded from comparison");
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Display names for the two sides.
    pub labels: SourceLabels,
    /// Severity per drift rule.
    pub severity: SeverityPolicy,
    /// Top-level type names excluded from comparison.
    pub ignore_types: Vec<String>,
    /// Regular expressions; matching issue paths are dropped.
    pub ignore_paths: Vec<String>,
    pub detector: DetectorConfig,
}

impl DriftConfig {
    /// Conventional file name looked up in the working directory.
    pub const DEFAULT_FILE: &'static str = ".schema-drift.yml";

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](LoaderError::Io) if the file cannot be read, or
    /// [`Yaml`](LoaderError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        // An empty file parses as YAML null.
        let config: Option<Self> = serde_yaml::from_reader(reader)?;
        Ok(config.unwrap_or_default())
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](LoaderError::Io) if the file cannot be written, or
    /// [`Yaml`](LoaderError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns `true` if `name` is excluded from comparison.
    pub fn is_type_ignored(&self, name: &str) -> bool {
        self.ignore_types.iter().any(|t| t == name)
    }

    /// Compiles `ignore_paths` into an [`IssueFilter`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPattern`](LoaderError::InvalidPattern) for the first
    /// pattern that is not a valid regular expression.
    pub fn issue_filter(&self) -> Result<IssueFilter> {
        IssueFilter::new(&self.ignore_paths)
    }
}

/// Compiled `ignore_paths` patterns.
///
/// # Examples
///
/// ```
/// use schema_drift_core::{DriftIssue, IssueKind, Severity};
/// use schema_drift_loader::IssueFilter;
///
/// let filter = IssueFilter::new(&[r"\.debug$".to_string()]).unwrap();
/// let issue = DriftIssue::new(Severity::Warning, IssueKind::Missing, "updates.Session.debug", "missing");
/// assert!(filter.is_ignored(&issue));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    patterns: Vec<Regex>,
}

impl IssueFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| LoaderError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Returns `true` if the issue's path matches any pattern.
    pub fn is_ignored(&self, issue: &DriftIssue) -> bool {
        self.patterns.iter().any(|p| p.is_match(&issue.path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

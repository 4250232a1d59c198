//! Schema tree model, drift comparison engine and report formatting.
//!
//! This crate compares two independently produced descriptions of the same
//! wire contract, typically a hand-authored schema library (side A) and a
//! generated interface specification (side B):
//!
//! - [`SchemaTree`]: one normalized schema node, a tagged [`SchemaNode`]
//!   shape plus a shared `nullable` flag.
//! - [`SchemaSet`]: the named top-level types of one source, with version
//!   and digest provenance.
//! - [`DiffEngine`]: the recursive comparison that turns two trees into
//!   [`DriftIssue`]s, classified by a configurable [`SeverityPolicy`].
//! - [`ComparisonResult`]: issues plus [`Summary`] and provenance, rendered
//!   by [`format_result`] in any [`OutputFormat`].
//! - [`BreakingChangeDetector`]: capability for an optional external tool
//!   comparing two versions of the same specification.
//!
//! The crate performs no I/O; loading lives in `schema-drift-loader` and the
//! pipeline in `schema-drift-runner`.
//!
//! # Example
//!
//! ```
//! use schema_drift_core::*;
//!
//! let mut library = SchemaSet::new(Some("3.1.0".into()));
//! library.insert(
//!     Some("updates"),
//!     "Session",
//!     SchemaTree::object()
//!         .with_property("sid", SchemaTree::string())
//!         .with_property("name", SchemaTree::string()),
//! );
//!
//! let mut generated = SchemaSet::new(Some("3.1.0".into()));
//! generated.insert(
//!     None,
//!     "Session",
//!     SchemaTree::object()
//!         .with_property("id", SchemaTree::string())
//!         .with_property("name", SchemaTree::string()),
//! );
//!
//! let issues = DiffEngine::new(&library, &generated).compare_all();
//! let result = ComparisonResult::new("2026-01-01T00:00:00Z", issues)
//!     .with_sources(&library, &generated);
//!
//! // A rename shows up as two missing properties, never a type mismatch.
//! assert_eq!(result.issues.len(), 2);
//! assert!(result.issues.iter().all(|i| i.kind == IssueKind::Missing));
//! assert!(result.passed());
//!
//! let text = format_result(&result, OutputFormat::Text).unwrap();
//! assert!(text.contains("updates.Session.sid"));
//! ```

mod detector;
mod diff;
mod output;
mod policy;
mod report;
mod set;
mod types;

pub use detector::{BreakingChangeDetector, Skipped};
pub use diff::{DiffEngine, compare};
pub use output::{OutputFormat, format_result, format_schema_set};
pub use policy::{SeverityPolicy, Side, SourceLabels};
pub use report::{ComparisonResult, DetectorReport, DetectorStatus, Summary};
pub use set::{NamedType, SchemaSet};
pub use types::*;

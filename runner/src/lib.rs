//! Drift check orchestration.
//!
//! Wires the loader, the diff engine and an optional breaking-change
//! detector into a single [`run_check`] call, and provides
//! [`ExternalDiffTool`], a detector backed by a structural diff binary such
//! as `oasdiff`.
//!
//! # Quick start
//!
//! ```no_run
//! use schema_drift_core::BreakingChangeDetector;
//! use schema_drift_runner::{CheckRequest, ExternalDiffTool, run_check};
//!
//! let request = CheckRequest::new("schemas/export.json", "openapi.json")
//!     .with_baseline("openapi.baseline.json");
//! let tool = ExternalDiffTool::new("oasdiff");
//!
//! let result = run_check(&request, Some(&tool as &dyn BreakingChangeDetector)).unwrap();
//! println!("{} (detector {})", result.summary, result.detector.status);
//! ```

mod breaking;
mod error;
mod pipeline;
mod translate;

pub use breaking::ExternalDiffTool;
pub use error::{Result, RunnerError};
pub use pipeline::{CheckRequest, run_check};
pub use translate::translate_changes;

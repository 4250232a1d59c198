//! Loading of schema sources and run configuration.
//!
//! This crate turns the two serialized inputs of a drift check into
//! [`SchemaSet`](schema_drift_core::SchemaSet)s: a hand-authored schema
//! library export and a generated OpenAPI / Swagger specification. All
//! source-specific spellings (`$ref` paths, nullable encodings, `integer`,
//! `const`, `allOf` merges) are normalized here so the diff engine never
//! needs to know where a tree came from.
//!
//! # Quick start
//!
//! ```no_run
//! use schema_drift_core::DiffEngine;
//! use schema_drift_loader::{DriftConfig, load_library, load_spec};
//!
//! let config = DriftConfig::load(".schema-drift.yml").unwrap();
//! let library = load_library("schemas/export.json").unwrap();
//! let generated = load_spec("openapi.json").unwrap();
//!
//! let issues = DiffEngine::new(&library, &generated)
//!     .with_policy(config.severity.clone())
//!     .with_labels(config.labels.clone())
//!     .compare_all();
//! println!("{} issues", issues.len());
//! ```

mod config;
mod error;
mod loader;
mod normalize;

pub use config::{DetectorConfig, DriftConfig, IssueFilter};
pub use error::{LoaderError, Result};
pub use loader::{InputFormat, digest, from_value, load, load_library, load_spec};
pub use normalize::{normalize, reference_name};

//! Error types for loading schema sources and configuration.
//!
//! Every variant is fatal: the run stops before any comparison and the
//! offending file or JSON location is reported to the user.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading inputs.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// File could not be read or written.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required section of the document is absent.
    #[error("{document}: missing section `{section}`")]
    MissingSection { document: String, section: String },

    /// A node that cannot be read as a schema.
    #[error("invalid schema at {path}: {message}")]
    InvalidSchema { path: String, message: String },

    /// A node sets more than one mutually exclusive shape field.
    #[error("schema at {path} mixes mutually exclusive fields: {}", fields.join(", "))]
    InvariantViolation { path: String, fields: Vec<String> },

    /// An `ignore_paths` entry is not a valid regular expression.
    #[error("invalid ignore pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl LoaderError {
    pub(crate) fn invalid(path: &str, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results with [`LoaderError`].
pub type Result<T> = std::result::Result<T, LoaderError>;

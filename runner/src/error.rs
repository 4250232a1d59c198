//! Error types for the drift check pipeline.

use thiserror::Error;

use schema_drift_loader::LoaderError;

/// Fatal errors that stop a drift check before a result is produced.
///
/// Detector failures are not represented here; they degrade to a skipped
/// detector step inside the result.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// An input document or the configuration could not be loaded.
    #[error(transparent)]
    Load(#[from] LoaderError),
}

/// Convenience alias for results with [`RunnerError`].
pub type Result<T> = std::result::Result<T, RunnerError>;

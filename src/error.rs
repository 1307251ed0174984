//! Error types for det3d-bench
//!
//! Only pipeline-level failures live here. A single experiment that fails to
//! launch or exits nonzero is recorded as data in
//! [`ExperimentResult`](crate::experiment::ExperimentResult), not raised.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// det3d-bench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Two registry entries share a name (names are the join key)
    #[error("Duplicate experiment name: {0}\nEvery experiment in a registry must have a unique name")]
    DuplicateExperiment(String),

    /// Registry or pipeline configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error (output directories, table files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular storage error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Registry file parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Error types for the grouped-clusters library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input file {0:?} does not exist, please check path and try again")]
    InputNotFound(PathBuf),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Group '{group}' failed: {reason}")]
    Collaborator { group: String, reason: String },

    #[error("Worker pool error: {0}")]
    ThreadPool(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary matrix error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl ClusterError {
    /// Wrap any error raised while a group's collaborators were running.
    pub fn collaborator(group: &str, err: impl std::fmt::Display) -> Self {
        ClusterError::Collaborator {
            group: group.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

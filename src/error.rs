use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a run before any record is scored.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: invalid YAML in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid scoring rules:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

impl ConfigError {
    /// Individual problems, one per line, for reporting.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ConfigError::Invalid(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Scoring run cancelled before completion")]
    Cancelled,
}

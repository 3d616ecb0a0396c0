//! Application error types.

use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors for the validation pipeline.
///
/// Only configuration errors abort a run outright. Everything else is either
/// recorded by the stage that produced it or turned into a failed stage in the
/// report, so a single report always explains what went wrong.
#[derive(Error, Debug)]
pub enum AppError {
    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    // Domain file errors
    #[error("Required domain '{domain}' is missing: {}", path.display())]
    MissingRequiredDomain { domain: String, path: PathBuf },

    #[error("Syntax error in {}: {message}", path.display())]
    Syntax { path: PathBuf, message: String },

    #[error("Merge consistency error: expected {expected} triples, artifact holds {actual}")]
    MergeConsistency { expected: usize, actual: usize },

    // Engine errors
    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Constraint engine error: {0}")]
    Constraint(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Store error: {0}")]
    Store(String),

    // I/O errors
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable code used in JSON reports.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::MissingRequiredDomain { .. } => "MISSING_REQUIRED_DOMAIN",
            AppError::Syntax { .. } => "SYNTAX_ERROR",
            AppError::MergeConsistency { .. } => "MERGE_CONSISTENCY_ERROR",
            AppError::Query(_) => "QUERY_EXECUTION_ERROR",
            AppError::Constraint(_) => "CONSTRAINT_ENGINE_ERROR",
            AppError::Timeout { .. } => "TIMEOUT",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Io { .. } => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_message_names_file() {
        let err = AppError::Syntax {
            path: PathBuf::from("tasks.ttl"),
            message: "unexpected end of file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Syntax error in tasks.ttl: unexpected end of file"
        );
        assert_eq!(err.code(), "SYNTAX_ERROR");
    }

    #[test]
    fn test_merge_consistency_message() {
        let err = AppError::MergeConsistency {
            expected: 15,
            actual: 14,
        };
        assert!(err.to_string().contains("expected 15"));
        assert!(err.to_string().contains("holds 14"));
    }

    #[test]
    fn test_timeout_message() {
        let err = AppError::Timeout {
            operation: "parse base.ttl".to_string(),
            seconds: 30,
        };
        assert_eq!(err.to_string(), "parse base.ttl timed out after 30s");
    }
}

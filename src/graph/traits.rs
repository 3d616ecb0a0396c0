//! Core traits for the external graph collaborators.
//!
//! The pipeline never parses, queries or checks RDF itself. It talks to three
//! collaborators:
//!
//! - [`GraphBackend`] - Parse, merge and serialize domain files
//! - [`QueryEngine`] - Open the merge artifact for querying
//! - [`ConstraintEngine`] - Check a data file against a shapes file
//!
//! All methods are blocking; the pipeline runs them on the blocking pool with
//! a timeout.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::ArtifactFormat;
use crate::error::AppError;
use crate::graph::buffer::GraphBuffer;
use crate::graph::row::QueryRows;

/// Parses, merges and serializes graph files.
pub trait GraphBackend: Send + Sync {
    /// Parses a file and returns its triple count.
    ///
    /// Fails with [`AppError::Syntax`] if the file is not well-formed.
    fn parse(&self, path: &Path) -> Result<usize, AppError>;

    /// Parses `path` and appends its triples to `graph` as a segment named `source`.
    ///
    /// Order-sensitive: no deduplication against earlier segments.
    fn merge(&self, graph: GraphBuffer, source: &str, path: &Path)
        -> Result<GraphBuffer, AppError>;

    /// Writes a complete, independently re-parseable artifact to `path`,
    /// replacing whatever was there.
    fn serialize(
        &self,
        graph: &GraphBuffer,
        path: &Path,
        format: ArtifactFormat,
    ) -> Result<(), AppError>;
}

/// Opens a merge artifact for querying.
pub trait QueryEngine: Send + Sync {
    /// Loads the artifact once; the returned session runs any number of queries.
    fn open(&self, artifact: &Path) -> Result<Arc<dyn QuerySession>, AppError>;
}

/// A loaded, read-only graph that queries run against.
pub trait QuerySession: Send + Sync {
    /// Executes `query`, counting every row but keeping at most `preview` of them.
    fn execute(&self, query: &str, preview: usize) -> Result<QueryRows, AppError>;
}

/// Checks a data file against a constraint-set file.
pub trait ConstraintEngine: Send + Sync {
    fn check(&self, data: &Path, shapes: &Path) -> Result<ConstraintOutcome, AppError>;
}

/// Result of one constraint check.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConstraintOutcome {
    pub conforms: bool,
    pub violations: Vec<Violation>,
}

impl ConstraintOutcome {
    /// Builds an outcome that conforms iff `violations` is empty.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            conforms: violations.is_empty(),
            violations,
        }
    }
}

/// Severity of a constraint result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Violation,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("Info"),
            Severity::Warning => f.write_str("Warning"),
            Severity::Violation => f.write_str("Violation"),
        }
    }
}

/// One constraint result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// The node that failed the check.
    pub focus_node: String,
    /// Property path the check applied to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Offending value, if the check is about a single value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Constraint component (e.g. "MinCount").
    pub component: String,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.focus_node)?;
        if let Some(path) = &self.path {
            write!(f, " {path}")?;
        }
        write!(f, ": {} ({})", self.message, self.component)?;
        if let Some(value) = &self.value {
            write!(f, " value={value}")?;
        }
        Ok(())
    }
}

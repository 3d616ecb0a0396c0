//! Application context holding the shared engines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::graph::backends::oxigraph::OxigraphBackend;
use crate::graph::shacl::ShaclEngine;
use crate::graph::{ConstraintEngine, GraphBackend, QueryEngine};

/// Root context for one pipeline run.
///
/// Every field is cheap to clone, so stages running on the blocking pool take
/// their own copy of the handle they need.
#[derive(Clone)]
pub struct Context {
    /// Directory that domain, shape and query paths are resolved against.
    pub root: PathBuf,
    /// Application configuration.
    pub config: Arc<Config>,
    /// Parses, merges and serializes domain files.
    pub backend: Arc<dyn GraphBackend>,
    /// Runs queries against the merge artifact.
    pub queries: Arc<dyn QueryEngine>,
    /// Checks data files against shapes files.
    pub constraints: Arc<dyn ConstraintEngine>,
}

impl Context {
    /// Creates a context with the default engines: oxigraph for parsing and
    /// querying, the built-in SHACL validator for constraints.
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let backend = Arc::new(OxigraphBackend::new());
        Self {
            root: root.into(),
            config: Arc::new(config),
            backend: backend.clone(),
            queries: backend,
            constraints: Arc::new(ShaclEngine::new()),
        }
    }

    /// Replaces the graph backend.
    pub fn with_backend(mut self, backend: Arc<dyn GraphBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Replaces the query engine.
    pub fn with_query_engine(mut self, queries: Arc<dyn QueryEngine>) -> Self {
        self.queries = queries;
        self
    }

    /// Replaces the constraint engine.
    pub fn with_constraint_engine(mut self, constraints: Arc<dyn ConstraintEngine>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Resolves a configured path against the root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// Location of the merge artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.config.artifact_path(&self.root)
    }
}

//! Graph abstraction layer for parsing, merging, querying and checking RDF files.
//!
//! The pipeline never touches RDF syntax directly. It works through three
//! collaborator traits:
//!
//! - [`GraphBackend`] - Parse a file, merge it into a [`GraphBuffer`], serialize the result
//! - [`QueryEngine`] - Load the merge artifact and run SPARQL against it
//! - [`ConstraintEngine`] - Check one data file against one shapes file
//!
//! # Usage
//!
//! ```ignore
//! use pim_rdf::graph::{GraphBackend, GraphBuffer, backends::oxigraph::OxigraphBackend};
//!
//! let backend = OxigraphBackend::new();
//! let count = backend.parse(Path::new("tasks.ttl"))?;
//!
//! let graph = backend.merge(GraphBuffer::new(), "tasks", Path::new("tasks.ttl"))?;
//! backend.serialize(&graph, Path::new("build/merged.ttl"), ArtifactFormat::Turtle)?;
//! ```

mod buffer;
mod row;
mod traits;

pub mod backends;
pub mod shacl;

// Re-export core types
pub use buffer::{GraphBuffer, Segment};
pub use row::{QueryRows, Row};
pub use traits::{
    ConstraintEngine, ConstraintOutcome, GraphBackend, QueryEngine, QuerySession, Severity,
    Violation,
};

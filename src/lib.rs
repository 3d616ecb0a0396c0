//! pim-rdf - Validation pipeline for a file-based personal knowledge store
//!
//! Each domain of personal data (tasks, notes, contacts, ...) lives in its own
//! RDF file. The pipeline checks every file's syntax, merges them in declared
//! order into one artifact, runs smoke-test queries against it and checks the
//! domain files against their shapes.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod pipeline;

//! Backend implementations for the graph traits.
//!
//! Each backend implements some of the traits from [`crate::graph`]:
//!
//! - [`GraphBackend`](crate::graph::GraphBackend) - Parse, merge, serialize
//! - [`QueryEngine`](crate::graph::QueryEngine) - SPARQL over the merge artifact
//!
//! # Available Backends
//!
//! | Backend | Module | Traits |
//! |---------|--------|--------|
//! | Oxigraph (in-memory) | [`oxigraph`] | `GraphBackend`, `QueryEngine` |
//!
//! The constraint engine lives in [`crate::graph::shacl`].
//!
//! # Implementing a Backend
//!
//! 1. Create a backend struct (e.g., `OxigraphBackend`)
//! 2. Implement `GraphBackend`, keeping statements in file order without deduplication
//! 3. Implement `QueryEngine` returning a `QuerySession` that owns the loaded artifact

pub mod oxigraph;

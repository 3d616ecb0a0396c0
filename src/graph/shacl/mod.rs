//! SHACL Core subset used as the default constraint engine.
//!
//! Supported:
//!
//! | Feature     | Terms                                                   |
//! |-------------|---------------------------------------------------------|
//! | Targets     | `targetClass` (with `rdfs:subClassOf`), implicit class, |
//! |             | `targetNode`, `targetSubjectsOf`, `targetObjectsOf`     |
//! | Paths       | predicate IRI, `inversePath`                            |
//! | Cardinality | `minCount`, `maxCount`                                  |
//! | Value type  | `datatype`, `class`, `nodeKind`                         |
//! | Values      | `in`, `hasValue`                                        |
//! | Strings     | `pattern` + `flags`, `minLength`, `maxLength`           |
//!
//! Shapes honour `sh:deactivated`, `sh:severity` and `sh:message`. A data
//! graph conforms iff validation produced no results at all.

mod index;
mod shapes;
mod validate;
mod vocab;

use std::path::Path;

use tracing::debug;

use crate::error::AppError;
use crate::graph::backends::oxigraph::read_triples;
use crate::graph::traits::{ConstraintEngine, ConstraintOutcome};

pub use index::TripleIndex;
pub use shapes::{read_shapes, NodeShape};

/// Constraint engine backed by the in-crate shapes validator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShaclEngine;

impl ShaclEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ConstraintEngine for ShaclEngine {
    fn check(&self, data: &Path, shapes: &Path) -> Result<ConstraintOutcome, AppError> {
        let shapes_graph = TripleIndex::new(read_triples(shapes)?);
        let shapes = read_shapes(&shapes_graph)?;
        let data_graph = TripleIndex::new(read_triples(data)?);

        let violations = validate::validate(&data_graph, &shapes);
        debug!(
            data = %data.display(),
            shapes = shapes.len(),
            results = violations.len(),
            "Constraint check finished"
        );
        Ok(ConstraintOutcome::from_violations(violations))
    }
}

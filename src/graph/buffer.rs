//! In-memory accumulator for the merge stage.

use oxigraph::model::Triple;

/// The triples contributed by one domain file.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Domain the triples came from.
    pub source: String,
    pub triples: Vec<Triple>,
}

/// Ordered union of domain graphs.
///
/// Segments keep the order they were merged in and triples are never
/// deduplicated, so `len()` is always the sum of the segment sizes.
#[derive(Debug, Clone, Default)]
pub struct GraphBuffer {
    segments: Vec<Segment>,
}

impl GraphBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one domain's triples after everything merged so far.
    pub fn append(&mut self, source: impl Into<String>, triples: Vec<Triple>) {
        self.segments.push(Segment {
            source: source.into(),
            triples,
        });
    }

    /// Total number of triples across all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.triples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// All triples in merge order.
    pub fn triples(&self) -> impl Iterator<Item = &Triple> {
        self.segments.iter().flat_map(|s| s.triples.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, NamedNode};

    fn triple(s: &str, o: &str) -> Triple {
        Triple::new(
            NamedNode::new_unchecked(format!("urn:test:{s}")),
            NamedNode::new_unchecked("urn:test:p"),
            Literal::new_simple_literal(o),
        )
    }

    #[test]
    fn test_len_sums_segments() {
        let mut buffer = GraphBuffer::new();
        assert!(buffer.is_empty());

        buffer.append("base", vec![triple("a", "1"), triple("b", "2")]);
        buffer.append("tasks", vec![triple("c", "3")]);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.segments().len(), 2);
        assert_eq!(buffer.segments()[1].source, "tasks");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut buffer = GraphBuffer::new();
        buffer.append("base", vec![triple("a", "1")]);
        buffer.append("tasks", vec![triple("a", "1")]);

        assert_eq!(buffer.len(), 2);
        let all: Vec<_> = buffer.triples().collect();
        assert_eq!(all[0], all[1]);
    }
}

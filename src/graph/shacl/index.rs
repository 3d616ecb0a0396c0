//! Lookup index over a parsed graph.

use std::collections::{HashMap, HashSet, VecDeque};

use oxigraph::model::{NamedNode, Term, Triple};

use super::vocab::{rdf, rdfs};

/// Subject- and object-keyed views of a set of triples.
///
/// Repeated statements are indexed once, so value nodes are always distinct.
/// Lookups return results in document order, which keeps shape evaluation and
/// the resulting violation lists deterministic.
#[derive(Debug, Default)]
pub struct TripleIndex {
    outgoing: HashMap<Term, Vec<(NamedNode, Term)>>,
    incoming: HashMap<Term, Vec<(NamedNode, Term)>>,
    by_predicate: HashMap<NamedNode, Vec<(Term, Term)>>,
}

impl TripleIndex {
    pub fn new(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut index = Self::default();
        let mut seen = HashSet::new();
        for triple in triples {
            if !seen.insert(triple.clone()) {
                continue;
            }
            let subject = Term::from(triple.subject);
            index
                .outgoing
                .entry(subject.clone())
                .or_default()
                .push((triple.predicate.clone(), triple.object.clone()));
            index
                .incoming
                .entry(triple.object.clone())
                .or_default()
                .push((triple.predicate.clone(), subject.clone()));
            index
                .by_predicate
                .entry(triple.predicate)
                .or_default()
                .push((subject, triple.object));
        }
        index
    }

    /// Objects of `subject --predicate-->`.
    pub fn objects<'a>(&'a self, subject: &Term, predicate: &str) -> Vec<&'a Term> {
        self.outgoing
            .get(subject)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|(p, _)| p.as_str() == predicate)
                    .map(|(_, o)| o)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First object of `subject --predicate-->`, if any.
    pub fn object<'a>(&'a self, subject: &Term, predicate: &str) -> Option<&'a Term> {
        self.objects(subject, predicate).into_iter().next()
    }

    /// Subjects of `--predicate--> object`.
    pub fn subjects<'a>(&'a self, predicate: &str, object: &Term) -> Vec<&'a Term> {
        self.incoming
            .get(object)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|(p, _)| p.as_str() == predicate)
                    .map(|(_, s)| s)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct subjects that use `predicate`.
    pub fn subjects_of(&self, predicate: &str) -> Vec<Term> {
        distinct(self.pairs(predicate).map(|(s, _)| s))
    }

    /// Distinct objects that `predicate` points to.
    pub fn objects_of(&self, predicate: &str) -> Vec<Term> {
        distinct(self.pairs(predicate).map(|(_, o)| o))
    }

    fn pairs<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a (Term, Term)> + 'a {
        self.by_predicate
            .iter()
            .filter(move |(p, _)| p.as_str() == predicate)
            .flat_map(|(_, pairs)| pairs.iter())
    }

    /// True if `subject --predicate--> object` is present.
    pub fn contains(&self, subject: &Term, predicate: &str, object: &Term) -> bool {
        self.objects(subject, predicate).into_iter().any(|o| o == object)
    }

    /// Members of the RDF list starting at `head`.
    ///
    /// Stops at `rdf:nil`, at a node without `rdf:rest`, or on a cycle.
    pub fn list(&self, head: &Term) -> Vec<Term> {
        let mut members = Vec::new();
        let mut seen = HashSet::new();
        let mut node = head.clone();
        while !is_nil(&node) && seen.insert(node.clone()) {
            if let Some(first) = self.object(&node, rdf::FIRST) {
                members.push(first.clone());
            }
            match self.object(&node, rdf::REST) {
                Some(rest) => node = rest.clone(),
                None => break,
            }
        }
        members
    }

    /// `class` and every class that is transitively an `rdfs:subClassOf` it.
    pub fn subclasses(&self, class: &Term) -> Vec<Term> {
        self.closure(class, |index, node| index.subjects(rdfs::SUB_CLASS_OF, node))
    }

    /// `class` and every class it is transitively an `rdfs:subClassOf`.
    pub fn superclasses(&self, class: &Term) -> Vec<Term> {
        self.closure(class, |index, node| index.objects(node, rdfs::SUB_CLASS_OF))
    }

    /// Every node typed with `class` or one of its subclasses.
    pub fn instances_of(&self, class: &Term) -> Vec<Term> {
        let mut seen = HashSet::new();
        let mut instances = Vec::new();
        for subclass in self.subclasses(class) {
            for node in self.subjects(rdf::TYPE, &subclass) {
                if seen.insert(node) {
                    instances.push(node.clone());
                }
            }
        }
        instances
    }

    /// SHACL instance check: some `rdf:type` of `node` is `class` or a subclass of it.
    pub fn is_instance_of(&self, node: &Term, class: &Term) -> bool {
        self.objects(node, rdf::TYPE)
            .into_iter()
            .any(|t| self.superclasses(t).iter().any(|c| c == class))
    }

    fn closure<'a, F>(&'a self, start: &Term, next: F) -> Vec<Term>
    where
        F: Fn(&'a Self, &Term) -> Vec<&'a Term>,
    {
        let mut seen = vec![start.clone()];
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(node) = queue.pop_front() {
            for related in next(self, &node) {
                if !seen.contains(related) {
                    seen.push(related.clone());
                    queue.push_back(related.clone());
                }
            }
        }
        seen
    }
}

fn is_nil(term: &Term) -> bool {
    matches!(term, Term::NamedNode(n) if n.as_str() == rdf::NIL)
}

fn distinct<'a>(terms: impl Iterator<Item = &'a Term>) -> Vec<Term> {
    let mut seen = HashSet::new();
    terms.filter(|t| seen.insert(*t)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{BlankNode, Literal};

    fn iri(s: &str) -> NamedNode {
        NamedNode::new_unchecked(s)
    }

    fn t(s: &str, p: &str, o: impl Into<Term>) -> Triple {
        Triple::new(iri(s), iri(p), o)
    }

    #[test]
    fn test_objects_and_subjects() {
        let index = TripleIndex::new(vec![
            t("urn:a", "urn:p", iri("urn:b")),
            t("urn:a", "urn:p", iri("urn:c")),
            t("urn:d", "urn:p", iri("urn:b")),
        ]);

        let a = Term::from(iri("urn:a"));
        let b = Term::from(iri("urn:b"));
        assert_eq!(index.objects(&a, "urn:p").len(), 2);
        assert_eq!(index.subjects("urn:p", &b).len(), 2);
        assert!(index.contains(&a, "urn:p", &b));
        assert_eq!(index.subjects_of("urn:p").len(), 2);
        assert_eq!(index.objects_of("urn:p").len(), 2);
    }

    #[test]
    fn test_repeated_statements_indexed_once() {
        let index = TripleIndex::new(vec![
            t("urn:a", "urn:p", iri("urn:b")),
            t("urn:a", "urn:p", iri("urn:b")),
        ]);

        let a = Term::from(iri("urn:a"));
        let b = Term::from(iri("urn:b"));
        assert_eq!(index.objects(&a, "urn:p").len(), 1);
        assert_eq!(index.subjects("urn:p", &b).len(), 1);
    }

    #[test]
    fn test_list_members() {
        let n1 = BlankNode::new_unchecked("l1");
        let n2 = BlankNode::new_unchecked("l2");
        let index = TripleIndex::new(vec![
            Triple::new(n1.clone(), iri(rdf::FIRST), Literal::new_simple_literal("open")),
            Triple::new(n1.clone(), iri(rdf::REST), n2.clone()),
            Triple::new(n2.clone(), iri(rdf::FIRST), Literal::new_simple_literal("done")),
            Triple::new(n2, iri(rdf::REST), iri(rdf::NIL)),
        ]);

        let members = index.list(&Term::from(n1));
        assert_eq!(
            members,
            vec![
                Term::from(Literal::new_simple_literal("open")),
                Term::from(Literal::new_simple_literal("done")),
            ]
        );
    }

    #[test]
    fn test_instances_follow_subclasses() {
        let index = TripleIndex::new(vec![
            t("urn:Meeting", rdfs::SUB_CLASS_OF, iri("urn:Event")),
            t("urn:m1", rdf::TYPE, iri("urn:Meeting")),
            t("urn:e1", rdf::TYPE, iri("urn:Event")),
        ]);

        let event = Term::from(iri("urn:Event"));
        assert_eq!(index.instances_of(&event).len(), 2);
        assert!(index.is_instance_of(&Term::from(iri("urn:m1")), &event));
        assert!(!index.is_instance_of(&Term::from(iri("urn:m1")), &Term::from(iri("urn:Task"))));
    }

    #[test]
    fn test_subclass_cycle_terminates() {
        let index = TripleIndex::new(vec![
            t("urn:A", rdfs::SUB_CLASS_OF, iri("urn:B")),
            t("urn:B", rdfs::SUB_CLASS_OF, iri("urn:A")),
        ]);
        assert_eq!(index.superclasses(&Term::from(iri("urn:A"))).len(), 2);
    }
}

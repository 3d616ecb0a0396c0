//! Shape model read from a shapes graph.

use std::collections::HashSet;
use std::fmt;

use oxigraph::model::{NamedNode, Term};
use regex_lite::Regex;

use super::index::TripleIndex;
use super::vocab::{rdf, rdfs, sh};
use crate::error::AppError;
use crate::graph::traits::Severity;

/// How a shape selects its focus nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Class(Term),
    Node(Term),
    SubjectsOf(String),
    ObjectsOf(String),
}

/// A property path. Only single predicates and their inverse are supported.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyPath {
    Predicate(NamedNode),
    Inverse(NamedNode),
}

impl PropertyPath {
    /// Value nodes reached from `focus` along this path.
    pub fn values(&self, data: &TripleIndex, focus: &Term) -> Vec<Term> {
        match self {
            PropertyPath::Predicate(p) => {
                data.objects(focus, p.as_str()).into_iter().cloned().collect()
            }
            PropertyPath::Inverse(p) => {
                data.subjects(p.as_str(), focus).into_iter().cloned().collect()
            }
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Predicate(p) => write!(f, "{p}"),
            PropertyPath::Inverse(p) => write!(f, "^{p}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            sh::IRI => Some(NodeKind::Iri),
            sh::BLANK_NODE => Some(NodeKind::BlankNode),
            sh::LITERAL => Some(NodeKind::Literal),
            sh::BLANK_NODE_OR_IRI => Some(NodeKind::BlankNodeOrIri),
            sh::BLANK_NODE_OR_LITERAL => Some(NodeKind::BlankNodeOrLiteral),
            sh::IRI_OR_LITERAL => Some(NodeKind::IriOrLiteral),
            _ => None,
        }
    }

    pub fn matches(&self, term: &Term) -> bool {
        let (iri, blank, literal) = match term {
            Term::NamedNode(_) => (true, false, false),
            Term::BlankNode(_) => (false, true, false),
            Term::Literal(_) => (false, false, true),
            #[allow(unreachable_patterns)]
            _ => (false, false, false),
        };
        match self {
            NodeKind::Iri => iri,
            NodeKind::BlankNode => blank,
            NodeKind::Literal => literal,
            NodeKind::BlankNodeOrIri => blank || iri,
            NodeKind::BlankNodeOrLiteral => blank || literal,
            NodeKind::IriOrLiteral => iri || literal,
        }
    }
}

/// One constraint component with its parameter.
#[derive(Debug, Clone)]
pub enum Constraint {
    MinCount(usize),
    MaxCount(usize),
    Datatype(NamedNode),
    Class(Term),
    NodeKind(NodeKind),
    In(Vec<Term>),
    HasValue(Term),
    Pattern { regex: Regex, source: String },
    MinLength(usize),
    MaxLength(usize),
}

impl Constraint {
    /// Component name used in violation reports.
    pub fn component(&self) -> &'static str {
        match self {
            Constraint::MinCount(_) => "MinCount",
            Constraint::MaxCount(_) => "MaxCount",
            Constraint::Datatype(_) => "Datatype",
            Constraint::Class(_) => "Class",
            Constraint::NodeKind(_) => "NodeKind",
            Constraint::In(_) => "In",
            Constraint::HasValue(_) => "HasValue",
            Constraint::Pattern { .. } => "Pattern",
            Constraint::MinLength(_) => "MinLength",
            Constraint::MaxLength(_) => "MaxLength",
        }
    }
}

/// Settings shared by node and property shapes.
#[derive(Debug, Clone, Default)]
pub struct ShapeMeta {
    pub message: Option<String>,
    pub severity: Severity,
    pub deactivated: bool,
}

#[derive(Debug, Clone)]
pub struct PropertyShape {
    pub id: Term,
    pub path: PropertyPath,
    pub constraints: Vec<Constraint>,
    pub meta: ShapeMeta,
}

#[derive(Debug, Clone)]
pub struct NodeShape {
    pub id: Term,
    pub targets: Vec<Target>,
    /// Constraints on the focus node itself.
    pub constraints: Vec<Constraint>,
    pub properties: Vec<PropertyShape>,
    pub meta: ShapeMeta,
}

impl NodeShape {
    /// Distinct focus nodes selected by all targets, in target order.
    pub fn focus_nodes(&self, data: &TripleIndex) -> Vec<Term> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for target in &self.targets {
            let selected = match target {
                Target::Class(class) => data.instances_of(class),
                Target::Node(node) => vec![node.clone()],
                Target::SubjectsOf(p) => data.subjects_of(p),
                Target::ObjectsOf(p) => data.objects_of(p),
            };
            for node in selected {
                if seen.insert(node.clone()) {
                    nodes.push(node);
                }
            }
        }
        nodes
    }
}

fn invalid(shape: &Term, message: impl fmt::Display) -> AppError {
    AppError::Constraint(format!("shape {shape}: {message}"))
}

fn literal_value(term: &Term) -> Option<&str> {
    match term {
        Term::Literal(lit) => Some(lit.value()),
        _ => None,
    }
}

fn named_node(term: &Term) -> Option<&NamedNode> {
    match term {
        Term::NamedNode(node) => Some(node),
        _ => None,
    }
}

fn count_param(
    shapes: &TripleIndex,
    shape: &Term,
    predicate: &str,
) -> Result<Option<usize>, AppError> {
    let Some(term) = shapes.object(shape, predicate) else {
        return Ok(None);
    };
    literal_value(term)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(Some)
        .ok_or_else(|| {
            invalid(
                shape,
                format!("{predicate} must be a non-negative integer, got {term}"),
            )
        })
}

fn read_meta(shapes: &TripleIndex, shape: &Term) -> ShapeMeta {
    let severity = match shapes.object(shape, sh::SEVERITY).and_then(named_node) {
        Some(s) if s.as_str() == sh::INFO => Severity::Info,
        Some(s) if s.as_str() == sh::WARNING => Severity::Warning,
        _ => Severity::Violation,
    };
    ShapeMeta {
        message: shapes
            .object(shape, sh::MESSAGE)
            .and_then(literal_value)
            .map(str::to_string),
        severity,
        deactivated: shapes
            .object(shape, sh::DEACTIVATED)
            .and_then(literal_value)
            .is_some_and(|v| v == "true" || v == "1"),
    }
}

/// Reads every constraint component declared directly on `shape`.
fn read_constraints(shapes: &TripleIndex, shape: &Term) -> Result<Vec<Constraint>, AppError> {
    let mut constraints = Vec::new();

    if let Some(n) = count_param(shapes, shape, sh::MIN_COUNT)? {
        constraints.push(Constraint::MinCount(n));
    }
    if let Some(n) = count_param(shapes, shape, sh::MAX_COUNT)? {
        constraints.push(Constraint::MaxCount(n));
    }
    for term in shapes.objects(shape, sh::DATATYPE) {
        let datatype =
            named_node(term).ok_or_else(|| invalid(shape, "sh:datatype must be an IRI"))?;
        constraints.push(Constraint::Datatype(datatype.clone()));
    }
    for term in shapes.objects(shape, sh::CLASS) {
        constraints.push(Constraint::Class(term.clone()));
    }
    if let Some(term) = shapes.object(shape, sh::NODE_KIND) {
        let kind = named_node(term)
            .and_then(|n| NodeKind::from_iri(n.as_str()))
            .ok_or_else(|| invalid(shape, format!("unknown sh:nodeKind {term}")))?;
        constraints.push(Constraint::NodeKind(kind));
    }
    if let Some(head) = shapes.object(shape, sh::IN) {
        constraints.push(Constraint::In(shapes.list(head)));
    }
    for term in shapes.objects(shape, sh::HAS_VALUE) {
        constraints.push(Constraint::HasValue(term.clone()));
    }
    if let Some(term) = shapes.object(shape, sh::PATTERN) {
        let source = literal_value(term)
            .ok_or_else(|| invalid(shape, "sh:pattern must be a literal"))?
            .to_string();
        let flags: String = shapes
            .object(shape, sh::FLAGS)
            .and_then(literal_value)
            .unwrap_or_default()
            .chars()
            .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
            .collect();
        let expression = if flags.is_empty() {
            source.clone()
        } else {
            format!("(?{flags}){source}")
        };
        let regex = Regex::new(&expression)
            .map_err(|e| invalid(shape, format!("invalid sh:pattern '{source}': {e}")))?;
        constraints.push(Constraint::Pattern { regex, source });
    }
    if let Some(n) = count_param(shapes, shape, sh::MIN_LENGTH)? {
        constraints.push(Constraint::MinLength(n));
    }
    if let Some(n) = count_param(shapes, shape, sh::MAX_LENGTH)? {
        constraints.push(Constraint::MaxLength(n));
    }

    Ok(constraints)
}

fn read_path(shapes: &TripleIndex, shape: &Term) -> Result<PropertyPath, AppError> {
    let term = shapes
        .object(shape, sh::PATH)
        .ok_or_else(|| invalid(shape, "property shape without sh:path"))?;
    if let Some(predicate) = named_node(term) {
        return Ok(PropertyPath::Predicate(predicate.clone()));
    }
    if let Some(inverse) = shapes.object(term, sh::INVERSE_PATH).and_then(named_node) {
        return Ok(PropertyPath::Inverse(inverse.clone()));
    }
    Err(invalid(shape, "only predicate and sh:inversePath paths are supported"))
}

fn read_property(shapes: &TripleIndex, shape: &Term) -> Result<PropertyShape, AppError> {
    Ok(PropertyShape {
        id: shape.clone(),
        path: read_path(shapes, shape)?,
        constraints: read_constraints(shapes, shape)?,
        meta: read_meta(shapes, shape),
    })
}

fn read_targets(shapes: &TripleIndex, shape: &Term) -> Vec<Target> {
    let mut targets: Vec<Target> = shapes
        .objects(shape, sh::TARGET_CLASS)
        .into_iter()
        .map(|c| Target::Class(c.clone()))
        .collect();
    if shapes.contains(shape, rdf::TYPE, &iri_term(rdfs::CLASS)) {
        targets.push(Target::Class(shape.clone()));
    }
    targets.extend(
        shapes
            .objects(shape, sh::TARGET_NODE)
            .into_iter()
            .map(|n| Target::Node(n.clone())),
    );
    targets.extend(
        shapes
            .objects(shape, sh::TARGET_SUBJECTS_OF)
            .into_iter()
            .filter_map(named_node)
            .map(|p| Target::SubjectsOf(p.as_str().to_string())),
    );
    targets.extend(
        shapes
            .objects(shape, sh::TARGET_OBJECTS_OF)
            .into_iter()
            .filter_map(named_node)
            .map(|p| Target::ObjectsOf(p.as_str().to_string())),
    );
    targets
}

fn iri_term(iri: &str) -> Term {
    Term::NamedNode(NamedNode::new_unchecked(iri))
}

/// Reads all shapes that select focus nodes.
///
/// A node shape is any subject typed `sh:NodeShape` or carrying a target. A
/// property shape with its own targets is wrapped in a node shape holding
/// just that property.
pub fn read_shapes(shapes: &TripleIndex) -> Result<Vec<NodeShape>, AppError> {
    let mut candidates: Vec<Term> = shapes
        .subjects(rdf::TYPE, &iri_term(sh::NODE_SHAPE))
        .into_iter()
        .cloned()
        .collect();
    for predicate in [
        sh::TARGET_CLASS,
        sh::TARGET_NODE,
        sh::TARGET_SUBJECTS_OF,
        sh::TARGET_OBJECTS_OF,
    ] {
        candidates.extend(shapes.subjects_of(predicate));
    }

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for id in candidates {
        if !seen.insert(id.clone()) {
            continue;
        }

        let is_property_shape = shapes.contains(&id, rdf::TYPE, &iri_term(sh::PROPERTY_SHAPE))
            || shapes.object(&id, sh::PATH).is_some();

        let shape = if is_property_shape {
            NodeShape {
                targets: read_targets(shapes, &id),
                constraints: Vec::new(),
                properties: vec![read_property(shapes, &id)?],
                meta: ShapeMeta::default(),
                id,
            }
        } else {
            let properties = shapes
                .objects(&id, sh::PROPERTY)
                .into_iter()
                .map(|p| read_property(shapes, p))
                .collect::<Result<Vec<_>, _>>()?;
            NodeShape {
                targets: read_targets(shapes, &id),
                constraints: read_constraints(shapes, &id)?,
                properties,
                meta: read_meta(shapes, &id),
                id,
            }
        };
        result.push(shape);
    }

    Ok(result)
}

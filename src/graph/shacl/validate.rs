//! Evaluates shapes against a data graph.

use oxigraph::model::Term;

use super::index::TripleIndex;
use super::shapes::{Constraint, NodeShape, PropertyPath, PropertyShape, ShapeMeta};
use crate::graph::traits::Violation;

/// Validates every active shape and returns all results in shape order.
pub fn validate(data: &TripleIndex, shapes: &[NodeShape]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for shape in shapes.iter().filter(|s| !s.meta.deactivated) {
        for focus in shape.focus_nodes(data) {
            for constraint in &shape.constraints {
                check_values(
                    data,
                    &focus,
                    None,
                    std::slice::from_ref(&focus),
                    constraint,
                    &shape.meta,
                    &mut violations,
                );
            }
            for property in shape.properties.iter().filter(|p| !p.meta.deactivated) {
                check_property(data, &focus, property, &mut violations);
            }
        }
    }
    violations
}

fn check_property(
    data: &TripleIndex,
    focus: &Term,
    property: &PropertyShape,
    out: &mut Vec<Violation>,
) {
    let values = property.path.values(data, focus);
    for constraint in &property.constraints {
        check_values(
            data,
            focus,
            Some(&property.path),
            &values,
            constraint,
            &property.meta,
            out,
        );
    }
}

fn check_values(
    data: &TripleIndex,
    focus: &Term,
    path: Option<&PropertyPath>,
    values: &[Term],
    constraint: &Constraint,
    meta: &ShapeMeta,
    out: &mut Vec<Violation>,
) {
    let report = |value: Option<&Term>, default_message: String| Violation {
        focus_node: focus.to_string(),
        path: path.map(ToString::to_string),
        value: value.map(ToString::to_string),
        component: constraint.component().to_string(),
        severity: meta.severity,
        message: meta.message.clone().unwrap_or(default_message),
    };

    match constraint {
        Constraint::MinCount(min) => {
            if values.len() < *min {
                out.push(report(
                    None,
                    format!("Less than {min} values (found {})", values.len()),
                ));
            }
        }
        Constraint::MaxCount(max) => {
            if values.len() > *max {
                out.push(report(
                    None,
                    format!("More than {max} values (found {})", values.len()),
                ));
            }
        }
        Constraint::HasValue(expected) => {
            if !values.contains(expected) {
                out.push(report(None, format!("Missing expected value {expected}")));
            }
        }
        _ => {
            for value in values {
                if let Some(message) = value_failure(data, value, constraint) {
                    out.push(report(Some(value), message));
                }
            }
        }
    }
}

/// Checks one value against a value-type or string-based component.
fn value_failure(data: &TripleIndex, value: &Term, constraint: &Constraint) -> Option<String> {
    match constraint {
        Constraint::Datatype(expected) => match value {
            Term::Literal(lit) if lit.datatype() == expected.as_ref() => None,
            _ => Some(format!("Value does not have datatype {expected}")),
        },
        Constraint::Class(class) => (!data.is_instance_of(value, class))
            .then(|| format!("Value is not an instance of {class}")),
        Constraint::NodeKind(kind) => {
            (!kind.matches(value)).then(|| format!("Value does not have node kind {kind:?}"))
        }
        Constraint::In(allowed) => {
            (!allowed.contains(value)).then(|| "Value is not in the allowed list".to_string())
        }
        Constraint::Pattern { regex, source } => match lexical_form(value) {
            Some(text) if regex.is_match(text) => None,
            _ => Some(format!("Value does not match pattern \"{source}\"")),
        },
        Constraint::MinLength(min) => match lexical_form(value) {
            Some(text) if text.chars().count() >= *min => None,
            _ => Some(format!("Value is shorter than {min} characters")),
        },
        Constraint::MaxLength(max) => match lexical_form(value) {
            Some(text) if text.chars().count() <= *max => None,
            _ => Some(format!("Value is longer than {max} characters")),
        },
        Constraint::MinCount(_) | Constraint::MaxCount(_) | Constraint::HasValue(_) => None,
    }
}

/// String form used by string-based components. Blank nodes have none.
fn lexical_form(term: &Term) -> Option<&str> {
    match term {
        Term::NamedNode(node) => Some(node.as_str()),
        Term::Literal(lit) => Some(lit.value()),
        _ => None,
    }
}

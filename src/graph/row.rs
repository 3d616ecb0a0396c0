//! Row types for query results.

use std::fmt;

use serde::Serialize;

/// A single solution from a query result.
///
/// Bindings keep the query's variable order. Unbound variables are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    bindings: Vec<(String, String)>,
}

impl Row {
    /// Creates a new row from ordered `(variable, value)` pairs.
    pub fn new(bindings: Vec<(String, String)>) -> Self {
        Self { bindings }
    }

    /// Gets the value bound to a variable.
    pub fn get(&self, variable: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the bound variable names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Values laid out against `variables`, empty where unbound.
    pub fn values_for<'a>(&'a self, variables: &'a [String]) -> impl Iterator<Item = &'a str> {
        variables.iter().map(|v| self.get(v).unwrap_or(""))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.bindings {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "?{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Result of executing one query: the full cardinality plus a bounded preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryRows {
    /// Projected variables, in query order.
    pub variables: Vec<String>,
    /// Number of rows the query produced.
    pub row_count: usize,
    /// The first rows, at most the preview limit requested.
    pub rows: Vec<Row>,
}

impl QueryRows {
    /// Collects rows from an iterator, counting all of them but keeping only `preview`.
    pub fn collect<E>(
        variables: Vec<String>,
        rows: impl Iterator<Item = Result<Row, E>>,
        preview: usize,
    ) -> Result<Self, E> {
        let mut result = Self {
            variables,
            row_count: 0,
            rows: Vec::new(),
        };
        for row in rows {
            let row = row?;
            if result.rows.len() < preview {
                result.rows.push(row);
            }
            result.row_count += 1;
        }
        Ok(result)
    }
}

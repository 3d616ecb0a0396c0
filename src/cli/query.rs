//! Query subcommand - run one SPARQL file against a data file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use crate::config::Config;
use crate::graph::backends::oxigraph::OxigraphBackend;
use crate::graph::{QueryEngine, QueryRows};

/// Query file used when none is given.
const DEFAULT_QUERY: &str = "queries/user/open_tasks_by_priority.sparql";

/// Why a query run stopped. Each maps to its own exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFailure {
    QueryMissing = 2,
    DataMissing = 3,
    DataUnparseable = 4,
    QueryUnreadable = 5,
    Execution = 6,
}

impl From<QueryFailure> for ExitCode {
    fn from(failure: QueryFailure) -> Self {
        ExitCode::from(failure as u8)
    }
}

/// Run a SPARQL query file against a data file.
#[derive(Parser)]
pub struct QueryCommand {
    /// Path to the SPARQL query file.
    #[arg(default_value = DEFAULT_QUERY)]
    pub query: PathBuf,

    /// Data file to query (default: the merge artifact under the root).
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Root directory used to locate the merge artifact.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

impl QueryCommand {
    /// Run the query command.
    pub async fn run(self) -> color_eyre::Result<ExitCode> {
        let data = match self.data {
            Some(ref data) => data.clone(),
            None => Config::load(&self.root)?.artifact_path(&self.root),
        };
        let query = self.query;

        let result = tokio::task::spawn_blocking(move || execute(&query, &data)).await?;
        match result {
            Ok(rows) => {
                print!("{}", render(&rows));
                Ok(ExitCode::SUCCESS)
            }
            Err(failure) => Ok(failure.into()),
        }
    }
}

/// Runs `query` against `data`, keeping every row.
pub fn execute(query: &Path, data: &Path) -> Result<QueryRows, QueryFailure> {
    if !query.is_file() {
        error!("Query file not found: {}", query.display());
        return Err(QueryFailure::QueryMissing);
    }
    if !data.is_file() {
        error!("Data file not found: {}", data.display());
        return Err(QueryFailure::DataMissing);
    }

    let session = OxigraphBackend::new().open(data).map_err(|e| {
        error!("Failed to load data file '{}': {}", data.display(), e);
        QueryFailure::DataUnparseable
    })?;

    let text = std::fs::read_to_string(query).map_err(|e| {
        error!("Failed to read query file '{}': {}", query.display(), e);
        QueryFailure::QueryUnreadable
    })?;

    session.execute(&text, usize::MAX).map_err(|e| {
        error!("SPARQL query execution failed: {}", e);
        QueryFailure::Execution
    })
}

/// Tab-separated header and rows, then the result count.
pub fn render(rows: &QueryRows) -> String {
    let mut out = String::new();
    if !rows.variables.is_empty() {
        out.push_str(&rows.variables.join("\t"));
        out.push('\n');
    }
    for row in &rows.rows {
        let values: Vec<&str> = row.values_for(&rows.variables).collect();
        out.push_str(&values.join("\t"));
        out.push('\n');
    }
    out.push_str(&format!("\n{} result(s)\n", rows.row_count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"@prefix pim: <https://ben.example/ns/pim#> .
@prefix dcterms: <http://purl.org/dc/terms/> .
pim:t1 a pim:Task ; dcterms:title "Write report" .
pim:t2 a pim:Task ; dcterms:title "Call Ana" .
"#;

    const SELECT_TASKS: &str = r#"PREFIX pim: <https://ben.example/ns/pim#>
PREFIX dcterms: <http://purl.org/dc/terms/>
SELECT ?task ?title WHERE { ?task a pim:Task ; dcterms:title ?title } ORDER BY ?title"#;

    fn files(query: &str, data: &str) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let q = dir.path().join("q.sparql");
        let d = dir.path().join("data.ttl");
        std::fs::write(&q, query).unwrap();
        std::fs::write(&d, data).unwrap();
        (dir, q, d)
    }

    #[test]
    fn test_execute_and_render() {
        let (_dir, q, d) = files(SELECT_TASKS, DATA);
        let rows = execute(&q, &d).unwrap();
        assert_eq!(rows.row_count, 2);

        let text = render(&rows);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "task\ttitle");
        assert_eq!(lines[1], "<https://ben.example/ns/pim#t2>\t\"Call Ana\"");
        assert!(text.ends_with("\n2 result(s)\n"));
    }

    #[test]
    fn test_exit_codes() {
        let (dir, q, d) = files(SELECT_TASKS, DATA);
        let missing = dir.path().join("nope");

        assert_eq!(execute(&missing, &d).unwrap_err(), QueryFailure::QueryMissing);
        assert_eq!(execute(&q, &missing).unwrap_err(), QueryFailure::DataMissing);

        let (_bad, q2, d2) = files(SELECT_TASKS, "pim:broken");
        assert_eq!(execute(&q2, &d2).unwrap_err(), QueryFailure::DataUnparseable);

        let (_bad, q3, d3) = files("SELEKT nonsense", DATA);
        assert_eq!(execute(&q3, &d3).unwrap_err(), QueryFailure::Execution);

        assert_eq!(QueryFailure::QueryUnreadable as u8, 5);
    }

    #[test]
    fn test_non_utf8_query_is_unreadable() {
        let (_dir, q, d) = files(SELECT_TASKS, DATA);
        std::fs::write(&q, [0xff, 0xfe, b'S', 0x80]).unwrap();

        assert_eq!(execute(&q, &d).unwrap_err(), QueryFailure::QueryUnreadable);
    }
}

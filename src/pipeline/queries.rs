//! Query smoke-test stage.
//!
//! Results are advisory: a failing query is recorded on its own result and
//! never affects the other queries or the overall outcome.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use super::report::{millis, Stage, Warning};
use super::run_engine;
use crate::context::Context;
use crate::error::AppError;
use crate::graph::{QueryRows, Row};

/// File extension picked up from the query directory.
const QUERY_EXTENSION: &str = "sparql";

/// A query ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: String,
    /// Where the text came from, if it was a file.
    pub source: Option<PathBuf>,
    pub text: String,
}

/// Outcome of one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub name: String,
    pub row_count: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Duration,
    pub variables: Vec<String>,
    /// Bounded preview of the rows.
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    fn succeeded(name: &str, rows: QueryRows, elapsed: Duration) -> Self {
        Self {
            name: name.to_string(),
            row_count: rows.row_count,
            elapsed,
            variables: rows.variables,
            rows: rows.rows,
            error: None,
        }
    }

    fn failed(name: &str, error: &AppError, elapsed: Duration) -> Self {
        Self {
            name: name.to_string(),
            row_count: 0,
            elapsed,
            variables: Vec::new(),
            rows: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn read_query(name: &str, path: &Path) -> Result<NamedQuery, Warning> {
    fs::read_to_string(path)
        .map(|text| NamedQuery {
            name: name.to_string(),
            source: Some(path.to_path_buf()),
            text,
        })
        .map_err(|e| {
            Warning::new(
                Stage::Queries,
                format!("Query '{}' skipped, cannot read {}: {}", name, path.display(), e),
            )
        })
}

/// `*.sparql` files in `dir`, sorted by file name.
fn discover_query_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == QUERY_EXTENSION))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Collects the configured queries followed by the ones found in `query_dir`.
///
/// Unreadable query files and a missing query directory become warnings.
pub fn load_named_queries(ctx: &Context) -> (Vec<NamedQuery>, Vec<Warning>) {
    let mut queries = Vec::new();
    let mut warnings = Vec::new();

    for spec in &ctx.config.queries {
        match (&spec.sparql, &spec.file) {
            (Some(text), _) => queries.push(NamedQuery {
                name: spec.name.clone(),
                source: None,
                text: text.clone(),
            }),
            (None, Some(file)) => match read_query(&spec.name, &ctx.resolve(file)) {
                Ok(query) => queries.push(query),
                Err(warning) => warnings.push(warning),
            },
            (None, None) => {}
        }
    }

    let dir = ctx.resolve(&ctx.config.pipeline.query_dir);
    match discover_query_files(&dir) {
        Ok(files) => {
            for path in files {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                match read_query(&name, &path) {
                    Ok(query) => queries.push(query),
                    Err(warning) => warnings.push(warning),
                }
            }
        }
        Err(e) => warnings.push(Warning::new(
            Stage::Queries,
            format!("Query directory {} not readable: {}", dir.display(), e),
        )),
    }

    for warning in &warnings {
        warn!("{}", warning.message);
    }
    (queries, warnings)
}

/// Runs every query against the artifact, one after another.
pub async fn run_queries(
    ctx: &Context,
    artifact: &Path,
    queries: &[NamedQuery],
) -> Vec<QueryResult> {
    if queries.is_empty() {
        return Vec::new();
    }

    let timeout = ctx.config.pipeline.engine_timeout_secs;
    let preview = ctx.config.pipeline.preview_rows;

    let engine = ctx.queries.clone();
    let target = artifact.to_path_buf();
    let opened = run_engine("load merge artifact", timeout, move || engine.open(&target)).await;
    let session = match opened {
        Ok(session) => session,
        Err(e) => {
            // Nothing can run without the store; every query reports the same cause.
            warn!(error = %e, "Cannot open merge artifact for queries");
            return queries
                .iter()
                .map(|q| QueryResult::failed(&q.name, &e, Duration::ZERO))
                .collect();
        }
    };

    let mut results = Vec::with_capacity(queries.len());
    for query in queries {
        let started = Instant::now();
        let session = session.clone();
        let text = query.text.clone();
        let outcome = run_engine(&format!("query '{}'", query.name), timeout, move || {
            session.execute(&text, preview)
        })
        .await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(rows) => {
                info!(query = %query.name, rows = rows.row_count, "Query ran");
                QueryResult::succeeded(&query.name, rows, elapsed)
            }
            Err(e) => {
                warn!(query = %query.name, error = %e, "Query failed");
                QueryResult::failed(&query.name, &e, elapsed)
            }
        };
        results.push(result);
    }

    results
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, QuerySpec};
    use crate::graph::{QueryEngine, QuerySession};

    struct MockSession;

    impl QuerySession for MockSession {
        fn execute(&self, query: &str, preview: usize) -> Result<QueryRows, AppError> {
            if query.contains("BROKEN") {
                return Err(AppError::Query("parse error".to_string()));
            }
            let rows =
                (0..5).map(|i| Ok::<_, AppError>(Row::new(vec![("n".into(), i.to_string())])));
            QueryRows::collect(vec!["n".to_string()], rows, preview)
        }
    }

    struct MockEngine {
        fail_open: bool,
    }

    impl QueryEngine for MockEngine {
        fn open(&self, _: &Path) -> Result<Arc<dyn QuerySession>, AppError> {
            if self.fail_open {
                return Err(AppError::Store("no artifact".to_string()));
            }
            Ok(Arc::new(MockSession))
        }
    }

    fn ctx(dir: &Path, queries: Vec<QuerySpec>, fail_open: bool) -> Context {
        let config = Config {
            queries,
            ..Default::default()
        };
        Context::new(dir, config).with_query_engine(Arc::new(MockEngine { fail_open }))
    }

    fn named(name: &str, text: &str) -> NamedQuery {
        NamedQuery {
            name: name.to_string(),
            source: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_load_inline_file_and_directory_queries() {
        let dir = tempfile::tempdir().unwrap();
        let query_dir = dir.path().join("queries/validation");
        fs::create_dir_all(&query_dir).unwrap();
        fs::write(query_dir.join("b_people.sparql"), "SELECT ?p WHERE { ?p a ?t }").unwrap();
        fs::write(query_dir.join("a_tasks.sparql"), "SELECT ?t WHERE { ?t a ?c }").unwrap();
        fs::write(query_dir.join("README.md"), "not a query").unwrap();
        fs::write(dir.path().join("extra.rq"), "ASK { ?s ?p ?o }").unwrap();

        let ctx = ctx(
            dir.path(),
            vec![
                QuerySpec::inline("inline", "SELECT * WHERE { ?s ?p ?o }"),
                QuerySpec::from_file("extra", "extra.rq"),
            ],
            false,
        );
        let (queries, warnings) = load_named_queries(&ctx);

        let names: Vec<_> = queries.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["inline", "extra", "a_tasks", "b_people"]);
        assert!(warnings.is_empty());
        assert_eq!(queries[1].text, "ASK { ?s ?p ?o }");
    }

    #[test]
    fn test_missing_query_file_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("queries/validation")).unwrap();
        let ctx = ctx(
            dir.path(),
            vec![QuerySpec::from_file("gone", "queries/gone.sparql")],
            false,
        );

        let (queries, warnings) = load_named_queries(&ctx);
        assert!(queries.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].stage, Stage::Queries);
        assert!(warnings[0].message.contains("'gone'"));
    }

    #[test]
    fn test_missing_query_dir_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), Vec::new(), false);
        let (_, warnings) = load_named_queries(&ctx);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("Query directory"));
    }

    #[tokio::test]
    async fn test_failed_query_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), Vec::new(), false);
        let queries = vec![
            named("first", "SELECT"),
            named("broken", "BROKEN"),
            named("third", "SELECT"),
        ];

        let results = run_queries(&ctx, Path::new("merged.ttl"), &queries).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(!results[1].is_ok());
        assert!(results[1].error.as_deref().unwrap().contains("parse error"));
        assert!(results[2].is_ok());
        assert_eq!(results[2].row_count, 5);
        assert_eq!(results[2].rows.len(), 3);
    }

    #[tokio::test]
    async fn test_open_failure_marks_every_query() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), Vec::new(), true);
        let queries = vec![named("one", "SELECT"), named("two", "SELECT")];

        let results = run_queries(&ctx, Path::new("merged.ttl"), &queries).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.is_ok()));
    }
}

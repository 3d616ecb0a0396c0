//! Oxigraph backend implementation.
//!
//! Parsing and serialization go through `oxigraph::io`; queries run against an
//! in-memory `Store` loaded from the merge artifact.
//!
//! # Example
//!
//! ```ignore
//! use pim_rdf::graph::backends::oxigraph::OxigraphBackend;
//! use pim_rdf::graph::{GraphBackend, GraphBuffer, QueryEngine};
//!
//! let backend = OxigraphBackend::new();
//! let count = backend.parse(Path::new("tasks.ttl"))?;
//!
//! let merged = backend.merge(GraphBuffer::new(), "tasks", Path::new("tasks.ttl"))?;
//! backend.serialize(&merged, Path::new("build/merged.ttl"), ArtifactFormat::Turtle)?;
//!
//! let session = backend.open(Path::new("build/merged.ttl"))?;
//! let rows = session.execute("SELECT * WHERE { ?s ?p ?o }", 3)?;
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use oxigraph::io::{RdfFormat, RdfParseError, RdfParser, RdfSerializer};
use oxigraph::model::{GraphNameRef, NamedNode, QuadRef, Triple};
use oxigraph::sparql::{Query, QueryResults};
use oxigraph::store::Store;
use tracing::{debug, warn};
use url::Url;

use crate::config::ArtifactFormat;
use crate::error::AppError;
use crate::graph::buffer::GraphBuffer;
use crate::graph::row::{QueryRows, Row};
use crate::graph::traits::{GraphBackend, QueryEngine, QuerySession};

/// Named graph prefix used for per-domain graphs in TriG artifacts.
pub const DOMAIN_GRAPH_PREFIX: &str = "urn:pim:graph:";

/// Graph backend and query engine built on oxigraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct OxigraphBackend;

impl OxigraphBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Picks the RDF syntax from the file extension, Turtle when unknown.
pub fn format_for(path: &Path) -> RdfFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(RdfFormat::from_extension)
        .unwrap_or(RdfFormat::Turtle)
}

/// Builds a parser for `path` with the file's own location as base IRI.
///
/// Blank nodes are renamed so that two files never share one. The base is a
/// percent-encoded `file:` URL, so paths with spaces still resolve `<#me>`.
fn parser_for(path: &Path) -> RdfParser {
    let format = format_for(path);
    let parser = RdfParser::from_format(format).rename_blank_nodes();
    let Some(base) = base_iri(path) else {
        warn!(path = %path.display(), "No file URL for path, parsing without a base IRI");
        return parser;
    };
    match parser.with_base_iri(base.as_str()) {
        Ok(parser) => parser,
        Err(e) => {
            warn!(path = %path.display(), base = %base, error = %e, "Rejected base IRI");
            RdfParser::from_format(format).rename_blank_nodes()
        }
    }
}

fn base_iri(path: &Path) -> Option<Url> {
    let absolute = path.canonicalize().ok()?;
    Url::from_file_path(absolute).ok()
}

/// Reads every statement of a graph file, in document order.
///
/// Quads in named graphs are flattened to triples.
pub fn read_triples(path: &Path) -> Result<Vec<Triple>, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    parser_for(path)
        .for_reader(BufReader::new(file))
        .map(|quad| match quad {
            Ok(quad) => Ok(Triple::from(quad)),
            Err(RdfParseError::Io(e)) => Err(AppError::io(path, e)),
            Err(RdfParseError::Syntax(e)) => Err(AppError::Syntax {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        })
        .collect()
}

fn domain_graph(source: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{DOMAIN_GRAPH_PREFIX}{source}"))
}

fn write_buffer<W: Write>(
    graph: &GraphBuffer,
    writer: W,
    format: ArtifactFormat,
) -> std::io::Result<W> {
    match format {
        ArtifactFormat::Turtle => {
            let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle).for_writer(writer);
            for triple in graph.triples() {
                serializer.serialize_triple(triple)?;
            }
            serializer.finish()
        }
        ArtifactFormat::Trig => {
            let mut serializer = RdfSerializer::from_format(RdfFormat::TriG).for_writer(writer);
            for segment in graph.segments() {
                let name = domain_graph(&segment.source);
                for triple in &segment.triples {
                    serializer.serialize_quad(QuadRef::new(
                        &triple.subject,
                        &triple.predicate,
                        &triple.object,
                        GraphNameRef::NamedNode(name.as_ref()),
                    ))?;
                }
            }
            serializer.finish()
        }
    }
}

impl GraphBackend for OxigraphBackend {
    fn parse(&self, path: &Path) -> Result<usize, AppError> {
        read_triples(path).map(|triples| triples.len())
    }

    fn merge(
        &self,
        mut graph: GraphBuffer,
        source: &str,
        path: &Path,
    ) -> Result<GraphBuffer, AppError> {
        let triples = read_triples(path)?;
        debug!(source, triples = triples.len(), "merged {}", path.display());
        graph.append(source, triples);
        Ok(graph)
    }

    fn serialize(
        &self,
        graph: &GraphBuffer,
        path: &Path,
        format: ArtifactFormat,
    ) -> Result<(), AppError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;

        // Write next to the target, then rename over it: readers never see a partial artifact.
        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| AppError::io(dir, e))?;
        let mut writer = write_buffer(graph, BufWriter::new(tmp.as_file()), format)
            .map_err(|e| AppError::io(path, e))?;
        writer.flush().map_err(|e| AppError::io(path, e))?;
        drop(writer);

        tmp.persist(path).map_err(|e| AppError::io(path, e.error))?;
        Ok(())
    }
}

impl QueryEngine for OxigraphBackend {
    fn open(&self, artifact: &Path) -> Result<Arc<dyn QuerySession>, AppError> {
        let store = Store::new().map_err(|e| AppError::Store(e.to_string()))?;
        let file = File::open(artifact).map_err(|e| AppError::io(artifact, e))?;
        store
            .load_from_reader(format_for(artifact), BufReader::new(file))
            .map_err(|e| AppError::Store(format!("loading {}: {}", artifact.display(), e)))?;
        Ok(Arc::new(OxigraphSession { store }))
    }
}

/// An in-memory store holding one loaded artifact.
pub struct OxigraphSession {
    store: Store,
}

impl QuerySession for OxigraphSession {
    fn execute(&self, query: &str, preview: usize) -> Result<QueryRows, AppError> {
        let mut query = Query::parse(query, None).map_err(|e| AppError::Query(e.to_string()))?;
        // Named graphs of a TriG artifact are visible as the default graph.
        query.dataset_mut().set_default_graph_as_union();

        let results = self
            .store
            .query(query)
            .map_err(|e| AppError::Query(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let variables: Vec<String> = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let rows = solutions.map(|solution| {
                    solution.map(|solution| {
                        Row::new(
                            solution
                                .iter()
                                .map(|(var, term)| (var.as_str().to_string(), term.to_string()))
                                .collect(),
                        )
                    })
                });
                QueryRows::collect(variables, rows, preview)
                    .map_err(|e| AppError::Query(e.to_string()))
            }
            QueryResults::Boolean(value) => {
                let row = Row::new(vec![("result".to_string(), value.to_string())]);
                Ok(QueryRows {
                    variables: vec!["result".to_string()],
                    row_count: 1,
                    rows: if preview > 0 { vec![row] } else { Vec::new() },
                })
            }
            QueryResults::Graph(triples) => {
                let variables = vec![
                    "subject".to_string(),
                    "predicate".to_string(),
                    "object".to_string(),
                ];
                let rows = triples.map(|triple| {
                    triple.map(|t| {
                        Row::new(vec![
                            ("subject".to_string(), t.subject.to_string()),
                            ("predicate".to_string(), t.predicate.to_string()),
                            ("object".to_string(), t.object.to_string()),
                        ])
                    })
                });
                QueryRows::collect(variables, rows, preview)
                    .map_err(|e| AppError::Query(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const BASE: &str = r#"
@prefix pim: <https://ben.example/ns/pim#> .
@prefix dcterms: <http://purl.org/dc/terms/> .

pim:me a pim:Person ;
    dcterms:title "Me" .
"#;

    const TASKS: &str = r#"
@prefix pim: <https://ben.example/ns/pim#> .
@prefix dcterms: <http://purl.org/dc/terms/> .

pim:t1 a pim:Task ; dcterms:title "Write report" ; pim:status "open" ; pim:priority 1 .
pim:t2 a pim:Task ; dcterms:title "File taxes" ; pim:status "open" ; pim:priority 2 .
pim:me a pim:Person .
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_counts_triples() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.ttl", BASE);
        let tasks = write(dir.path(), "tasks.ttl", TASKS);

        let backend = OxigraphBackend::new();
        assert_eq!(backend.parse(&base).unwrap(), 2);
        assert_eq!(backend.parse(&tasks).unwrap(), 9);
    }

    #[test]
    fn test_parse_reports_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let broken = write(dir.path(), "broken.ttl", "@prefix pim: <urn:x#> .\npim:a pim:b ");

        let err = OxigraphBackend::new().parse(&broken).unwrap_err();
        assert!(matches!(err, AppError::Syntax { .. }));
    }

    #[test]
    fn test_relative_iris_resolve_under_path_with_space() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("my notes");
        std::fs::create_dir_all(&notes).unwrap();
        let base = write(&notes, "base.ttl", "<#me> a <#Person> .\n<> <#about> <#me> .\n");

        assert_eq!(OxigraphBackend::new().parse(&base).unwrap(), 2);

        let triples = read_triples(&base).unwrap();
        let subject = triples[0].subject.to_string();
        assert!(subject.starts_with("<file://"), "{subject}");
        assert!(subject.contains("my%20notes/base.ttl#me"), "{subject}");
    }

    #[test]
    fn test_parse_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OxigraphBackend::new()
            .parse(&dir.path().join("nope.ttl"))
            .unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }

    #[test]
    fn test_merge_keeps_cross_file_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.ttl", BASE);
        let tasks = write(dir.path(), "tasks.ttl", TASKS);

        let backend = OxigraphBackend::new();
        let graph = backend.merge(GraphBuffer::new(), "base", &base).unwrap();
        let graph = backend.merge(graph, "tasks", &tasks).unwrap();

        // `pim:me a pim:Person` appears in both files.
        assert_eq!(graph.len(), 11);
        assert_eq!(graph.segments()[0].source, "base");
    }

    #[test]
    fn test_serialize_round_trips_count_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.ttl", BASE);
        let tasks = write(dir.path(), "tasks.ttl", TASKS);
        let artifact = dir.path().join("build").join("merged.ttl");
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        std::fs::write(&artifact, "stale content that is not turtle").unwrap();

        let backend = OxigraphBackend::new();
        let graph = backend.merge(GraphBuffer::new(), "base", &base).unwrap();
        let graph = backend.merge(graph, "tasks", &tasks).unwrap();
        backend
            .serialize(&graph, &artifact, ArtifactFormat::Turtle)
            .unwrap();

        assert_eq!(backend.parse(&artifact).unwrap(), 11);
    }

    #[test]
    fn test_trig_artifact_uses_named_graph_per_domain() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.ttl", BASE);
        let tasks = write(dir.path(), "tasks.ttl", TASKS);
        let artifact = dir.path().join("merged.trig");

        let backend = OxigraphBackend::new();
        let graph = backend.merge(GraphBuffer::new(), "base", &base).unwrap();
        let graph = backend.merge(graph, "tasks", &tasks).unwrap();
        backend.serialize(&graph, &artifact, ArtifactFormat::Trig).unwrap();

        assert_eq!(backend.parse(&artifact).unwrap(), 11);

        let session = backend.open(&artifact).unwrap();
        let rows = session
            .execute("SELECT DISTINCT ?g WHERE { GRAPH ?g { ?s ?p ?o } } ORDER BY ?g", 10)
            .unwrap();
        assert_eq!(rows.row_count, 2);
        assert_eq!(rows.rows[0].get("g"), Some("<urn:pim:graph:base>"));

        // Union default graph sees every domain.
        let tasks = session
            .execute(
                "SELECT ?t WHERE { ?t a <https://ben.example/ns/pim#Task> }",
                10,
            )
            .unwrap();
        assert_eq!(tasks.row_count, 2);
    }

    #[test]
    fn test_session_select_counts_and_previews() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write(dir.path(), "tasks.ttl", TASKS);

        let session = OxigraphBackend::new().open(&tasks).unwrap();
        let rows = session
            .execute("SELECT ?s ?p ?o WHERE { ?s ?p ?o }", 3)
            .unwrap();
        assert_eq!(rows.variables, vec!["s", "p", "o"]);
        assert_eq!(rows.row_count, 9);
        assert_eq!(rows.rows.len(), 3);
    }

    #[test]
    fn test_session_ask_and_construct() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write(dir.path(), "tasks.ttl", TASKS);
        let session = OxigraphBackend::new().open(&tasks).unwrap();

        let ask = session
            .execute("ASK { ?t a <https://ben.example/ns/pim#Task> }", 3)
            .unwrap();
        assert_eq!(ask.row_count, 1);
        assert_eq!(ask.rows[0].get("result"), Some("true"));

        let construct = session
            .execute(
                "CONSTRUCT { ?t a <urn:Todo> } WHERE { ?t a <https://ben.example/ns/pim#Task> }",
                1,
            )
            .unwrap();
        assert_eq!(construct.row_count, 2);
        assert_eq!(construct.rows.len(), 1);
    }

    #[test]
    fn test_session_malformed_query_is_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = write(dir.path(), "tasks.ttl", TASKS);
        let session = OxigraphBackend::new().open(&tasks).unwrap();

        let err = session.execute("SELEKT ?s WHERE {", 3).unwrap_err();
        assert!(matches!(err, AppError::Query(_)));
    }
}

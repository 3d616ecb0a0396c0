//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Embedded defaults (`Config::default()`)
//! 2. Project config: `<root>/pim.toml`
//! 3. Environment variables: `PIM_RDF_*` (`__` separates nested keys)
//!
//! A missing project file is not an error: the embedded defaults describe the
//! standard set of domains, so the pipeline runs with zero configuration.
//!
//! # Example
//!
//! ```toml
//! [pipeline]
//! format = "trig"
//! preview_rows = 5
//!
//! [[domains]]
//! name = "base"
//! filename = "base.ttl"
//! required = true
//!
//! [[domains]]
//! name = "tasks"
//! filename = "tasks.ttl"
//!
//! [[constraints]]
//! data_file = "tasks.ttl"
//! shape_file = "shapes/tasks-shapes.ttl"
//! ```
//!
//! Declaring `[[domains]]` replaces the default list entirely. The declared
//! order is the merge order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Project config file name, looked up in the root directory.
pub const CONFIG_FILE: &str = "pim.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PIM_RDF_";

/// Configuration errors. Both variants abort the run before any domain file is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be parsed or extracted.
    #[error("{0}")]
    Parse(Box<figment::Error>),

    /// The configuration parsed but describes an unusable pipeline.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Parse(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub constraints: Vec<ConstraintMapping>,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory receiving the merge artifact, relative to the root.
    pub output_dir: PathBuf,
    /// Serialization of the merge artifact.
    pub format: ArtifactFormat,
    /// Every `*.sparql` file in this directory is appended to the query list.
    pub query_dir: PathBuf,
    /// Rows kept per query result in the report.
    pub preview_rows: usize,
    /// Violation messages shown per non-conforming mapping in text output.
    pub violation_preview: usize,
    /// Upper bound for a single external-engine call.
    pub engine_timeout_secs: u64,
    /// Number of domain files validated at once.
    pub validation_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build"),
            format: ArtifactFormat::Turtle,
            query_dir: PathBuf::from("queries/validation"),
            preview_rows: 3,
            violation_preview: 5,
            engine_timeout_secs: 60,
            validation_concurrency: 1,
        }
    }
}

/// Serialization format of the merge artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// All triples in the default graph.
    Turtle,
    /// One named graph per domain.
    Trig,
}

impl ArtifactFormat {
    /// File name of the merge artifact for this format.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactFormat::Turtle => "merged.ttl",
            ArtifactFormat::Trig => "merged.trig",
        }
    }
}

/// A named unit of personal data backed by one graph file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Unique name (e.g., "tasks").
    pub name: String,
    /// File location relative to the root.
    #[serde(alias = "file")]
    pub filename: PathBuf,
    /// Whether a missing file fails the run (true) or only warns (false).
    #[serde(default)]
    pub required: bool,
    /// Informational only.
    #[serde(default)]
    pub description: String,
}

impl Domain {
    pub fn new(name: &str, filename: &str, required: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            filename: PathBuf::from(filename),
            required,
            description: description.to_string(),
        }
    }

    /// Absolute path of the domain file under `root`.
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(&self.filename)
    }
}

/// Pairs a data file with a constraint-set (shapes) file.
///
/// Several mappings may target the same data file; their checks add up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintMapping {
    pub data_file: PathBuf,
    #[serde(alias = "constraint_file")]
    pub shape_file: PathBuf,
    #[serde(default)]
    pub description: String,
}

impl ConstraintMapping {
    pub fn new(data_file: &str, shape_file: &str, description: &str) -> Self {
        Self {
            data_file: PathBuf::from(data_file),
            shape_file: PathBuf::from(shape_file),
            description: description.to_string(),
        }
    }
}

/// A named smoke-test query, either read from a file or given inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparql: Option<String>,
}

impl QuerySpec {
    pub fn inline(name: &str, sparql: &str) -> Self {
        Self {
            name: name.to_string(),
            file: None,
            sparql: Some(sparql.to_string()),
        }
    }

    pub fn from_file(name: &str, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            file: Some(file.into()),
            sparql: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            domains: default_domains(),
            constraints: default_constraint_mappings(),
            queries: default_queries(),
        }
    }
}

/// Built-in domain list, in merge order.
pub fn default_domains() -> Vec<Domain> {
    vec![
        Domain::new("base", "base.ttl", true, "Shared vocabulary and the owner"),
        Domain::new("tasks", "tasks.ttl", false, "Tasks and their status"),
        Domain::new("notes", "notes.ttl", false, "Notes and creative works"),
        Domain::new("contacts", "contacts.ttl", false, "People and organizations"),
        Domain::new("projects", "projects.ttl", false, "Projects grouping tasks"),
        Domain::new("bookmarks", "bookmarks.ttl", false, "Saved web resources"),
        Domain::new("events", "events.ttl", false, "Calendar events"),
        Domain::new("tags", "tags.ttl", false, "Tag vocabulary"),
    ]
}

/// Built-in constraint mappings: one shapes file per shaped domain.
pub fn default_constraint_mappings() -> Vec<ConstraintMapping> {
    ["notes", "tasks", "contacts", "projects", "events"]
        .iter()
        .map(|domain| {
            ConstraintMapping::new(
                &format!("{domain}.ttl"),
                &format!("shapes/{domain}-shapes.ttl"),
                &format!("{domain} shapes"),
            )
        })
        .collect()
}

const LIST_TASKS: &str = r#"PREFIX pim: <https://ben.example/ns/pim#>
PREFIX dcterms: <http://purl.org/dc/terms/>
SELECT ?task ?title ?status ?priority
WHERE {
  ?task a pim:Task ;
        dcterms:title ?title ;
        pim:status ?status ;
        pim:priority ?priority .
}
ORDER BY ASC(?priority)
"#;

const LIST_CREATIVE_WORKS: &str = r#"PREFIX schema: <https://schema.org/>
PREFIX dcterms: <http://purl.org/dc/terms/>
SELECT ?work ?title
WHERE {
  ?work a schema:CreativeWork ;
        dcterms:title ?title .
}
"#;

const COUNT_BY_TYPE: &str = r#"SELECT ?type (COUNT(?entity) AS ?count)
WHERE {
  ?entity a ?type .
}
GROUP BY ?type
ORDER BY DESC(?count)
"#;

/// Built-in smoke-test queries.
pub fn default_queries() -> Vec<QuerySpec> {
    vec![
        QuerySpec::inline("List all tasks", LIST_TASKS),
        QuerySpec::inline("List all schema.org CreativeWorks", LIST_CREATIVE_WORKS),
        QuerySpec::inline("Count entities by type", COUNT_BY_TYPE),
    ]
}

impl Config {
    /// Load config for `root` with layered resolution (defaults → project → env).
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(root))
    }

    /// The layered figment for `root`, exposed for callers that add providers.
    pub fn figment(root: &Path) -> Figment {
        Figment::new()
            // Layer 1: Embedded defaults (lowest priority)
            .merge(Serialized::defaults(Config::default()))
            // Layer 2: Project config
            .merge(Toml::file(root.join(CONFIG_FILE)))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate a config from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks that the format alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domains.is_empty() {
            return Err(ConfigError::Invalid("no domains declared".to_string()));
        }

        let mut seen = HashSet::new();
        for domain in &self.domains {
            if domain.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "domain with file '{}' has an empty name",
                    domain.filename.display()
                )));
            }
            if domain.filename.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "domain '{}' has an empty filename",
                    domain.name
                )));
            }
            if !seen.insert(domain.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate domain name '{}'",
                    domain.name
                )));
            }
        }

        for query in &self.queries {
            if query.file.is_some() == query.sparql.is_some() {
                return Err(ConfigError::Invalid(format!(
                    "query '{}' must set exactly one of `file` or `sparql`",
                    query.name
                )));
            }
        }

        let pipeline = &self.pipeline;
        if pipeline.preview_rows == 0 {
            return Err(ConfigError::Invalid("preview_rows must be positive".into()));
        }
        if pipeline.engine_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "engine_timeout_secs must be positive".into(),
            ));
        }
        if pipeline.validation_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "validation_concurrency must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Path of the merge artifact under `root`.
    pub fn artifact_path(&self, root: &Path) -> PathBuf {
        root.join(&self.pipeline.output_dir).join(self.pipeline.format.file_name())
    }
}

/// Ordered domain list for `root`.
pub fn load_domains(root: &Path) -> Result<Vec<Domain>, ConfigError> {
    Ok(Config::load(root)?.domains)
}

/// Constraint mappings for `root`.
pub fn load_constraint_mappings(root: &Path) -> Result<Vec<ConstraintMapping>, ConfigError> {
    Ok(Config::load(root)?.constraints)
}

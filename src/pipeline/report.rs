//! Report aggregation and rendering.
//!
//! [`PipelineReport`] serializes to JSON for automation and implements
//! `Display` for the human summary.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::constraints::ConstraintReport;
use super::merge::MergedGraph;
use super::queries::QueryResult;
use super::syntax::SyntaxReport;
use crate::context::Context;
use crate::error::AppError;

/// Serializes a duration as fractional milliseconds.
pub(crate) fn millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(ms(duration))
}

fn ms(duration: &Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Syntax,
    Merge,
    Queries,
    Constraints,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Syntax => "syntax",
            Stage::Merge => "merge",
            Stage::Queries => "queries",
            Stage::Constraints => "constraints",
        };
        f.write_str(name)
    }
}

/// A non-fatal finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub stage: Stage,
    pub message: String,
}

impl Warning {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// The fatal error that stopped the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    /// Machine-readable error code (e.g. "SYNTAX_ERROR").
    pub code: String,
    pub message: String,
    /// Domain the failure is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub generated_at: DateTime<Utc>,
    pub root: PathBuf,
    /// All domain files valid and the merge invariant held.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
    pub warnings: Vec<Warning>,
    pub validation: SyntaxReport,
    pub merge: Option<MergedGraph>,
    pub queries: Vec<QueryResult>,
    pub constraints: Vec<ConstraintReport>,
    /// Violations listed per mapping in the text summary.
    #[serde(skip)]
    pub violation_preview: usize,
}

impl PipelineReport {
    /// Mappings that did not conform.
    pub fn non_conforming(&self) -> impl Iterator<Item = &ConstraintReport> {
        self.constraints.iter().filter(|c| !c.conforms)
    }

    /// Queries that failed to execute.
    pub fn failed_queries(&self) -> impl Iterator<Item = &QueryResult> {
        self.queries.iter().filter(|q| !q.is_ok())
    }

    /// Process exit code: 0 iff the run succeeded.
    pub fn exit_code(&self) -> u8 {
        if self.success {
            0
        } else {
            1
        }
    }
}

/// Folds stage outputs into a report.
///
/// Success depends only on syntax validation and the merge. Query errors and
/// constraint violations are reported but never flip it.
pub fn aggregate(
    ctx: &Context,
    validation: SyntaxReport,
    merge: Option<Result<MergedGraph, AppError>>,
    queries: Vec<QueryResult>,
    constraints: Vec<ConstraintReport>,
    stage_warnings: Vec<Warning>,
) -> PipelineReport {
    let mut warnings = validation.warnings.clone();
    warnings.extend(stage_warnings);

    let mut failure = validation.failure().map(|outcome| StageFailure {
        stage: Stage::Syntax,
        code: outcome.error_code.unwrap_or("SYNTAX_ERROR").to_string(),
        message: outcome.error.clone().unwrap_or_default(),
        domain: Some(outcome.domain.clone()),
    });

    let merge = match merge {
        Some(Ok(merged)) => Some(merged),
        Some(Err(e)) => {
            failure.get_or_insert(StageFailure {
                stage: Stage::Merge,
                code: e.code().to_string(),
                message: e.to_string(),
                domain: None,
            });
            None
        }
        None => None,
    };

    let success = validation.ok && failure.is_none() && merge.is_some();

    PipelineReport {
        generated_at: Utc::now(),
        root: ctx.root.clone(),
        success,
        failure,
        warnings,
        validation,
        merge,
        queries,
        constraints,
        violation_preview: ctx.config.pipeline.violation_preview,
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation report for {}", self.root.display())?;

        // ====================================================================
        // Syntax
        // ====================================================================

        writeln!(f, "\n== Syntax validation ==")?;
        for outcome in &self.validation.outcomes {
            if outcome.valid {
                writeln!(
                    f,
                    "  OK    {:<12} {:>8} triples  {:>9.2} ms",
                    outcome.domain,
                    outcome.triple_count,
                    ms(&outcome.elapsed)
                )?;
            } else {
                writeln!(
                    f,
                    "  FAIL  {:<12} {}",
                    outcome.domain,
                    outcome.error.as_deref().unwrap_or("invalid")
                )?;
            }
        }
        let totals = &self.validation.totals;
        writeln!(
            f,
            "  Total: {} files, {} triples in {:.2} ms",
            totals.files,
            totals.triples,
            ms(&totals.elapsed)
        )?;

        // ====================================================================
        // Merge
        // ====================================================================

        writeln!(f, "\n== Merge ==")?;
        match &self.merge {
            Some(merged) => writeln!(
                f,
                "  {} triples from {} domains -> {} ({:.2} ms)",
                merged.triple_count,
                merged.domains.len(),
                merged.artifact.display(),
                ms(&merged.elapsed)
            )?,
            None => writeln!(f, "  not completed")?,
        }

        // ====================================================================
        // Queries
        // ====================================================================

        if !self.queries.is_empty() {
            writeln!(f, "\n== Queries ==")?;
            for query in &self.queries {
                match &query.error {
                    None => {
                        writeln!(
                            f,
                            "  {}: {} rows ({:.2} ms)",
                            query.name,
                            query.row_count,
                            ms(&query.elapsed)
                        )?;
                        for row in &query.rows {
                            writeln!(f, "    {row}")?;
                        }
                    }
                    Some(error) => writeln!(f, "  {}: ERROR {}", query.name, error)?,
                }
            }
        }

        // ====================================================================
        // Constraints
        // ====================================================================

        if !self.constraints.is_empty() {
            writeln!(f, "\n== Constraints ==")?;
            for report in &self.constraints {
                let label = format!(
                    "{} -> {}",
                    report.data_file.display(),
                    report.shape_file.display()
                );
                if let Some(error) = &report.error {
                    writeln!(f, "  {label}: ERROR {error}")?;
                } else if report.conforms {
                    writeln!(f, "  {label}: conforms ({:.2} ms)", ms(&report.elapsed))?;
                } else {
                    writeln!(
                        f,
                        "  {label}: {} violations ({:.2} ms)",
                        report.violation_count,
                        ms(&report.elapsed)
                    )?;
                    for violation in report.violations.iter().take(self.violation_preview) {
                        writeln!(f, "    {violation}")?;
                    }
                    let hidden = report.violation_count.saturating_sub(self.violation_preview);
                    if hidden > 0 {
                        writeln!(f, "    ... and {hidden} more")?;
                    }
                }
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f, "\n== Warnings ==")?;
            for warning in &self.warnings {
                writeln!(f, "  [{}] {}", warning.stage, warning.message)?;
            }
        }

        writeln!(f)?;
        match (&self.failure, self.success) {
            (_, true) => write!(f, "Result: SUCCESS"),
            (Some(failure), false) => write!(
                f,
                "Result: FAILED at {} stage: {}",
                failure.stage, failure.message
            ),
            (None, false) => write!(f, "Result: FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArtifactFormat, Config};
    use crate::graph::{Severity, Violation};
    use crate::pipeline::syntax::{ValidationOutcome, ValidationTotals};

    fn ctx() -> Context {
        let mut config = Config::default();
        config.pipeline.violation_preview = 1;
        Context::new("/data/pim", config)
    }

    fn outcome(domain: &str, valid: bool) -> ValidationOutcome {
        ValidationOutcome {
            domain: domain.to_string(),
            path: PathBuf::from(format!("/data/pim/{domain}.ttl")),
            triple_count: if valid { 10 } else { 0 },
            elapsed: Duration::from_micros(1500),
            valid,
            error: (!valid).then(|| "Syntax error in tasks.ttl: bad token".to_string()),
            error_code: (!valid).then_some("SYNTAX_ERROR"),
        }
    }

    fn syntax(outcomes: Vec<ValidationOutcome>) -> SyntaxReport {
        let ok = outcomes.iter().all(|o| o.valid);
        SyntaxReport {
            totals: ValidationTotals {
                files: outcomes.iter().filter(|o| o.valid).count(),
                triples: outcomes.iter().map(|o| o.triple_count).sum(),
                elapsed: Duration::from_millis(2),
            },
            outcomes,
            warnings: vec![Warning::new(Stage::Syntax, "Optional domain 'notes' not found")],
            ok,
        }
    }

    fn merged() -> MergedGraph {
        MergedGraph {
            artifact: PathBuf::from("/data/pim/build/merged.ttl"),
            format: ArtifactFormat::Turtle,
            triple_count: 10,
            domains: vec!["base".to_string()],
            elapsed: Duration::from_millis(1),
        }
    }

    fn violation() -> Violation {
        Violation {
            focus_node: "<urn:n1>".to_string(),
            path: None,
            value: None,
            component: "MinCount".to_string(),
            severity: Severity::Violation,
            message: "missing title".to_string(),
        }
    }

    fn non_conforming(count: usize) -> ConstraintReport {
        ConstraintReport {
            data_file: PathBuf::from("notes.ttl"),
            shape_file: PathBuf::from("shapes/notes-shapes.ttl"),
            description: String::new(),
            conforms: false,
            violation_count: count,
            violations: vec![violation(); count],
            elapsed: Duration::from_millis(3),
            error: None,
        }
    }

    fn failed_query() -> QueryResult {
        QueryResult {
            name: "broken".to_string(),
            row_count: 0,
            elapsed: Duration::ZERO,
            variables: Vec::new(),
            rows: Vec::new(),
            error: Some("Query execution error: parse".to_string()),
        }
    }

    #[test]
    fn test_success_ignores_queries_and_constraints() {
        let report = aggregate(
            &ctx(),
            syntax(vec![outcome("base", true)]),
            Some(Ok(merged())),
            vec![failed_query()],
            vec![non_conforming(2)],
            Vec::new(),
        );
        assert!(report.success);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.non_conforming().count(), 1);
        assert_eq!(report.failed_queries().count(), 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_syntax_failure() {
        let report = aggregate(
            &ctx(),
            syntax(vec![outcome("base", true), outcome("tasks", false)]),
            None,
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert!(!report.success);
        assert_eq!(report.exit_code(), 1);
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.stage, Stage::Syntax);
        assert_eq!(failure.domain.as_deref(), Some("tasks"));
        assert!(report.merge.is_none());
    }

    #[test]
    fn test_merge_failure() {
        let report = aggregate(
            &ctx(),
            syntax(vec![outcome("base", true)]),
            Some(Err(AppError::MergeConsistency {
                expected: 10,
                actual: 9,
            })),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert!(!report.success);
        let failure = report.failure.unwrap();
        assert_eq!(failure.stage, Stage::Merge);
        assert_eq!(failure.code, "MERGE_CONSISTENCY_ERROR");
    }

    #[test]
    fn test_json_shape() {
        let report = aggregate(
            &ctx(),
            syntax(vec![outcome("base", true)]),
            Some(Ok(merged())),
            Vec::new(),
            vec![non_conforming(1)],
            Vec::new(),
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["success"], true);
        assert!(json.get("failure").is_none());
        assert!(json.get("violation_preview").is_none());
        assert_eq!(json["validation"]["outcomes"][0]["elapsed_ms"], 1.5);
        assert_eq!(json["validation"]["totals"]["triples"], 10);
        assert_eq!(json["merge"]["format"], "turtle");
        assert_eq!(json["constraints"][0]["violations"][0]["severity"], "violation");
        assert_eq!(json["warnings"][0]["stage"], "syntax");
    }

    #[test]
    fn test_text_limits_violations() {
        let report = aggregate(
            &ctx(),
            syntax(vec![outcome("base", true)]),
            Some(Ok(merged())),
            Vec::new(),
            vec![non_conforming(3)],
            Vec::new(),
        );
        let text = report.to_string();

        assert!(text.contains("notes.ttl -> shapes/notes-shapes.ttl: 3 violations"));
        assert_eq!(text.matches("missing title").count(), 1);
        assert!(text.contains("... and 2 more"));
        assert!(text.contains("[syntax] Optional domain 'notes' not found"));
        assert!(text.ends_with("Result: SUCCESS"));
    }

    #[test]
    fn test_text_names_failed_stage() {
        let report = aggregate(
            &ctx(),
            syntax(vec![outcome("base", true), outcome("tasks", false)]),
            None,
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let text = report.to_string();
        assert!(text.contains("FAIL  tasks"));
        assert!(text.contains("not completed"));
        assert!(text.contains("Result: FAILED at syntax stage: Syntax error in tasks.ttl"));
    }
}

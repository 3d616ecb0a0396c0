//! Structural constraint stage.
//!
//! Every mapping is checked, whatever the outcome of the previous one. A
//! non-conforming mapping is a data-quality finding, not a pipeline failure.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use super::report::{millis, Stage, Warning};
use super::run_engine;
use crate::config::ConstraintMapping;
use crate::context::Context;
use crate::graph::Violation;

/// Result of checking one mapping.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintReport {
    pub data_file: PathBuf,
    pub shape_file: PathBuf,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub conforms: bool,
    pub violation_count: usize,
    pub violations: Vec<Violation>,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Duration,
    /// The engine could not produce a verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConstraintReport {
    fn new(mapping: &ConstraintMapping) -> Self {
        Self {
            data_file: mapping.data_file.clone(),
            shape_file: mapping.shape_file.clone(),
            description: mapping.description.clone(),
            conforms: false,
            violation_count: 0,
            violations: Vec::new(),
            elapsed: Duration::ZERO,
            error: None,
        }
    }
}

/// Checks each mapping whose data and shapes files both exist.
///
/// Mappings with a missing file are skipped with a warning. Engine errors are
/// recorded on the mapping's report as non-conforming.
pub async fn check_constraints(
    ctx: &Context,
    mappings: &[ConstraintMapping],
) -> (Vec<ConstraintReport>, Vec<Warning>) {
    let timeout = ctx.config.pipeline.engine_timeout_secs;
    let mut reports = Vec::new();
    let mut warnings = Vec::new();

    for mapping in mappings {
        let data = ctx.resolve(&mapping.data_file);
        let shapes = ctx.resolve(&mapping.shape_file);

        let missing: Vec<_> = [&data, &shapes]
            .into_iter()
            .filter(|p| !p.is_file())
            .map(|p| p.display().to_string())
            .collect();
        if !missing.is_empty() {
            let warning = Warning::new(
                Stage::Constraints,
                format!(
                    "Constraint check {} -> {} skipped, missing {}",
                    mapping.data_file.display(),
                    mapping.shape_file.display(),
                    missing.join(", ")
                ),
            );
            warn!("{}", warning.message);
            warnings.push(warning);
            continue;
        }

        let started = Instant::now();
        let engine = ctx.constraints.clone();
        let operation = format!("constraint check {}", mapping.data_file.display());
        let outcome = run_engine(&operation, timeout, move || engine.check(&data, &shapes)).await;

        let mut report = ConstraintReport::new(mapping);
        report.elapsed = started.elapsed();
        match outcome {
            Ok(outcome) => {
                info!(
                    data = %mapping.data_file.display(),
                    shapes = %mapping.shape_file.display(),
                    conforms = outcome.conforms,
                    violations = outcome.violations.len(),
                    "Constraint check"
                );
                report.conforms = outcome.conforms;
                report.violation_count = outcome.violations.len();
                report.violations = outcome.violations;
            }
            Err(e) => {
                warn!(data = %mapping.data_file.display(), error = %e, "Constraint engine failed");
                report.error = Some(e.to_string());
            }
        }
        reports.push(report);
    }

    (reports, warnings)
}

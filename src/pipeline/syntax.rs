//! Syntax validation stage.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use super::report::{millis, Stage, Warning};
use super::run_engine;
use crate::config::Domain;
use crate::context::Context;
use crate::error::AppError;

/// Per-file result of syntax validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub domain: String,
    pub path: PathBuf,
    pub triple_count: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Duration,
    pub valid: bool,
    /// Present only when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl ValidationOutcome {
    fn valid(domain: &Domain, path: PathBuf, triple_count: usize, elapsed: Duration) -> Self {
        Self {
            domain: domain.name.clone(),
            path,
            triple_count,
            elapsed,
            valid: true,
            error: None,
            error_code: None,
        }
    }

    fn invalid(domain: &Domain, path: PathBuf, error: &AppError, elapsed: Duration) -> Self {
        Self {
            domain: domain.name.clone(),
            path,
            triple_count: 0,
            elapsed,
            valid: false,
            error: Some(error.to_string()),
            error_code: Some(error.code()),
        }
    }
}

/// Totals over the files that parsed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationTotals {
    pub files: usize,
    pub triples: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Duration,
}

/// Output of [`validate_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyntaxReport {
    /// Outcomes in declared domain order, ending at the first invalid one.
    pub outcomes: Vec<ValidationOutcome>,
    pub totals: ValidationTotals,
    #[serde(skip)]
    pub warnings: Vec<Warning>,
    pub ok: bool,
}

impl SyntaxReport {
    /// The first invalid outcome, if the stage halted.
    pub fn failure(&self) -> Option<&ValidationOutcome> {
        self.outcomes.iter().find(|o| !o.valid)
    }
}

/// Result of looking at one domain.
enum Checked {
    Outcome(ValidationOutcome),
    MissingOptional(Warning),
}

async fn check_domain(ctx: &Context, domain: Domain) -> Checked {
    let path = domain.path(&ctx.root);
    let started = Instant::now();

    if !path.is_file() {
        if !domain.required {
            return Checked::MissingOptional(Warning::new(
                Stage::Syntax,
                format!(
                    "Optional domain '{}' not found at {}, excluded from merge",
                    domain.name,
                    path.display()
                ),
            ));
        }
        let err = AppError::MissingRequiredDomain {
            domain: domain.name.clone(),
            path: path.clone(),
        };
        return Checked::Outcome(ValidationOutcome::invalid(
            &domain,
            path,
            &err,
            started.elapsed(),
        ));
    }

    let backend = ctx.backend.clone();
    let target = path.clone();
    let operation = format!("parse {}", domain.name);
    let result = run_engine(
        &operation,
        ctx.config.pipeline.engine_timeout_secs,
        move || backend.parse(&target),
    )
    .await;

    let elapsed = started.elapsed();
    match result {
        Ok(count) => Checked::Outcome(ValidationOutcome::valid(&domain, path, count, elapsed)),
        Err(e) => Checked::Outcome(ValidationOutcome::invalid(&domain, path, &e, elapsed)),
    }
}

/// Validates every domain in declared order.
///
/// Halts at the first invalid file: later domains are not reported, and with
/// `validation_concurrency > 1` no new parse is started once a failure has been
/// seen. A missing optional domain is a warning; a missing required one counts
/// as invalid.
pub async fn validate_all(ctx: &Context, domains: &[Domain]) -> SyntaxReport {
    let started = Instant::now();
    let concurrency = ctx.config.pipeline.validation_concurrency.max(1);

    let mut checks = stream::iter(domains.iter().cloned())
        .map(|domain| check_domain(ctx, domain))
        .buffered(concurrency);

    let mut report = SyntaxReport {
        ok: true,
        ..Default::default()
    };

    while let Some(checked) = checks.next().await {
        match checked {
            Checked::MissingOptional(warning) => {
                warn!("{}", warning.message);
                report.warnings.push(warning);
            }
            Checked::Outcome(outcome) if outcome.valid => {
                info!(
                    domain = %outcome.domain,
                    triples = outcome.triple_count,
                    elapsed_ms = outcome.elapsed.as_secs_f64() * 1000.0,
                    "Valid"
                );
                report.totals.files += 1;
                report.totals.triples += outcome.triple_count;
                report.outcomes.push(outcome);
            }
            Checked::Outcome(outcome) => {
                warn!(
                    domain = %outcome.domain,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "Invalid, halting syntax validation"
                );
                report.outcomes.push(outcome);
                report.ok = false;
                break;
            }
        }
    }

    report.totals.elapsed = started.elapsed();
    info!(
        files = report.totals.files,
        triples = report.totals.triples,
        "Syntax validation {}",
        if report.ok { "passed" } else { "failed" }
    );
    report
}

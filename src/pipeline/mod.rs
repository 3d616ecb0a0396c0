//! The validation pipeline.
//!
//! Stages run top to bottom, each consuming the previous stage's output:
//!
//! 1. [`syntax`] - Parse every domain file, halting on the first failure
//! 2. [`merge`] - Union the valid files in declared order and write the artifact
//! 3. [`queries`] - Advisory smoke-test queries against the artifact
//! 4. [`constraints`] - Shape checks per mapping, accumulating every result
//!
//! Stages 3 and 4 only read finished files, so they run concurrently.
//! [`report`] folds everything into a single [`PipelineReport`].

pub mod constraints;
pub mod merge;
pub mod queries;
pub mod report;
pub mod syntax;

use std::time::Duration;

use tracing::{error, info};

use crate::context::Context;
use crate::error::AppError;

pub use constraints::ConstraintReport;
pub use merge::MergedGraph;
pub use queries::{NamedQuery, QueryResult};
pub use report::{PipelineReport, Stage, StageFailure, Warning};
pub use syntax::{SyntaxReport, ValidationOutcome, ValidationTotals};

/// Runs a blocking engine call on the blocking pool, bounded by `timeout_secs`.
///
/// A call that runs past the deadline is reported as [`AppError::Timeout`]; the
/// blocking thread itself is left to finish on its own.
pub async fn run_engine<T, F>(operation: &str, timeout_secs: u64, f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    match tokio::time::timeout(Duration::from_secs(timeout_secs), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(AppError::Internal(format!(
            "{operation} did not complete: {join_error}"
        ))),
        Err(_) => Err(AppError::Timeout {
            operation: operation.to_string(),
            seconds: timeout_secs,
        }),
    }
}

/// One pipeline invocation over a [`Context`].
pub struct Pipeline {
    ctx: Context,
}

impl Pipeline {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Runs every stage and returns the aggregated report.
    ///
    /// Never fails: stage errors end up in the report.
    pub async fn run(&self) -> PipelineReport {
        let ctx = &self.ctx;
        info!(root = %ctx.root.display(), domains = ctx.config.domains.len(), "Starting pipeline");

        let syntax = syntax::validate_all(ctx, &ctx.config.domains).await;
        if !syntax.ok {
            error!("Syntax validation failed, skipping merge");
            return report::aggregate(ctx, syntax, None, Vec::new(), Vec::new(), Vec::new());
        }

        let merged = match merge::merge_validated(ctx, &syntax.outcomes).await {
            Ok(merged) => merged,
            Err(e) => {
                error!(error = %e, "Merge failed");
                return report::aggregate(
                    ctx,
                    syntax,
                    Some(Err(e)),
                    Vec::new(),
                    Vec::new(),
                    Vec::new(),
                );
            }
        };

        let (named, mut warnings) = queries::load_named_queries(ctx);
        let (query_results, (constraint_reports, constraint_warnings)) = tokio::join!(
            queries::run_queries(ctx, &merged.artifact, &named),
            constraints::check_constraints(ctx, &ctx.config.constraints),
        );
        warnings.extend(constraint_warnings);

        report::aggregate(
            ctx,
            syntax,
            Some(Ok(merged)),
            query_results,
            constraint_reports,
            warnings,
        )
    }
}

//! Merge stage.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use super::report::millis;
use super::run_engine;
use super::syntax::ValidationOutcome;
use crate::config::ArtifactFormat;
use crate::context::Context;
use crate::error::AppError;
use crate::graph::GraphBuffer;

/// Summary of the merged graph and its artifact.
#[derive(Debug, Clone, Serialize)]
pub struct MergedGraph {
    pub artifact: PathBuf,
    pub format: ArtifactFormat,
    pub triple_count: usize,
    /// Contributing domains, in merge order.
    pub domains: Vec<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Duration,
}

/// Merges every valid outcome in order, writes the artifact and checks it.
///
/// The artifact is re-parsed after writing; its triple count must equal the
/// sum of the per-domain counts from syntax validation, otherwise the stage
/// fails with [`AppError::MergeConsistency`].
pub async fn merge_validated(
    ctx: &Context,
    outcomes: &[ValidationOutcome],
) -> Result<MergedGraph, AppError> {
    let started = Instant::now();
    let timeout = ctx.config.pipeline.engine_timeout_secs;
    let format = ctx.config.pipeline.format;
    let artifact = ctx.artifact_path();

    let mut graph = GraphBuffer::new();
    let mut domains = Vec::new();
    let mut expected = 0;

    for outcome in outcomes.iter().filter(|o| o.valid) {
        let backend = ctx.backend.clone();
        let source = outcome.domain.clone();
        let path = outcome.path.clone();
        graph = run_engine(&format!("merge {}", outcome.domain), timeout, move || {
            backend.merge(graph, &source, &path)
        })
        .await?;
        debug!(domain = %outcome.domain, total = graph.len(), "Merged");

        expected += outcome.triple_count;
        domains.push(outcome.domain.clone());
    }

    if graph.len() != expected {
        return Err(AppError::MergeConsistency {
            expected,
            actual: graph.len(),
        });
    }

    let backend = ctx.backend.clone();
    let target = artifact.clone();
    let actual = run_engine("serialize merge artifact", timeout, move || {
        backend.serialize(&graph, &target, format)?;
        backend.parse(&target)
    })
    .await?;

    if actual != expected {
        return Err(AppError::MergeConsistency { expected, actual });
    }

    info!(
        artifact = %artifact.display(),
        triples = actual,
        domains = domains.len(),
        "Merge complete"
    );

    Ok(MergedGraph {
        artifact,
        format,
        triple_count: actual,
        domains,
        elapsed: started.elapsed(),
    })
}

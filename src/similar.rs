//! Similarity ranking against a reference workflow.
//!
//! `combined = 0.5 * integrations + 0.3 * node count + 0.2 * trigger`, where
//! integration similarity is the Jaccard index of the two integration sets,
//! node-count similarity is `1 - |a - b| / max(a, b)` and trigger similarity
//! is `1.0` for equal trigger types and `0.5` otherwise.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::error::{IndexError, Result};
use crate::models::WorkflowRecord;
use crate::store::Store;

pub const MAX_SIMILAR: usize = 20;

const INTEGRATION_WEIGHT: f64 = 0.5;
const NODE_COUNT_WEIGHT: f64 = 0.3;
const TRIGGER_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Serialize)]
pub struct SimilarWorkflow {
    pub workflow: WorkflowRecord,
    pub score: f64,
    pub integration_similarity: f64,
    pub node_count_similarity: f64,
    pub trigger_similarity: f64,
    pub shared_integrations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarResponse {
    pub reference: String,
    pub threshold: f64,
    pub results: Vec<SimilarWorkflow>,
    /// Every candidate at or above the threshold, not just those returned.
    pub total: u64,
}

/// Rank every other workflow by similarity to `filename`.
pub async fn find_similar(store: &dyn Store, filename: &str, threshold: f64) -> Result<SimilarResponse> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(IndexError::validation(
            "threshold",
            format!("must be in [0, 1], got {}", threshold),
        ));
    }

    let reference = store
        .fetch(filename)
        .await?
        .ok_or_else(|| IndexError::not_found("workflow", filename))?;

    let mut results: Vec<SimilarWorkflow> = store
        .all()
        .await?
        .into_iter()
        .filter(|candidate| candidate.filename != reference.filename)
        .map(|candidate| score(&reference, candidate))
        .filter(|s| s.score >= threshold)
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.workflow.filename.cmp(&b.workflow.filename))
    });

    let total = results.len() as u64;
    results.truncate(MAX_SIMILAR);

    Ok(SimilarResponse {
        reference: reference.filename,
        threshold,
        results,
        total,
    })
}

fn score(reference: &WorkflowRecord, candidate: WorkflowRecord) -> SimilarWorkflow {
    let shared: Vec<String> = reference
        .integrations
        .intersection(&candidate.integrations)
        .cloned()
        .collect();
    let integration_similarity = jaccard(&reference.integrations, &candidate.integrations);
    let node_count_similarity = node_count_similarity(reference.node_count, candidate.node_count);
    let trigger_similarity = if reference.trigger_type == candidate.trigger_type {
        1.0
    } else {
        0.5
    };

    SimilarWorkflow {
        score: INTEGRATION_WEIGHT * integration_similarity
            + NODE_COUNT_WEIGHT * node_count_similarity
            + TRIGGER_WEIGHT * trigger_similarity,
        integration_similarity,
        node_count_similarity,
        trigger_similarity,
        shared_integrations: shared,
        workflow: candidate,
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Zero when both counts are zero.
fn node_count_similarity(a: u32, b: u32) -> f64 {
    let max = a.max(b);
    if max == 0 {
        return 0.0;
    }
    1.0 - f64::from(a.abs_diff(b)) / f64::from(max)
}

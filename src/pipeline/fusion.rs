//! Rank Fusion with Reciprocal Rank Fusion (RRF)
//!
//! Merges the ranked lists retrieved for each expanded query into one
//! global ranking. Raw similarity scores from different queries are not
//! comparable, so fusion is rank-based rather than score-based.
//!
//! ## RRF Formula
//!
//! For each document `d`, the fused score is:
//!
//! ```text
//! score(d) = Σ 1 / (k + rank_i(d))
//! ```
//!
//! where `k` is a constant (default 60) and `rank_i(d)` is the 1-based rank
//! of `d` in list `i`. Documents absent from a list receive no contribution
//! from it (rather than a penalty). Documents sharing an id are merged with
//! their contributions summed; score sums are permutation-invariant, so the
//! order in which lists are submitted never changes the ranking.
//!
//! ## Tie-Breaking
//!
//! Results with equal fused scores keep first-seen order (by document
//! identity across the submitted lists), which makes the output stable for
//! a fixed input.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use ragline_core::document::{Document, RankedList};

/// Conventional RRF smoothing constant: large enough to avoid first-rank
/// domination, small enough that rank differences still matter.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// A single ranked list's contribution to a fused document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContribution {
    /// Index of the expanded query whose list contributed.
    pub query_index: usize,
    /// The 1-based rank within that list.
    pub rank: usize,
    /// The RRF score contribution: `1.0 / (k + rank)`.
    pub rrf_contribution: f64,
}

/// A document after RRF fusion, annotated rather than mutated: the original
/// `Document` is kept intact and fusion/rerank state lives alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedDocument {
    /// The retrieved document (instance kept is the first seen among
    /// duplicates).
    pub document: Document,
    /// Combined RRF score across all lists.
    pub score: f64,
    /// Provenance: which lists contributed and at what rank.
    pub contributions: Vec<SourceContribution>,
    /// Score assigned by the reranker stage, when it ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranked_score: Option<f32>,
}

/// Accumulator used during fusion to aggregate scores across lists.
struct FusionAccumulator {
    document: Document,
    score: f64,
    contributions: Vec<SourceContribution>,
    first_seen: usize,
}

/// Fuse ranked lists into one globally ranked list using RRF.
///
/// Empty input fuses to an empty output; a single input list degenerates to
/// that list's original order.
pub fn fuse(lists: &[RankedList], k: f64) -> Vec<FusedDocument> {
    let mut by_id: HashMap<String, FusionAccumulator> = HashMap::new();

    for (query_index, list) in lists.iter().enumerate() {
        for (idx, doc) in list.iter().enumerate() {
            let rank = idx + 1;
            let rrf_contribution = 1.0 / (k + rank as f64);

            let next_seen = by_id.len();
            let acc = by_id
                .entry(doc.id.clone())
                .or_insert_with(|| FusionAccumulator {
                    document: doc.clone(),
                    score: 0.0,
                    contributions: Vec::new(),
                    first_seen: next_seen,
                });

            acc.score += rrf_contribution;
            acc.contributions.push(SourceContribution {
                query_index,
                rank,
                rrf_contribution,
            });
        }
    }

    let mut fused: Vec<FusionAccumulator> = by_id.into_values().collect();
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });

    fused
        .into_iter()
        .map(|acc| FusedDocument {
            document: acc.document,
            score: acc.score,
            contributions: acc.contributions,
            reranked_score: None,
        })
        .collect()
}

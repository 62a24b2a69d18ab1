//! Reciprocal Rank Fusion (RRF) for combining search results.

use std::collections::{BTreeMap, HashMap, HashSet};

use esfuse_core::{FusedResult, Hit, RankedList, Result};

/// RRF constant (commonly 60).
/// Higher values give more weight to lower-ranked results.
pub const DEFAULT_RRF_K: u32 = 60;

/// Score column of the text-only list.
pub const TEXT_SCORE_COLUMN: &str = "text_score";

/// Score column of the combined vector-only list.
pub const VECTOR_SCORE_COLUMN: &str = "vector_score";

/// A ranked list and the column its contributions are recorded under.
#[derive(Debug, Clone)]
pub struct ScoredList {
    pub column: String,
    pub hits: RankedList,
}

impl ScoredList {
    pub fn new(column: impl Into<String>, hits: RankedList) -> Self {
        Self {
            column: column.into(),
            hits,
        }
    }
}

/// RRF contribution of a 1-based rank.
pub fn rrf_contribution(rank: usize, k: u32) -> f64 {
    1.0 / (rank as f64 + f64::from(k))
}

/// Positions of `hits` ordered by descending backend score.
///
/// The sort is stable, so equal scores keep backend order.
fn rank_order(hits: &[Hit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..hits.len()).collect();
    order.sort_by(|&a, &b| hits[b].score.total_cmp(&hits[a].score));
    order
}

/// Per-hit RRF contributions, returned in input order.
///
/// Rank 1 goes to the highest backend score and yields `1 / (1 + k)`.
pub fn rank_scores(hits: &[Hit], k: u32) -> Vec<f64> {
    let mut scores = vec![0.0; hits.len()];
    for (position, idx) in rank_order(hits).into_iter().enumerate() {
        scores[idx] = rrf_contribution(position + 1, k);
    }
    scores
}

/// Fuse ranked lists using Reciprocal Rank Fusion.
///
/// RRF score = Σ (1 / (k + rank_i)) for each list the product appears in.
///
/// Hits are joined on the product identifier read from `id_field` of their
/// source. Every result carries one score per input column, 0 for lists
/// that did not return the product. When a product occurs several times in
/// one list only its best rank counts. Doc id and source come from the
/// first list that returned the product.
///
/// # Arguments
/// * `lists` - Ranked lists in join order
/// * `id_field` - Source field holding the product identifier
/// * `k` - RRF constant
/// * `limit` - Maximum number of results to return
///
/// # Returns
/// Fused results sorted by `rrf_score` descending; ties keep first-seen order.
pub fn reciprocal_rank_fusion(
    lists: Vec<ScoredList>,
    id_field: &str,
    k: u32,
    limit: usize,
) -> Result<Vec<FusedResult>> {
    let empty_scores: BTreeMap<String, f64> =
        lists.iter().map(|l| (l.column.clone(), 0.0)).collect();

    let mut fused: Vec<FusedResult> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for list in lists {
        let mut seen: HashSet<String> = HashSet::new();

        for (position, idx) in rank_order(&list.hits).into_iter().enumerate() {
            let hit = &list.hits[idx];
            let product_id = hit.product_id(id_field)?;
            if !seen.insert(product_id.clone()) {
                continue;
            }

            let slot = match slots.get(&product_id) {
                Some(&slot) => slot,
                None => {
                    fused.push(FusedResult {
                        product_id: product_id.clone(),
                        doc_id: hit.id.clone(),
                        scores: empty_scores.clone(),
                        rrf_score: 0.0,
                        source: hit.source.clone(),
                    });
                    slots.insert(product_id, fused.len() - 1);
                    fused.len() - 1
                }
            };

            fused[slot]
                .scores
                .insert(list.column.clone(), rrf_contribution(position + 1, k));
        }
    }

    for result in &mut fused {
        result.rrf_score = result.scores.values().sum();
    }

    // Sort by score descending
    fused.sort_by(|a, b| b.rrf_score.total_cmp(&a.rrf_score));

    // Take top k
    fused.truncate(limit);

    Ok(fused)
}

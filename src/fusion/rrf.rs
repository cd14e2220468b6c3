//! Weighted reciprocal rank fusion.
//!
//! # Algorithm
//!
//! ```text
//! score(url) = Σ  weight_i / (k + rank_i)      rank is 1-based
//!              i
//! ```
//!
//! Results are identified by their trimmed URL without trailing slashes.
//! For each URL the first result seen is kept, unless a later duplicate
//! carries strictly longer content. Ties in the final score keep the order
//! in which URLs were first discovered (list by list, rank by rank).

use std::collections::HashMap;

use crate::config::{DEFAULT_LIMIT, DEFAULT_RRF_K};
use crate::error::{FusionError, Result};
use crate::types::SearchResult;

/// Weight of a list when none is given for it.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Fusion parameters with the conventional defaults `k = 60`, `limit = 50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RrfFuser {
    /// Smoothing constant; larger values flatten the gap between ranks.
    pub k: u32,
    /// Maximum number of fused results.
    pub limit: usize,
}

impl Default for RrfFuser {
    fn default() -> Self {
        Self {
            k: DEFAULT_RRF_K,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RrfFuser {
    /// Fuser with explicit parameters.
    pub fn new(k: u32, limit: usize) -> Self {
        Self { k, limit }
    }

    /// Fuse `ranked_lists`; see [`fuse`].
    ///
    /// # Errors
    ///
    /// Same as [`fuse`].
    pub fn fuse(
        &self,
        ranked_lists: &[Vec<SearchResult>],
        weights: Option<&[f64]>,
    ) -> Result<Vec<SearchResult>> {
        fuse(ranked_lists, weights, self.k, self.limit)
    }
}

/// Running state for one URL during fusion.
struct Entry<'a> {
    score: f64,
    best: &'a SearchResult,
}

/// Merge ranked lists into one deduplicated ranking.
///
/// - No lists: empty output.
/// - One list: that list truncated to `limit`, unscored.
/// - Otherwise every result with a non-empty identity earns
///   `weight / (k + rank)`; missing weights default to 1.0. The output is
///   sorted by total score and truncated to `limit`, with the score,
///   rounded to six decimals, written to [`SearchResult::rrf_score`].
///
/// # Errors
///
/// Returns [`FusionError::InvalidInput`] if any weight is negative or not
/// finite.
pub fn fuse(
    ranked_lists: &[Vec<SearchResult>],
    weights: Option<&[f64]>,
    k: u32,
    limit: usize,
) -> Result<Vec<SearchResult>> {
    if let Some(weights) = weights {
        validate_weights(weights)?;
    }

    match ranked_lists {
        [] => return Ok(Vec::new()),
        [only] => return Ok(only.iter().take(limit).cloned().collect()),
        _ => {}
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<Entry<'_>> = Vec::new();

    for (list_idx, list) in ranked_lists.iter().enumerate() {
        let weight = weights
            .and_then(|w| w.get(list_idx).copied())
            .unwrap_or(DEFAULT_WEIGHT);

        for (position, result) in list.iter().enumerate() {
            let key = result.identity_key();
            if key.is_empty() {
                continue;
            }
            let contribution = weight / (f64::from(k) + (position + 1) as f64);

            match index.get(key).copied() {
                Some(slot) => {
                    let entry = &mut entries[slot];
                    entry.score += contribution;
                    if result.content_len() > entry.best.content_len() {
                        entry.best = result;
                    }
                }
                None => {
                    index.insert(key, entries.len());
                    entries.push(Entry {
                        score: contribution,
                        best: result,
                    });
                }
            }
        }
    }

    // Stable: equal scores stay in discovery order.
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let fused: Vec<SearchResult> = entries
        .into_iter()
        .take(limit)
        .map(|entry| {
            let mut result = entry.best.clone();
            result.rrf_score = Some(round6(entry.score));
            result
        })
        .collect();

    tracing::debug!(
        lists = ranked_lists.len(),
        items = ranked_lists.iter().map(Vec::len).sum::<usize>(),
        fused = fused.len(),
        "rrf fusion complete"
    );
    Ok(fused)
}

fn validate_weights(weights: &[f64]) -> Result<()> {
    match weights
        .iter()
        .position(|w| !w.is_finite() || *w < 0.0)
    {
        Some(i) => Err(FusionError::InvalidInput(format!(
            "weight {i} must be a finite, non-negative number"
        ))),
        None => Ok(()),
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

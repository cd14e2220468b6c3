//! Rule-based query rewriting.
//!
//! Turns one raw query into up to five search variants. Four independent
//! strategies run on the trimmed original, never on each other's output:
//!
//! 1. stopword cleaning
//! 2. time anchoring ("今天" → "10月16日")
//! 3. hotword injection from the [`HotwordCache`]
//! 4. synonym expansion
//!
//! The original query always comes first; duplicates are dropped keeping
//! the first occurrence.

pub mod hotwords;
pub mod rules;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::config::MAX_VARIANTS;

pub use hotwords::{
    start_http_refresher, HotwordCache, HotwordRefresher, HotwordSource, HotwordStatus,
    HttpHotwordSource, RefresherHandle,
};

/// A cleaned variant shorter than this is not worth searching.
const MIN_CLEANED_CHARS: usize = 2;

/// Expands queries into search variants.
#[derive(Debug, Clone)]
pub struct QueryRewriter {
    hotwords: Arc<HotwordCache>,
    max_variants: usize,
}

impl QueryRewriter {
    /// A rewriter reading hotwords from `hotwords`.
    pub fn new(hotwords: Arc<HotwordCache>) -> Self {
        Self {
            hotwords,
            max_variants: MAX_VARIANTS,
        }
    }

    /// A rewriter with an empty, unconfigured hotword cache.
    pub fn without_hotwords() -> Self {
        Self::new(Arc::new(HotwordCache::default()))
    }

    /// Cap the number of variants, within `1..=5`.
    pub fn with_max_variants(mut self, max_variants: usize) -> Self {
        self.max_variants = max_variants.clamp(1, MAX_VARIANTS);
        self
    }

    /// The hotword cache this rewriter reads.
    pub fn hotwords(&self) -> &Arc<HotwordCache> {
        &self.hotwords
    }

    /// Rewrite `query`, anchoring time phrases to the local date.
    pub fn rewrite(&self, query: &str) -> Vec<String> {
        self.rewrite_on(query, Local::now().date_naive())
    }

    /// Rewrite `query` with time phrases anchored to `today`.
    ///
    /// Returns an empty list for empty or blank input; otherwise the
    /// trimmed query followed by its distinct variants, at most five in
    /// total.
    pub fn rewrite_on(&self, query: &str, today: NaiveDate) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        tracing::trace!(query, "rewriting query");

        let mut candidates = vec![query.to_owned()];

        let cleaned = rules::remove_stopwords(query);
        if cleaned != query && cleaned.chars().count() >= MIN_CLEANED_CHARS {
            candidates.push(cleaned);
        }

        candidates.extend(rules::time_anchor_variants(query, today));
        candidates.extend(hotwords::hotword_variants(query, &self.hotwords.snapshot()));
        candidates.extend(rules::synonym_variants(query));

        let variants = dedup_variants(candidates, self.max_variants);
        tracing::debug!(count = variants.len(), "query variants generated");
        variants
    }
}

impl Default for QueryRewriter {
    fn default() -> Self {
        Self::without_hotwords()
    }
}

/// Trim, drop empties and duplicates (first occurrence wins), truncate.
fn dedup_variants(candidates: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty() && seen.insert(c.clone()))
        .take(max)
        .collect()
}

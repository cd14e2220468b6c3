//! # searx-fusion
//!
//! Query rewriting, multi-query fusion and freshness scoring for a
//! metasearch aggregator.
//!
//! The aggregator owns its engines and exposes them through
//! [`SearchBackend`]. This crate turns one user query into several
//! variants, searches them all, fuses the ranked lists with weighted
//! reciprocal rank fusion and nudges recent results upward.
//!
//! ## Design
//!
//! - Rule-based rewriting: stopword cleaning, time anchoring, hotword
//!   injection and synonym expansion, at most five variants
//! - Hotwords come from an optional HTTP source, refreshed by a background
//!   task into a shared cache
//! - Variants are searched concurrently; a failing variant is dropped, not fatal
//! - Freshness bonus decays piecewise-linearly from 0.5 to 0 over 30 days
//! - Optional cross-encoder reranking over HTTP as the last stage
//!
//! ## Logging
//!
//! Query text is logged only at trace level.

pub mod backend;
pub mod config;
pub mod error;
pub mod freshness;
pub mod fusion;
pub mod http;
pub mod pipeline;
pub mod rerank;
pub mod rewrite;
pub mod types;

pub use backend::SearchBackend;
pub use config::{FusionConfig, HotwordConfig, RerankConfig, SearchOptions};
pub use error::{FusionError, Result};
pub use freshness::{
    apply_freshness, compute_time_relevance, time_bonus, time_bonus_now, PublishedDate,
};
pub use fusion::{fuse, multi_query_search, RrfFuser};
pub use pipeline::FusionSearch;
pub use rerank::{RerankClient, RerankHealth, RerankHit, RerankResponse};
pub use rewrite::{HotwordCache, HotwordStatus, QueryRewriter};
pub use types::SearchResult;

/// Rewrite `query` with a hotword-free rewriter.
///
/// Convenience wrapper around [`QueryRewriter::rewrite`].
///
/// # Examples
///
/// ```
/// let variants = searx_fusion::rewrite_query("rust async");
/// assert_eq!(variants, vec!["rust async".to_string()]);
/// ```
pub fn rewrite_query(query: &str) -> Vec<String> {
    QueryRewriter::default().rewrite(query)
}

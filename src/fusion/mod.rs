//! Result fusion: reciprocal rank fusion and multi-query search.
//!
//! [`multi_query_search`] fans a set of query variants out to a
//! [`SearchBackend`](crate::backend::SearchBackend) and hands the ranked
//! lists to [`fuse`], which merges them into one deduplicated ranking.

pub mod multi_query;
pub mod rrf;

pub use multi_query::{multi_query_search, variant_weight};
pub use rrf::{fuse, RrfFuser, DEFAULT_WEIGHT};

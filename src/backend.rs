//! Trait definition for caller-supplied search backends.
//!
//! The aggregator owns the actual engines. It hands this crate an
//! implementation of [`SearchBackend`] and the multi-query search calls it
//! once per query variant.

use crate::config::SearchOptions;
use crate::error::FusionError;
use crate::types::SearchResult;

/// A search backend invoked once per query variant.
///
/// Implementations may fail; a failing variant is logged and dropped by
/// [`multi_query_search`](crate::fusion::multi_query_search) while its
/// siblings continue. All implementations must be `Send + Sync` because
/// variants are searched concurrently.
pub trait SearchBackend: Send + Sync {
    /// Run one search and return the ranked results, best first.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError`] (usually [`FusionError::Backend`]) when the
    /// underlying engines fail.
    fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, FusionError>> + Send;
}

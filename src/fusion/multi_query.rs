//! Multi-query search: one backend call per query variant, fused with RRF.
//!
//! The original query carries weight 1.0; each later variant weighs 0.2
//! less, never below 0.3. Failing or empty variants contribute neither a
//! list nor a weight, so the two stay index-aligned.

use futures::future::join_all;

use crate::backend::SearchBackend;
use crate::config::SearchOptions;
use crate::error::Result;
use crate::types::SearchResult;

use super::rrf::fuse;

/// Weight of the variant at `index` (0 is the original query).
pub fn variant_weight(index: usize) -> f64 {
    if index == 0 {
        1.0
    } else {
        (1.0 - 0.2 * index as f64).max(0.3)
    }
}

/// Search every query variant and fuse the results.
///
/// # Pipeline
///
/// 1. No queries: empty result. One query: a plain backend call, unfused.
/// 2. Fan out all variants concurrently with [`join_all`]; outcomes keep
///    variant order.
/// 3. Log and skip failing variants; skip empty ones.
/// 4. Fuse the surviving lists with [`variant_weight`] weights, using
///    `options.rrf_k` and `options.limit`.
///
/// # Errors
///
/// With a single query, the backend's error is returned as is. With
/// several, variant failures are absorbed and only fusion input errors
/// surface.
pub async fn multi_query_search<B: SearchBackend>(
    backend: &B,
    queries: &[String],
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    match queries {
        [] => return Ok(Vec::new()),
        [only] => return backend.search(only, options).await,
        _ => {}
    }

    let outcomes = join_all(queries.iter().map(|q| backend.search(q, options))).await;

    let mut ranked_lists = Vec::with_capacity(queries.len());
    let mut weights = Vec::with_capacity(queries.len());

    for (index, (query, outcome)) in queries.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(results) if results.is_empty() => {
                tracing::trace!(variant = index, query = %query, "variant returned no results");
            }
            Ok(results) => {
                tracing::debug!(variant = index, count = results.len(), "variant returned results");
                ranked_lists.push(results);
                weights.push(variant_weight(index));
            }
            Err(err) => {
                tracing::warn!(variant = index, error = %err, "variant search failed");
            }
        }
    }

    fuse(&ranked_lists, Some(weights.as_slice()), options.rrf_k, options.limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FusionError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned lists per query; unknown queries fail.
    #[derive(Default)]
    struct ScriptedBackend {
        lists: HashMap<String, Vec<SearchResult>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn with(mut self, query: &str, urls: &[&str]) -> Self {
            let results = urls
                .iter()
                .map(|u| SearchResult {
                    url: u.to_string(),
                    ..Default::default()
                })
                .collect();
            self.lists.insert(query.to_string(), results);
            self
        }
    }

    impl SearchBackend for ScriptedBackend {
        async fn search(
            &self,
            query: &str,
            _options: &SearchOptions,
        ) -> Result<Vec<SearchResult>> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(query.to_string());
            }
            self.lists
                .get(query)
                .cloned()
                .ok_or_else(|| FusionError::Backend(format!("no script for {query}")))
        }
    }

    fn queries(list: &[&str]) -> Vec<String> {
        list.iter().map(|q| q.to_string()).collect()
    }

    #[test]
    fn weight_schedule() {
        assert_eq!(variant_weight(0), 1.0);
        assert!((variant_weight(1) - 0.8).abs() < 1e-12);
        assert!((variant_weight(2) - 0.6).abs() < 1e-12);
        assert!((variant_weight(3) - 0.4).abs() < 1e-12);
        assert!((variant_weight(4) - 0.3).abs() < 1e-12);
        assert!((variant_weight(10) - 0.3).abs() < 1e-12);
    }

    #[tokio::test]
    async fn no_queries_no_calls() {
        let backend = ScriptedBackend::default();
        let results = multi_query_search(&backend, &[], &SearchOptions::default())
            .await
            .expect("search");
        assert!(results.is_empty());
        assert!(backend.seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn single_query_bypasses_fusion() {
        let backend = ScriptedBackend::default().with("q", &["https://a.com", "https://a.com/"]);
        let results = multi_query_search(&backend, &queries(&["q"]), &SearchOptions::default())
            .await
            .expect("search");
        // Unfused: duplicates survive and no RRF score is attached.
        assert_eq!(results.len(), 2);
        assert!(results[0].rrf_score.is_none());
    }

    #[tokio::test]
    async fn single_query_error_propagates() {
        let backend = ScriptedBackend::default();
        let err = multi_query_search(&backend, &queries(&["q"]), &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("backend error"));
    }

    #[tokio::test]
    async fn failing_variant_does_not_abort_batch() {
        let backend = ScriptedBackend::default()
            .with("q0", &["https://a.com"])
            .with("q2", &["https://b.com"]);
        let results = multi_query_search(
            &backend,
            &queries(&["q0", "q1", "q2"]),
            &SearchOptions::default(),
        )
        .await
        .expect("search");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://a.com");
        // q2 keeps its own index-2 weight of 0.6.
        let b = results[1].rrf_score.expect("scored");
        assert!((b - (0.6f64 / 61.0 * 1e6).round() / 1e6).abs() < 1e-12);
        assert_eq!(backend.seen.lock().expect("lock").len(), 3);
    }

    #[tokio::test]
    async fn empty_variant_contributes_nothing() {
        let backend = ScriptedBackend::default()
            .with("q0", &[])
            .with("q1", &["https://a.com"])
            .with("q2", &["https://a.com"]);
        let results = multi_query_search(
            &backend,
            &queries(&["q0", "q1", "q2"]),
            &SearchOptions::default(),
        )
        .await
        .expect("search");
        let expected = ((0.8f64 + 0.6) / 61.0 * 1e6).round() / 1e6;
        assert!((results[0].rrf_score.expect("scored") - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn all_variants_failing_yields_empty() {
        let backend = ScriptedBackend::default();
        let results = multi_query_search(
            &backend,
            &queries(&["q0", "q1"]),
            &SearchOptions::default(),
        )
        .await
        .expect("search");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn limit_applies_to_fused_output() {
        let backend = ScriptedBackend::default()
            .with("q0", &["https://a.com", "https://b.com", "https://c.com"])
            .with("q1", &["https://d.com"]);
        let options = SearchOptions {
            limit: 2,
            ..Default::default()
        };
        let results = multi_query_search(&backend, &queries(&["q0", "q1"]), &options)
            .await
            .expect("search");
        assert_eq!(results.len(), 2);
    }
}

//! Trending-term cache and its background refresher.
//!
//! [`HotwordCache`] owns the current hotword list behind a mutex. Readers
//! take a snapshot; the [`HotwordRefresher`] replaces the whole list and
//! its timestamp in one critical section, so nobody ever observes a
//! half-written cache. Between refreshes readers may see data up to one
//! TTL old.
//!
//! # Refresh loop
//!
//! ```text
//!  start ──► [fetch_on_start?] fetch ──► sleep TTL ──► fetch ──► sleep TTL ─► …
//!                                 │                       │
//!                       failure: warn, keep stale list    │
//!                                                 cancel ─┴─► exit
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::HotwordConfig;
use crate::error::{FusionError, Result};
use crate::http;

/// At most this many hotwords are appended to one query.
const MAX_HOTWORD_VARIANTS: usize = 2;

#[derive(Debug, Default)]
struct HotwordState {
    words: Vec<String>,
    last_update: Option<DateTime<Utc>>,
}

/// Process-wide trending-term cache.
///
/// Share it as `Arc<HotwordCache>` between the rewriter and the refresher.
#[derive(Debug, Default)]
pub struct HotwordCache {
    source_url: Option<String>,
    state: Mutex<HotwordState>,
}

/// Health snapshot of the hotword cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotwordStatus {
    /// Whether a hotword source is configured.
    pub enabled: bool,
    /// The configured source, if any.
    pub source_url: Option<String>,
    /// Number of cached hotwords.
    pub cached_count: usize,
    /// RFC 3339 time of the last successful refresh.
    pub last_update: Option<String>,
}

impl HotwordCache {
    /// An empty cache fed from `source_url` (or never fed, if `None`).
    pub fn new(source_url: Option<String>) -> Self {
        Self {
            source_url,
            state: Mutex::default(),
        }
    }

    /// An empty cache for the configured source.
    pub fn from_config(config: &HotwordConfig) -> Self {
        Self::new(config.source_url.clone())
    }

    /// A copy of the current hotwords, in source order.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().words.clone()
    }

    /// Replace the hotwords and the refresh timestamp atomically.
    pub fn replace(&self, words: Vec<String>, at: DateTime<Utc>) {
        let mut state = self.lock();
        state.words = words;
        state.last_update = Some(at);
    }

    /// Number of cached hotwords.
    pub fn len(&self) -> usize {
        self.lock().words.len()
    }

    /// Whether the cache holds no hotwords.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time of the last successful refresh.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.lock().last_update
    }

    /// Status for health reporting.
    pub fn status(&self) -> HotwordStatus {
        let (cached_count, last_update) = {
            let state = self.lock();
            (state.words.len(), state.last_update)
        };
        HotwordStatus {
            enabled: self.source_url.is_some(),
            source_url: self.source_url.clone(),
            cached_count,
            last_update: last_update.map(|t| t.to_rfc3339()),
        }
    }

    // A panicked writer cannot leave a partial list behind, so the data
    // under a poisoned lock is still whole.
    fn lock(&self) -> std::sync::MutexGuard<'_, HotwordState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `query + " " + hotword` for the first two hotwords related to `query`.
///
/// A hotword of two or more characters is related when enough of its
/// characters occur in the query (at least `max(2, 0.3 × length)`,
/// whitespace excluded), or when a query token of two or more characters
/// is contained in it. Matching is case-insensitive.
pub fn hotword_variants(query: &str, hotwords: &[String]) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let tokens: Vec<&str> = query_lower
        .split_whitespace()
        .filter(|t| t.chars().count() >= 2)
        .collect();

    hotwords
        .iter()
        .filter(|hw| is_related(&query_lower, &tokens, hw))
        .take(MAX_HOTWORD_VARIANTS)
        .map(|hw| format!("{query} {hw}"))
        .collect()
}

fn is_related(query_lower: &str, tokens: &[&str], hotword: &str) -> bool {
    let length = hotword.chars().count();
    if length < 2 {
        return false;
    }
    let hotword_lower = hotword.to_lowercase();
    let overlap = hotword_lower
        .chars()
        .filter(|c| !c.is_whitespace() && query_lower.contains(*c))
        .count();
    let required = (length as f64 * 0.3).max(2.0);
    overlap as f64 >= required || tokens.iter().any(|t| hotword_lower.contains(t))
}

/// Where trending terms come from.
pub trait HotwordSource: Send + Sync + 'static {
    /// Fetch the current hotwords, best first.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError`] on transport or format failures; the
    /// refresher logs it and keeps the stale list.
    fn fetch(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Fetches hotwords from a JSON endpoint over HTTP.
pub struct HttpHotwordSource {
    client: reqwest::Client,
    url: String,
    max_hotwords: usize,
}

impl HttpHotwordSource {
    /// Build a source for `config.source_url`, or `None` if hotwords are
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] for an invalid configuration and
    /// [`FusionError::Http`] if the client cannot be built.
    pub fn from_config(config: &HotwordConfig) -> Result<Option<Self>> {
        config.validate()?;
        let Some(url) = config.source_url.clone() else {
            return Ok(None);
        };
        let client = http::build_client(Duration::from_secs(config.fetch_timeout_seconds))?;
        Ok(Some(Self {
            client,
            url,
            max_hotwords: config.max_hotwords,
        }))
    }
}

impl HotwordSource for HttpHotwordSource {
    async fn fetch(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FusionError::Http(format!("hotword request failed: {e}")))?
            .error_for_status()
            .map_err(|e| FusionError::Http(format!("hotword HTTP error: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| FusionError::Parse(format!("hotword response is not JSON: {e}")))?;

        parse_hotwords(&body, self.max_hotwords)
    }
}

/// Extract hotwords from a source response.
///
/// Accepted shapes:
///
/// - `["word", …]` — non-string items are rendered as JSON text
/// - `{"hotwords": [...]}` or `{"data": [...]}` — items are strings or
///   objects carrying `word` (or, failing that, `title`)
///
/// At most `max` items are read; empty words are dropped. An object with
/// neither key yields an empty list.
///
/// # Errors
///
/// Returns [`FusionError::Parse`] for any other shape.
pub fn parse_hotwords(body: &Value, max: usize) -> Result<Vec<String>> {
    let words: Vec<String> = match body {
        Value::Array(items) => items
            .iter()
            .take(max)
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::Object(map) => {
            let items = match map.get("hotwords").or_else(|| map.get("data")) {
                None => return Ok(Vec::new()),
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(FusionError::Parse(
                        "hotword list must be a JSON array".into(),
                    ))
                }
            };
            items.iter().take(max).filter_map(object_word).collect()
        }
        _ => {
            return Err(FusionError::Parse(
                "hotword response must be a JSON array or object".into(),
            ))
        }
    };
    Ok(words.into_iter().filter(|w| !w.is_empty()).collect())
}

fn object_word(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(fields) => fields
            .get("word")
            .or_else(|| fields.get("title"))
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
}

/// Background worker that keeps a [`HotwordCache`] fresh.
pub struct HotwordRefresher<S> {
    cache: Arc<HotwordCache>,
    source: S,
    interval: Duration,
    fetch_on_start: bool,
}

impl<S: HotwordSource> HotwordRefresher<S> {
    /// Create a refresher writing into `cache`.
    ///
    /// Call [`start`](Self::start) to spawn it.
    pub fn new(cache: Arc<HotwordCache>, source: S, config: &HotwordConfig) -> Self {
        Self {
            cache,
            source,
            interval: Duration::from_secs(config.ttl_seconds),
            fetch_on_start: config.fetch_on_start,
        }
    }

    /// Override the refresh interval (useful for testing).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Fetch once and, on success, replace the cache contents.
    ///
    /// Returns the number of hotwords now cached.
    ///
    /// # Errors
    ///
    /// Propagates the source error; the cache is left untouched.
    pub async fn refresh_once(&self) -> Result<usize> {
        let words = self.source.fetch().await?;
        let count = words.len();
        self.cache.replace(words, Utc::now());
        Ok(count)
    }

    async fn refresh_logged(&self) {
        match self.refresh_once().await {
            Ok(count) => tracing::info!(count, "hotwords refreshed"),
            Err(err) => tracing::warn!(error = %err, "hotword refresh failed"),
        }
    }

    /// Run the refresh loop until `cancel` fires.
    ///
    /// Refresh failures never end the loop.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "hotword refresher started"
        );

        if self.fetch_on_start {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("hotword refresher cancelled");
                    return;
                }
                _ = self.refresh_logged() => {}
            }
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("hotword refresher cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.refresh_logged().await;
                }
            }
        }
    }

    /// Spawn the refresh loop on the current tokio runtime.
    pub fn start(self, cancel: CancellationToken) -> RefresherHandle {
        let task = tokio::spawn(self.run(cancel.clone()));
        RefresherHandle { cancel, task }
    }
}

/// Spawn an HTTP-backed refresher if `config` names a source.
///
/// Returns `Ok(None)` when hotwords are disabled. The cache must have
/// been built for the same source (see [`HotwordCache::from_config`]) so
/// its status reports what actually feeds it.
///
/// # Errors
///
/// Returns [`FusionError::Config`] for an invalid configuration or a cache
/// built for a different source.
pub fn start_http_refresher(
    config: &HotwordConfig,
    cache: Arc<HotwordCache>,
    cancel: CancellationToken,
) -> Result<Option<RefresherHandle>> {
    let Some(source) = HttpHotwordSource::from_config(config)? else {
        return Ok(None);
    };
    if cache.source_url != config.source_url {
        return Err(FusionError::Config(
            "hotword cache was built for a different source_url; use HotwordCache::from_config"
                .into(),
        ));
    }
    tracing::info!("starting hotword refresher");
    Ok(Some(HotwordRefresher::new(cache, source, config).start(cancel)))
}

/// Handle to a running refresher.
pub struct RefresherHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the worker and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "hotword refresher ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed list, or fails when `words` is `None`.
    struct FakeSource {
        words: Option<Vec<String>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn serving(words: &[&str]) -> Self {
            Self {
                words: Some(words.iter().map(|w| w.to_string()).collect()),
                calls: Arc::default(),
            }
        }

        fn failing() -> Self {
            Self {
                words: None,
                calls: Arc::default(),
            }
        }
    }

    impl HotwordSource for FakeSource {
        async fn fetch(&self) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.words
                .clone()
                .ok_or_else(|| FusionError::Http("source unreachable".into()))
        }
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = HotwordCache::new(None);
        assert!(cache.is_empty());
        assert!(cache.last_update().is_none());
    }

    #[test]
    fn replace_swaps_list_and_timestamp() {
        let cache = HotwordCache::new(None);
        let at = Utc::now();
        cache.replace(words(&["a", "b"]), at);
        cache.replace(words(&["c"]), at);
        assert_eq!(cache.snapshot(), words(&["c"]));
        assert_eq!(cache.last_update(), Some(at));
    }

    #[test]
    fn status_reports_configuration_and_contents() {
        let cache = HotwordCache::new(Some("https://hot.example.com".into()));
        let status = cache.status();
        assert!(status.enabled);
        assert_eq!(status.cached_count, 0);
        assert!(status.last_update.is_none());

        cache.replace(words(&["大模型发布"]), Utc::now());
        let status = cache.status();
        assert_eq!(status.cached_count, 1);
        assert!(status.last_update.is_some());
    }

    #[test]
    fn disabled_status() {
        let status = HotwordCache::new(None).status();
        assert!(!status.enabled);
        assert!(status.source_url.is_none());
    }

    #[test]
    fn character_overlap_matches() {
        let variants = hotword_variants("今天模型新闻", &words(&["大模型发布"]));
        assert_eq!(variants, vec!["今天模型新闻 大模型发布".to_string()]);
    }

    #[test]
    fn single_shared_character_is_not_enough() {
        assert!(hotword_variants("模特", &words(&["大模型发布"])).is_empty());
    }

    #[test]
    fn long_hotwords_need_proportional_overlap() {
        // 10 characters: needs 3 shared, only "r" "u" overlap with "rust".
        let hotwords = words(&["abcdefghru"]);
        assert!(hotword_variants("rust", &hotwords).is_empty());
    }

    #[test]
    fn token_substring_matches() {
        let variants = hotword_variants("rust release", &words(&["Rust 2024 edition"]));
        assert_eq!(variants, vec!["rust release Rust 2024 edition".to_string()]);
    }

    #[test]
    fn one_character_hotwords_never_match() {
        assert!(hotword_variants("a b c", &words(&["a"])).is_empty());
    }

    #[test]
    fn at_most_two_hotwords_in_cache_order() {
        let hotwords = words(&["模型一号", "模型二号", "模型三号"]);
        let variants = hotword_variants("模型", &hotwords);
        assert_eq!(
            variants,
            vec!["模型 模型一号".to_string(), "模型 模型二号".to_string()]
        );
    }

    #[test]
    fn parse_plain_list() {
        let parsed = parse_hotwords(&json!(["a", "", 42]), 50).expect("parse");
        assert_eq!(parsed, words(&["a", "42"]));
    }

    #[test]
    fn parse_hotwords_key_with_objects() {
        let body = json!({"hotwords": ["x", {"word": "y"}, {"title": "z"}, {"other": 1}]});
        assert_eq!(parse_hotwords(&body, 50).expect("parse"), words(&["x", "y", "z"]));
    }

    #[test]
    fn parse_data_key_fallback() {
        let body = json!({"data": [{"title": "t"}]});
        assert_eq!(parse_hotwords(&body, 50).expect("parse"), words(&["t"]));
    }

    #[test]
    fn parse_object_without_list_is_empty() {
        assert!(parse_hotwords(&json!({"status": "ok"}), 50)
            .expect("parse")
            .is_empty());
    }

    #[test]
    fn parse_caps_item_count() {
        let body = Value::Array((0..80).map(|i| json!(format!("w{i}"))).collect());
        assert_eq!(parse_hotwords(&body, 50).expect("parse").len(), 50);
    }

    #[test]
    fn parse_rejects_scalars() {
        assert!(parse_hotwords(&json!("hot"), 50).is_err());
        assert!(parse_hotwords(&json!({"hotwords": "hot"}), 50).is_err());
    }

    #[tokio::test]
    async fn refresh_once_fills_cache() {
        let cache = Arc::new(HotwordCache::new(None));
        let refresher = HotwordRefresher::new(
            Arc::clone(&cache),
            FakeSource::serving(&["a", "b"]),
            &HotwordConfig::default(),
        );
        assert_eq!(refresher.refresh_once().await.expect("refresh"), 2);
        assert_eq!(cache.snapshot(), words(&["a", "b"]));
        assert!(cache.last_update().is_some());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_list() {
        let cache = Arc::new(HotwordCache::new(None));
        let at = Utc::now();
        cache.replace(words(&["stale"]), at);
        let refresher =
            HotwordRefresher::new(Arc::clone(&cache), FakeSource::failing(), &HotwordConfig::default());
        assert!(refresher.refresh_once().await.is_err());
        assert_eq!(cache.snapshot(), words(&["stale"]));
        assert_eq!(cache.last_update(), Some(at));
    }

    // The tests below run on a paused clock: sleeps advance virtual time
    // as soon as every task is idle.

    #[tokio::test(start_paused = true)]
    async fn loop_survives_failures_and_stops_on_cancel() {
        let cache = Arc::new(HotwordCache::new(None));
        let source = FakeSource::failing();
        let calls = Arc::clone(&source.calls);
        let handle = HotwordRefresher::new(Arc::clone(&cache), source, &HotwordConfig::default())
            .with_interval(Duration::from_secs(10))
            .start(CancellationToken::new());

        // Fetches at 0 s, 10 s and 20 s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(!handle.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        handle.stop().await;
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_on_start_when_configured() {
        let cache = Arc::new(HotwordCache::new(None));
        let handle = HotwordRefresher::new(
            Arc::clone(&cache),
            FakeSource::serving(&["hot"]),
            &HotwordConfig::default(),
        )
        .with_interval(Duration::from_secs(60))
        .start(CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cache.snapshot(), words(&["hot"]));
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn waits_a_full_interval_without_fetch_on_start() {
        let cache = Arc::new(HotwordCache::new(None));
        let config = HotwordConfig {
            fetch_on_start: false,
            ..Default::default()
        };
        let source = FakeSource::serving(&["hot"]);
        let calls = Arc::clone(&source.calls);
        let handle = HotwordRefresher::new(Arc::clone(&cache), source, &config)
            .with_interval(Duration::from_secs(60))
            .start(CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.snapshot(), words(&["hot"]));
        handle.stop().await;
    }

    #[tokio::test]
    async fn refresher_rejects_cache_for_another_source() {
        let config = HotwordConfig {
            source_url: Some("https://hot.example.com/words".into()),
            ..Default::default()
        };
        let cache = Arc::new(HotwordCache::default());
        let err = start_http_refresher(&config, cache, CancellationToken::new())
            .err()
            .expect("mismatched cache rejected");
        assert!(err.to_string().contains("source_url"));
    }

    #[test]
    fn disabled_config_has_no_http_source() {
        let source = HttpHotwordSource::from_config(&HotwordConfig::default()).expect("valid");
        assert!(source.is_none());
    }
}

//! Multi-tier time-decay freshness bonus.
//!
//! A result published within the last six hours earns the full bonus of
//! 0.5; the bonus then decays linearly through four windows and vanishes
//! after thirty days:
//!
//! ```text
//!   age (h)   0 ─── 6 ──── 24 ──── 72 ──── 168 ──── 720 ───►
//!   bonus     0.5   0.5    0.4     0.3     0.2      0.1   0.0
//! ```
//!
//! The bonus is added to a text relevance score without clamping, so the
//! combined value may exceed 1.0. Downstream consumers rank by it; they do
//! not treat it as a probability.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::types::SearchResult;

/// Maximum bonus, awarded to anything up to six hours old.
pub const MAX_BONUS: f64 = 0.5;

/// Age windows `(start_hours, end_hours, bonus_at_start, bonus_at_end)`.
///
/// Each window is closed at its end, so every breakpoint takes the end
/// value of the window below it and the curve is continuous.
const DECAY_WINDOWS: &[(f64, f64, f64, f64)] = &[
    (6.0, 24.0, 0.5, 0.4),
    (24.0, 72.0, 0.4, 0.3),
    (72.0, 168.0, 0.3, 0.2),
    (168.0, 720.0, 0.2, 0.1),
];

/// Date-time layouts tried after ISO-8601, in order.
const FALLBACK_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S"];
/// Date-only layouts tried last, in order.
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y年%m月%d日"];

/// A publication date in any of the shapes backends hand out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PublishedDate<'a> {
    /// A timestamp with a known offset.
    Timestamp(DateTime<FixedOffset>),
    /// A timestamp without zone information; interpreted as UTC.
    Naive(NaiveDateTime),
    /// Unparsed text, see [`parse_published_date`].
    Text(&'a str),
}

impl PublishedDate<'_> {
    /// Resolve to a UTC instant, or `None` if the text cannot be parsed.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(ts.with_timezone(&Utc)),
            Self::Naive(naive) => Some(Utc.from_utc_datetime(naive)),
            Self::Text(text) => parse_published_date(text),
        }
    }
}

impl From<DateTime<Utc>> for PublishedDate<'_> {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for PublishedDate<'_> {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<NaiveDateTime> for PublishedDate<'_> {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

impl<'a> From<&'a str> for PublishedDate<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for PublishedDate<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text.as_str())
    }
}

/// Parse a textual publication date.
///
/// ISO-8601 is tried first (a trailing `Z` means UTC), then
/// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, `YYYY年MM月DD日` and `MM月DD日`.
/// Values without zone information are taken as UTC. The last layout
/// carries no year and resolves to 1900, which always scores zero.
pub fn parse_published_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(ts) = parse_iso8601(text) {
        return Some(ts);
    }

    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
        }
    }

    NaiveDate::parse_from_str(&format!("1900年{text}"), "%Y年%m月%d日")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|n| Utc.from_utc_datetime(&n))
}

fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(ts) = DateTime::parse_from_str(text, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Freshness bonus in `[0.0, 0.5]` for a result published at `published`,
/// evaluated at `now`.
///
/// Missing or unparseable dates earn no bonus. Dates in the future count
/// as age zero.
pub fn time_bonus(published: Option<PublishedDate<'_>>, now: DateTime<Utc>) -> f64 {
    let Some(published) = published.and_then(|p| p.to_utc()) else {
        return 0.0;
    };
    let age = now.signed_duration_since(published);
    let hours = (age.num_milliseconds() as f64 / 3_600_000.0).max(0.0);
    bonus_for_age(hours)
}

/// [`time_bonus`] evaluated at the current time.
pub fn time_bonus_now(published: Option<PublishedDate<'_>>) -> f64 {
    time_bonus(published, Utc::now())
}

/// The decay curve itself, by age in hours.
pub fn bonus_for_age(hours: f64) -> f64 {
    if hours <= 6.0 {
        return MAX_BONUS;
    }
    for &(start, end, at_start, at_end) in DECAY_WINDOWS {
        if hours <= end {
            return at_end + (at_start - at_end) * (end - hours) / (end - start);
        }
    }
    0.0
}

/// Text relevance plus freshness bonus. Not clamped to `[0, 1]`.
pub fn compute_time_relevance(text_relevance: f64, published: Option<PublishedDate<'_>>) -> f64 {
    text_relevance + time_bonus_now(published)
}

/// Add each result's freshness bonus to its relevance and re-rank.
///
/// Relevance is scaled to `[0, 1]` first so the bonus nudges rather than
/// replaces the ranking:
///
/// - fused results: `rrf_score / top rrf_score` (missing RRF scores count
///   as 0)
/// - unfused results: min-max scaled backend `score`; when every score is
///   equal, `1 - position / len`
///
/// The sum is written to `score`; ties keep their current order.
pub fn apply_freshness(results: &mut [SearchResult], now: DateTime<Utc>) {
    let relevance = normalized_relevance(results);
    for (result, base) in results.iter_mut().zip(relevance) {
        result.score = base + time_bonus(result.published(), now);
    }
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Relevance of each result in `[0, 1]`, in input order.
fn normalized_relevance(results: &[SearchResult]) -> Vec<f64> {
    let len = results.len();
    let by_position = |i: usize| 1.0 - i as f64 / len as f64;

    if results.iter().any(|r| r.rrf_score.is_some()) {
        let top = results
            .iter()
            .filter_map(|r| r.rrf_score)
            .filter(|s| s.is_finite())
            .fold(0.0_f64, f64::max);
        if top <= 0.0 {
            return (0..len).map(by_position).collect();
        }
        return results
            .iter()
            .map(|r| r.rrf_score.map_or(0.0, |s| (s / top).clamp(0.0, 1.0)))
            .collect();
    }

    let finite = results.iter().map(|r| r.score).filter(|s| s.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s), hi.max(s))
    });
    if max <= min {
        return (0..len).map(by_position).collect();
    }
    results
        .iter()
        .map(|r| {
            if r.score.is_finite() {
                (r.score - min) / (max - min)
            } else {
                0.0
            }
        })
        .collect()
}

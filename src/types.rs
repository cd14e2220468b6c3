//! Core result type shared by backends, fusion and scoring.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FusionError, Result};
use crate::freshness::PublishedDate;

/// A single search result as seen by the ranking pipeline.
///
/// Backends return results in many shapes. Every field has a default and
/// the common alternative spellings are accepted, so a producer only has
/// to map its records into JSON (or construct this type directly) at the
/// boundary. Missing or `null` fields become empty values instead of errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    /// Page URL. The trimmed form, without trailing slashes, is the
    /// deduplication identity during fusion.
    #[serde(deserialize_with = "nullable_string")]
    pub url: String,
    /// Page title.
    #[serde(deserialize_with = "nullable_string")]
    pub title: String,
    /// Snippet or extracted page text.
    #[serde(alias = "snippet", deserialize_with = "nullable_string")]
    pub content: String,
    /// Relevance score assigned by the backend or by a later scoring stage.
    #[serde(deserialize_with = "nullable_score")]
    pub score: f64,
    /// Publication date as reported by the backend, unparsed.
    #[serde(
        alias = "publishedDate",
        alias = "pubdate",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_date: Option<String>,
    /// Name of the engine that produced this result, when known.
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Reciprocal-rank fusion score, rounded to 6 decimals. Set by fusion only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrf_score: Option<f64>,
}

impl SearchResult {
    /// Adapt an arbitrary JSON record from a backend into a result.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Parse`] if `value` is not a JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(FusionError::Parse(
                "search result must be a JSON object".into(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| FusionError::Parse(format!("malformed search result: {e}")))
    }

    /// The deduplication identity: URL trimmed, trailing slashes removed.
    pub fn identity_key(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }

    /// The publication date in a form the freshness scorer accepts.
    pub fn published(&self) -> Option<PublishedDate<'_>> {
        self.published_date.as_deref().map(PublishedDate::Text)
    }

    /// Length of `content` in characters, used to pick the richest duplicate.
    pub(crate) fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn nullable_score<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Strings pass through, `null` becomes `None`, anything else is rendered
/// as its JSON text.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

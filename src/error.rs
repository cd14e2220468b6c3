//! Error types for the searx-fusion crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. Query text never appears in error messages.

/// Errors that can occur while rewriting, searching, fusing or reranking.
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// An HTTP request to the hotword source or reranker failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A response body could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// A caller-supplied search backend failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// A structurally invalid call, such as a negative fusion weight.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for searx-fusion results.
pub type Result<T> = std::result::Result<T, FusionError>;

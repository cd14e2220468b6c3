//! Shared HTTP client construction for the hotword source and reranker.

use std::time::Duration;

use crate::error::FusionError;

/// User-Agent sent with every request made by this crate.
pub const USER_AGENT: &str = concat!("searx-fusion/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] with the given request timeout.
///
/// # Errors
///
/// Returns [`FusionError::Http`] if the client cannot be constructed.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, FusionError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| FusionError::Http(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_client_with_short_timeout() {
        let client = build_client(Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn user_agent_names_the_crate() {
        assert!(USER_AGENT.starts_with("searx-fusion/"));
    }
}

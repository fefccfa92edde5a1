//! Source adapters for the collection pipeline.
//!
//! One typed HTTP client per external platform, all speaking the same
//! contract: fetch raw items or fail with a [`SourceError`] the
//! orchestrator can classify. Every client takes a [`SourceConfig`] for
//! timeouts and retry policy and accepts a custom base URL so wiremock can
//! stand in for the real API in tests.

mod error;
pub mod forum;
mod retry;
pub mod trends;
pub mod video;

use std::time::Duration;

pub use error::SourceError;
pub use forum::ForumClient;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use trends::TrendClient;
pub use video::VideoClient;

/// HTTP and retry settings shared by all adapters.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: "flowpulse/0.1 (workflow-popularity)".to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SourceConfig {
    #[must_use]
    pub fn from_app_config(config: &flowpulse_core::AppConfig) -> Self {
        Self {
            request_timeout_secs: config.source_request_timeout_secs,
            user_agent: config.source_user_agent.clone(),
            retry: RetryPolicy {
                max_retries: config.source_max_retries,
                backoff_base_ms: config.source_retry_backoff_base_ms,
            },
        }
    }

    /// Builds the underlying `reqwest::Client` with bounded timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the client cannot be constructed.
    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(self.user_agent.clone())
            .build()?;
        Ok(client)
    }
}

use thiserror::Error;

/// Errors returned by the source adapters.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source returned a non-2xx HTTP status.
    #[error("source returned HTTP {code}")]
    Status { code: u16 },

    /// The source returned an application-level error payload.
    #[error("source API error: {0}")]
    Api(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The adapter requires an API key and none was configured.
    #[error("no API key configured for this source")]
    MissingApiKey,
}

impl SourceError {
    /// Classifies an error for retry purposes.
    ///
    /// **Retriable:** network-level failures (timeout, connection reset),
    /// HTTP 5xx, and HTTP 429 rate limiting.
    ///
    /// **Permanent:** every other HTTP status (401/403 bad credentials,
    /// 404, ...), application-level errors, malformed responses, and a
    /// missing API key; retrying cannot fix any of those.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            SourceError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            SourceError::Status { code } => *code == 429 || (500..600).contains(code),
            SourceError::Api(_) | SourceError::Deserialize { .. } | SourceError::MissingApiKey => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retriable() {
        assert!(SourceError::Status { code: 500 }.is_retriable());
        assert!(SourceError::Status { code: 503 }.is_retriable());
    }

    #[test]
    fn rate_limiting_is_retriable() {
        assert!(SourceError::Status { code: 429 }.is_retriable());
    }

    #[test]
    fn auth_failures_are_permanent() {
        assert!(!SourceError::Status { code: 401 }.is_retriable());
        assert!(!SourceError::Status { code: 403 }.is_retriable());
    }

    #[test]
    fn api_and_deserialize_errors_are_permanent() {
        assert!(!SourceError::Api("quota exceeded".to_owned()).is_retriable());
        let source = serde_json::from_str::<()>("nope").unwrap_err();
        assert!(!SourceError::Deserialize {
            context: "test".to_owned(),
            source,
        }
        .is_retriable());
    }

    #[test]
    fn missing_api_key_is_permanent() {
        assert!(!SourceError::MissingApiKey.is_retriable());
    }
}

//! Forum adapter: Discourse JSON API.
//!
//! Discourse serves every topic list as JSON at the HTML URL plus `.json`;
//! `/c/{category}/l/top.json` gives the category's top topics with view,
//! like and post counts. Replies are `posts_count - 1` (the opening post is
//! counted), floored at zero.

use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;

use flowpulse_core::metrics::{METRIC_LIKES, METRIC_REPLIES, METRIC_VIEWS};
use flowpulse_core::{MetricSet, RawItem};

use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::video::normalize_base_url;
use crate::SourceConfig;

/// Client for a Discourse forum.
pub struct ForumClient {
    client: reqwest::Client,
    base_url: Url,
    config: SourceConfig,
}

#[derive(Debug, Deserialize)]
struct TopicListResponse {
    topic_list: TopicList,
}

#[derive(Debug, Deserialize)]
struct TopicList {
    #[serde(default)]
    topics: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    id: i64,
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    posts_count: i64,
    #[serde(default)]
    views: i64,
    #[serde(default)]
    like_count: i64,
}

impl ForumClient {
    /// Creates a client for the given Discourse base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::Api`] if `base_url` is not a valid URL.
    pub fn new(base_url: &str, config: SourceConfig) -> Result<Self, SourceError> {
        let client = config.build_http_client()?;
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Fetches the top topics for one category and maps each to a
    /// [`RawItem`]. Forum items carry no geography.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Status`] on non-2xx responses (after retries for
    ///   transient codes).
    /// - [`SourceError::Http`] on network failure.
    /// - [`SourceError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn top_topics(&self, category: &str) -> Result<Vec<RawItem>, SourceError> {
        let response =
            retry_with_backoff(self.config.retry, || self.fetch_top(category)).await?;

        let observed_at = Utc::now();
        let items = response
            .topic_list
            .topics
            .into_iter()
            .map(|topic| {
                let mut metrics = MetricSet::new();
                #[allow(clippy::cast_precision_loss)]
                {
                    metrics.set(METRIC_REPLIES, (topic.posts_count - 1).max(0) as f64);
                    metrics.set(METRIC_VIEWS, topic.views.max(0) as f64);
                    metrics.set(METRIC_LIKES, topic.like_count.max(0) as f64);
                }
                let slug = topic.slug.unwrap_or_else(|| "topic".to_owned());
                RawItem {
                    source_item_id: topic.id.to_string(),
                    title: topic.title,
                    description: topic.excerpt,
                    metrics,
                    evidence_url: format!("{}t/{}/{}", self.base_url, slug, topic.id),
                    observed_at,
                    country: None,
                }
            })
            .collect();

        Ok(items)
    }

    async fn fetch_top(&self, category: &str) -> Result<TopicListResponse, SourceError> {
        let path = format!("c/{category}/l/top.json");
        let url = self
            .base_url
            .join(&path)
            .map_err(|e| SourceError::Api(format!("invalid category '{category}': {e}")))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.json::<serde_json::Value>().await?;
        serde_json::from_value(body).map_err(|e| SourceError::Deserialize {
            context: format!("top_topics(category={category})"),
            source: e,
        })
    }
}

//! Video-platform adapter: YouTube Data API v3.
//!
//! Two-step fetch mirroring the API's shape: `search` pages through video
//! ids for a query (ordered by view count, scoped by region), then `videos`
//! resolves snippet and statistics for each page of ids in one batch call.
//! Statistics arrive as JSON strings; a malformed single stat falls back to
//! zero rather than failing the whole item.

use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;

use flowpulse_core::metrics::{METRIC_COMMENTS, METRIC_LIKES, METRIC_VIEWS};
use flowpulse_core::{Country, MetricSet, RawItem};

use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::SourceConfig;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Page size for both `search` and `videos` calls, the API maximum.
const PAGE_SIZE: usize = 50;

/// Client for the YouTube Data API v3.
///
/// Use [`VideoClient::new`] for production or [`VideoClient::with_base_url`]
/// to point at a mock server in tests.
pub struct VideoClient {
    client: reqwest::Client,
    api_key: String,
    base_url: Url,
    config: SourceConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

/// Statistics are decimal strings in the API; absent fields (e.g. hidden
/// like counts) read as zero.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    #[serde(default)]
    view_count: Option<String>,
    #[serde(default)]
    like_count: Option<String>,
    #[serde(default)]
    comment_count: Option<String>,
}

fn parse_stat(raw: Option<&String>) -> f64 {
    raw.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0)
}

impl VideoClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, config: SourceConfig) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, config, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::Api`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        config: SourceConfig,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        let client = config.build_http_client()?;
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            config,
        })
    }

    /// Fetches up to `max_items` videos matching `query` in `country`,
    /// ordered by view count, with full statistics resolved.
    ///
    /// Pages through search results until `max_items` is reached or the API
    /// reports no further pages. Each HTTP call is retried per the
    /// configured policy.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Status`] on non-2xx responses (after retries for
    ///   transient codes).
    /// - [`SourceError::Http`] on network failure.
    /// - [`SourceError::Deserialize`] if a response does not match the
    ///   expected shape.
    pub async fn search_videos(
        &self,
        query: &str,
        country: Country,
        max_items: usize,
    ) -> Result<Vec<RawItem>, SourceError> {
        let mut video_ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;

        while video_ids.len() < max_items {
            let page = retry_with_backoff(self.config.retry, || {
                self.search_page(query, country, page_token.as_deref())
            })
            .await?;

            video_ids.extend(page.items.into_iter().filter_map(|item| item.id.video_id));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        video_ids.truncate(max_items);

        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut items = Vec::with_capacity(video_ids.len());
        for chunk in video_ids.chunks(PAGE_SIZE) {
            let details = retry_with_backoff(self.config.retry, || self.video_details(chunk))
                .await?;
            let observed_at = Utc::now();
            items.extend(details.items.into_iter().map(|video| {
                let mut metrics = MetricSet::new();
                metrics.set(METRIC_VIEWS, parse_stat(video.statistics.view_count.as_ref()));
                metrics.set(METRIC_LIKES, parse_stat(video.statistics.like_count.as_ref()));
                metrics.set(
                    METRIC_COMMENTS,
                    parse_stat(video.statistics.comment_count.as_ref()),
                );
                RawItem {
                    evidence_url: format!("https://www.youtube.com/watch?v={}", video.id),
                    source_item_id: video.id,
                    title: video.snippet.title,
                    description: video.snippet.description,
                    metrics,
                    observed_at,
                    country: Some(country),
                }
            }));
        }

        Ok(items)
    }

    async fn search_page(
        &self,
        query: &str,
        country: Country,
        page_token: Option<&str>,
    ) -> Result<SearchResponse, SourceError> {
        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("type", "video"),
            ("order", "viewCount"),
            ("relevanceLanguage", "en"),
            ("maxResults", page_size.as_str()),
            ("q", query),
            ("key", self.api_key.as_str()),
        ];
        let geo = country.geo_code();
        if !geo.is_empty() {
            params.push(("regionCode", geo));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let body = self.request_json("search", &params).await?;
        serde_json::from_value(body).map_err(|e| SourceError::Deserialize {
            context: format!("search(q={query})"),
            source: e,
        })
    }

    async fn video_details(&self, video_ids: &[String]) -> Result<VideoListResponse, SourceError> {
        let ids = video_ids.join(",");
        let params = [
            ("part", "snippet,statistics"),
            ("id", ids.as_str()),
            ("key", self.api_key.as_str()),
        ];

        let body = self.request_json("videos", &params).await?;
        serde_json::from_value(body).map_err(|e| SourceError::Deserialize {
            context: format!("videos(ids={ids})"),
            source: e,
        })
    }

    async fn request_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, SourceError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::Api(format!("invalid endpoint path '{path}': {e}")))?;

        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                code: status.as_u16(),
            });
        }
        Ok(response.json::<serde_json::Value>().await?)
    }
}

/// Ensures the base URL ends with exactly one slash so `Url::join` appends
/// to the path instead of replacing the last segment.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<Url, SourceError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised)
        .map_err(|e| SourceError::Api(format!("invalid base URL '{base_url}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stat_handles_strings_and_absence() {
        assert_eq!(parse_stat(Some(&"12345".to_owned())), 12_345.0);
        assert_eq!(parse_stat(Some(&"not-a-number".to_owned())), 0.0);
        assert_eq!(parse_stat(None), 0.0);
    }

    #[test]
    fn base_url_normalization_appends_single_slash() {
        let url = normalize_base_url("https://example.com/youtube/v3").unwrap();
        assert_eq!(url.as_str(), "https://example.com/youtube/v3/");
        let joined = url.join("search").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/youtube/v3/search");
    }

    #[test]
    fn search_response_tolerates_missing_fields() {
        let json = serde_json::json!({
            "items": [
                { "id": { "videoId": "abc" } },
                { "id": { "kind": "youtube#channel" } }
            ]
        });
        let parsed: SearchResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].id.video_id.as_deref(), Some("abc"));
        assert!(parsed.items[1].id.video_id.is_none());
        assert!(parsed.next_page_token.is_none());
    }
}

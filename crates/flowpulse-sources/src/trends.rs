//! Search-trend adapter: interest-over-time for a keyword and geography.
//!
//! Talks to a Google-Trends-compatible interest API (a trends proxy in
//! production; wiremock in tests). Each `(keyword, geography)` pair yields
//! at most one item whose `search_interest` metric is the mean of the
//! trailing 3-month interest points, already scaled 0-100 by the source.
//! A keyword with no data points for a geography yields no item at all:
//! records are never invented for geographies with no evidence.

use chrono::Utc;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Url;
use serde::Deserialize;

use flowpulse_core::metrics::METRIC_SEARCH_INTEREST;
use flowpulse_core::{Country, MetricSet, RawItem};

use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::video::normalize_base_url;
use crate::SourceConfig;

/// Timeframe parameter for the trailing 3-month window, in the trends
/// API's own notation.
const TIMEFRAME_3_MONTHS: &str = "today 3-m";

/// Client for the interest-over-time API.
pub struct TrendClient {
    client: reqwest::Client,
    base_url: Url,
    config: SourceConfig,
}

#[derive(Debug, Deserialize)]
struct InterestResponse {
    #[serde(default)]
    points: Vec<InterestPoint>,
}

/// One interest observation; `value` is 0–100.
#[derive(Debug, Deserialize)]
struct InterestPoint {
    #[allow(dead_code)]
    date: String,
    value: f64,
}

impl TrendClient {
    /// Creates a client for the given interest API base URL.
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

    /// Fetches trailing-3-month interest for `keyword` in `country` and
    /// folds it into at most one [`RawItem`].
    ///
    /// Returns `Ok(None)` when the source has no data points for the pair.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Status`] on non-2xx responses (after retries for
    ///   transient codes).
    /// - [`SourceError::Http`] on network failure.
    /// - [`SourceError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn interest_over_time(
        &self,
        keyword: &str,
        country: Country,
    ) -> Result<Option<RawItem>, SourceError> {
        let response = retry_with_backoff(self.config.retry, || {
            self.fetch_interest(keyword, country)
        })
        .await?;

        if response.points.is_empty() {
            return Ok(None);
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = response.points.iter().map(|p| p.value).sum::<f64>()
            / response.points.len() as f64;

        let mut metrics = MetricSet::new();
        metrics.set(METRIC_SEARCH_INTEREST, mean);

        let geo = country.geo_code();
        let encoded = utf8_percent_encode(keyword, NON_ALPHANUMERIC).to_string();
        let evidence_url = if geo.is_empty() {
            format!("https://trends.google.com/trends/explore?q={encoded}")
        } else {
            format!("https://trends.google.com/trends/explore?q={encoded}&geo={geo}")
        };

        Ok(Some(RawItem {
            source_item_id: format!("{keyword}:{}", country.as_str()),
            title: keyword.to_owned(),
            description: None,
            metrics,
            evidence_url,
            observed_at: Utc::now(),
            country: Some(country),
        }))
    }

    async fn fetch_interest(
        &self,
        keyword: &str,
        country: Country,
    ) -> Result<InterestResponse, SourceError> {
        let url = self
            .base_url
            .join("interest")
            .map_err(|e| SourceError::Api(format!("invalid endpoint path: {e}")))?;

        let response = self
            .client
            .get(url)
            .query(&[
                ("keyword", keyword),
                ("geo", country.geo_code()),
                ("timeframe", TIMEFRAME_3_MONTHS),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                code: status.as_u16(),
            });
        }

        let body = response.json::<serde_json::Value>().await?;
        serde_json::from_value(body).map_err(|e| SourceError::Deserialize {
            context: format!("interest(keyword={keyword})"),
            source: e,
        })
    }
}

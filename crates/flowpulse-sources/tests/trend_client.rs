//! Integration tests for `TrendClient` using wiremock HTTP mocks.

use flowpulse_core::metrics::METRIC_SEARCH_INTEREST;
use flowpulse_core::Country;
use flowpulse_sources::{RetryPolicy, SourceConfig, SourceError, TrendClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> TrendClient {
    let config = SourceConfig {
        retry: RetryPolicy {
            max_retries: 1,
            backoff_base_ms: 0,
        },
        ..SourceConfig::default()
    };
    TrendClient::new(base_url, config).expect("client construction should not fail")
}

#[tokio::test]
async fn interest_is_mean_of_trailing_points() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "points": [
            { "date": "2025-06-01", "value": 40 },
            { "date": "2025-07-01", "value": 60 },
            { "date": "2025-08-01", "value": 80 }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/interest"))
        .and(query_param("keyword", "n8n automation"))
        .and(query_param("geo", "US"))
        .and(query_param("timeframe", "today 3-m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let item = client
        .interest_over_time("n8n automation", Country::Us)
        .await
        .expect("fetch should succeed")
        .expect("points present, item expected");

    assert_eq!(item.source_item_id, "n8n automation:us");
    assert_eq!(item.metrics.get(METRIC_SEARCH_INTEREST), 60.0);
    assert_eq!(item.country, Some(Country::Us));
    assert!(item.evidence_url.contains("geo=US"));
}

#[tokio::test]
async fn no_points_yields_no_item() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/interest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "points": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let item = client
        .interest_over_time("obscure keyword", Country::In)
        .await
        .expect("fetch should succeed");

    assert!(item.is_none(), "no evidence must produce no record");
}

#[tokio::test]
async fn global_geography_omits_geo_from_evidence_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/interest"))
        .and(query_param("geo", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "points": [ { "date": "2025-08-01", "value": 55 } ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let item = client
        .interest_over_time("n8n webhook", Country::Global)
        .await
        .unwrap()
        .unwrap();

    assert!(!item.evidence_url.contains("geo="));
    assert_eq!(item.country, Some(Country::Global));
}

#[tokio::test]
async fn rate_limit_is_retried_then_surfaces() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/interest"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2) // 1 attempt + 1 retry
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.interest_over_time("n8n", Country::Us).await;

    assert!(matches!(result, Err(SourceError::Status { code: 429 })));
}

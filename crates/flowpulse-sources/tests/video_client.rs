//! Integration tests for `VideoClient` using wiremock HTTP mocks.

use flowpulse_core::metrics::{METRIC_COMMENTS, METRIC_LIKES, METRIC_VIEWS};
use flowpulse_core::Country;
use flowpulse_sources::{RetryPolicy, SourceConfig, SourceError, VideoClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> VideoClient {
    let config = SourceConfig {
        retry: RetryPolicy {
            max_retries: 2,
            backoff_base_ms: 0,
        },
        ..SourceConfig::default()
    };
    VideoClient::with_base_url("test-key", config, base_url)
        .expect("client construction should not fail")
}

fn search_body(ids: &[&str], next_page: Option<&str>) -> serde_json::Value {
    let items: Vec<_> = ids
        .iter()
        .map(|id| serde_json::json!({ "id": { "videoId": id } }))
        .collect();
    match next_page {
        Some(token) => serde_json::json!({ "items": items, "nextPageToken": token }),
        None => serde_json::json!({ "items": items }),
    }
}

#[tokio::test]
async fn search_videos_resolves_statistics() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "n8n automation workflow"))
        .and(query_param("regionCode", "US"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&["abc"], None)))
        .mount(&server)
        .await;

    let videos_body = serde_json::json!({
        "items": [
            {
                "id": "abc",
                "snippet": {
                    "title": "n8n Slack automation tutorial",
                    "description": "Build a Slack workflow"
                },
                "statistics": {
                    "viewCount": "10000",
                    "likeCount": "500",
                    "commentCount": "50"
                }
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&videos_body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let items = client
        .search_videos("n8n automation workflow", Country::Us, 10)
        .await
        .expect("search should succeed");

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.source_item_id, "abc");
    assert_eq!(item.title, "n8n Slack automation tutorial");
    assert_eq!(item.evidence_url, "https://www.youtube.com/watch?v=abc");
    assert_eq!(item.metrics.get(METRIC_VIEWS), 10_000.0);
    assert_eq!(item.metrics.get(METRIC_LIKES), 500.0);
    assert_eq!(item.metrics.get(METRIC_COMMENTS), 50.0);
    assert_eq!(item.country, Some(Country::Us));
}

#[tokio::test]
async fn search_stops_at_max_items_across_pages() {
    let server = MockServer::start().await;

    // First page returns two ids and points at a next page.
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("pageToken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&["v3", "v4"], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_body(&["v1", "v2"], Some("page2"))),
        )
        .mount(&server)
        .await;

    let videos_body = serde_json::json!({
        "items": [
            { "id": "v1", "snippet": { "title": "one" }, "statistics": { "viewCount": "1" } },
            { "id": "v2", "snippet": { "title": "two" }, "statistics": { "viewCount": "2" } },
            { "id": "v3", "snippet": { "title": "three" }, "statistics": { "viewCount": "3" } }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "v1,v2,v3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&videos_body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let items = client
        .search_videos("n8n", Country::Us, 3)
        .await
        .expect("search should succeed");

    assert_eq!(items.len(), 3, "max_items must cap the id list");
}

#[tokio::test]
async fn missing_like_count_defaults_to_zero() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&["noburn"], None)))
        .mount(&server)
        .await;

    // Channels can hide like counts; the item must still normalize.
    let videos_body = serde_json::json!({
        "items": [
            {
                "id": "noburn",
                "snippet": { "title": "hidden likes" },
                "statistics": { "viewCount": "777" }
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&videos_body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let items = client.search_videos("n8n", Country::In, 5).await.unwrap();

    assert_eq!(items[0].metrics.get(METRIC_VIEWS), 777.0);
    assert_eq!(items[0].metrics.get(METRIC_LIKES), 0.0);
}

#[tokio::test]
async fn forbidden_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.search_videos("n8n", Country::Us, 5).await;

    assert!(matches!(result, Err(SourceError::Status { code: 403 })));
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    let server = MockServer::start().await;

    // First attempt 500, then success.
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(&[], None)))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let items = client
        .search_videos("n8n", Country::Us, 5)
        .await
        .expect("should recover after retry");

    assert!(items.is_empty());
}

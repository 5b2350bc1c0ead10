use axum::http::StatusCode;

use herald_client::ConfiguredAllowlist;
use herald_core::cursor::Cursor;

use crate::common::{get_json, setup_empty_app, setup_test_app};

#[tokio::test]
async fn health_reports_allowlist_size() {
    let app = setup_test_app(ConfiguredAllowlist::inline("kare11.com,mprnews.org"));
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["domains"], 2);
}

#[tokio::test]
async fn health_is_503_when_allowlist_unreadable() {
    let app = setup_test_app(ConfiguredAllowlist::from_file("/nonexistent/herald/domains.txt"));
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["allowlist"], "error");
}

#[tokio::test]
async fn topics_lists_vocabulary() {
    let (status, json) = get_json(setup_empty_app(), "/v1/topics").await;

    assert_eq!(status, StatusCode::OK);
    let topics = json["topics"].as_array().unwrap();
    assert!(topics.iter().any(|t| t["slug"] == "weather-flood"));
    assert!(topics.iter().all(|t| t["keywords"].as_array().is_some_and(|k| !k.is_empty())));
}

#[tokio::test]
async fn unknown_topic_is_rejected() {
    let (status, json) = get_json(setup_empty_app(), "/v1/news?topics=wildfire,alien-invasion").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
    assert!(json["message"].as_str().unwrap().contains("alien-invasion"));
}

#[tokio::test]
async fn malformed_cursor_is_rejected() {
    let (status, json) = get_json(setup_empty_app(), "/v1/news?cursor=not*a*cursor").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_cursor");
}

#[tokio::test]
async fn cursor_with_unknown_topic_is_rejected() {
    let cursor: Cursor = serde_json::from_value(serde_json::json!({
        "topicFilters": ["alien-invasion"],
        "sinceTimestamp": "2025-06-01T00:00:00Z",
        "pageSize": 10,
        "pageNumber": 2
    }))
    .unwrap();
    let token = cursor.encode().unwrap();
    let (status, _) = get_json(setup_empty_app(), &format!("/v1/news?cursor={token}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_since_and_blank_location_are_rejected() {
    let (status, _) = get_json(setup_empty_app(), "/v1/news?since=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(setup_empty_app(), "/v1/news?location=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_allowlist_returns_empty_page() {
    let (status, json) = get_json(
        setup_empty_app(),
        "/v1/news?topics=weather-flood&q=river&location=Duluth&limit=5",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["items"], serde_json::json!([]));
    assert_eq!(json["hasMore"], false);
    assert!(json.get("nextCursor").is_none());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, json) = get_json(setup_empty_app(), "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/v1/news"].is_object());
}

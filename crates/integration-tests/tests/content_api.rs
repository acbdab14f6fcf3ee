//! Content API integration tests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;
use staffline_integration_tests::TestContext;

#[tokio::test]
async fn test_get_all_returns_defaults_for_empty_store() {
    let ctx = TestContext::new();

    let response = ctx.get("/api/content-clean").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["news"], json!([]));
    assert_eq!(body["portfolio"], json!([]));
    assert_eq!(body["settings"]["siteName"], "Staffline");
    assert!(body["categories"]["portfolio"].is_array());
}

#[tokio::test]
async fn test_get_unknown_type_is_bad_request() {
    let ctx = TestContext::new();

    let response = ctx.get("/api/content-clean?type=users").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].as_str().unwrap().contains("users"));
}

#[tokio::test]
async fn test_save_requires_admin() {
    let ctx = TestContext::new();
    let body = json!({ "type": "news", "data": [] });

    let response = ctx.post_json("/api/content-clean", &body, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "Authentication required");

    let response = ctx
        .post_json("/api/content-clean", &body, Some("forged.token"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_save_news_assigns_ids_and_timestamps() {
    let ctx = TestContext::new();
    let body = json!({
        "type": "news",
        "data": [
            { "title": "New edition of the Goldberg Variations", "date": "2024-03-09", "published": true },
            { "id": "studio-move", "title": "We moved", "date": "2024-01-15", "published": false }
        ]
    });

    let response = ctx.post_json_as_admin("/api/content-clean", &body).await;

    assert_eq!(response.status, StatusCode::OK);
    let saved = response.json();
    assert_eq!(saved["success"], true);
    assert_eq!(saved["type"], "news");
    assert!(saved["updatedAt"].is_string());

    let items = saved["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0]["id"].as_str().unwrap().starts_with("news-"));
    assert_eq!(items[1]["id"], "studio-move");
    assert!(items[0]["updatedAt"].is_string());

    let stored = ctx.get("/api/content-clean?type=news").await.json();
    assert_eq!(stored, saved["data"]);
    assert!(ctx.store_root().join("clean-data/news.json").exists());
}

#[tokio::test]
async fn test_save_rejects_invalid_documents() {
    let ctx = TestContext::new();

    let missing_title = json!({ "type": "portfolio", "data": [{ "composer": "Bach" }] });
    let response = ctx
        .post_json_as_admin("/api/content-clean", &missing_title)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].as_str().unwrap().contains("title"));

    let duplicate = json!({
        "type": "services",
        "data": [{ "id": "engraving", "title": "A" }, { "id": "engraving", "title": "B" }]
    });
    let response = ctx.post_json_as_admin("/api/content-clean", &duplicate).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let wrong_shape = json!({ "type": "news", "data": { "title": "not a list" } });
    let response = ctx.post_json_as_admin("/api/content-clean", &wrong_shape).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Nothing was written
    assert!(!ctx.store_root().join("clean-data/portfolio.json").exists());
    assert!(!ctx.store_root().join("clean-data/services.json").exists());
}

#[tokio::test]
async fn test_save_rejects_malformed_json_body() {
    let ctx = TestContext::new();
    let token = ctx.admin_token();

    let request = axum::http::Request::post("/api/content-clean")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::from("{\"type\": \"news\""))
        .unwrap();
    let response = ctx.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn test_settings_round_trip() {
    let ctx = TestContext::new();
    let body = json!({
        "type": "settings",
        "data": { "siteName": "Staffline Engraving", "contactEmail": "studio@example.com" }
    });

    let response = ctx.post_json_as_admin("/api/content-clean", &body).await;
    assert_eq!(response.status, StatusCode::OK);

    let settings = ctx.get("/api/content-clean?type=settings").await.json();
    assert_eq!(settings["siteName"], "Staffline Engraving");
    assert_eq!(settings["contactEmail"], "studio@example.com");

    let home = ctx.get("/").await;
    assert!(home.text().contains("Staffline Engraving"));
}

#[tokio::test]
async fn test_html_page_round_trip() {
    let ctx = TestContext::new();

    let empty = ctx.get("/api/content-html?page=imprint").await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.json()["html"], "");

    let body = json!({ "page": "imprint", "html": "<h2>Legal notice</h2><p>Staffline GmbH</p>" });
    let response = ctx.post_json_as_admin("/api/content-html", &body).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "success": true, "page": "imprint" }));

    let stored = ctx.get("/api/content-html?page=imprint").await.json();
    assert_eq!(stored["page"], "imprint");
    assert_eq!(stored["html"], "<h2>Legal notice</h2><p>Staffline GmbH</p>");

    let page = ctx.get("/imprint").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.text().contains("<p>Staffline GmbH</p>"));
}

#[tokio::test]
async fn test_html_unknown_page_is_bad_request() {
    let ctx = TestContext::new();

    let response = ctx.get("/api/content-html?page=terms").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.get("/api/content-html").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let body = json!({ "page": "terms", "html": "<p>x</p>" });
    let response = ctx.post_json_as_admin("/api/content-html", &body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let ctx = TestContext::new();

    let response = ctx.get("/api/nothing-here").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.json()["error"].is_string());
}

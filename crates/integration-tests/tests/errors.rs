//! Error pages, 404 fallback and CSRF rejection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, LOCATION};

use bamazon_integration_tests::{CountingUserStore, TestApp};

async fn shop() -> TestApp {
    TestApp::spawn_shop(Arc::new(CountingUserStore::default())).await
}

#[tokio::test]
async fn test_server_error_route_renders_view() {
    let app = shop().await;

    let response = app.client.get(app.url("/500")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response.headers()[CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    assert!(response.text().await.unwrap().contains("Some error occurred!"));
}

#[tokio::test]
async fn test_unknown_path_renders_not_found_view() {
    let app = shop().await;

    let response = app
        .client
        .get(app.url("/definitely/not/here"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("Page Not Found!"));
}

#[tokio::test]
async fn test_unknown_post_renders_not_found_view() {
    let app = shop().await;
    let token = app.csrf_token("/login").await;

    let response = app
        .client
        .post(app.url("/nowhere"))
        .form(&[("_csrf", token.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method_renders_not_found_view() {
    let app = shop().await;

    let response = app.client.get(app.url("/logout")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("Page Not Found!"));

    let response = app
        .client
        .get(app.url("/admin/delete-product"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_incomplete_form_renders_error_view() {
    let app = shop().await;
    let token = app.csrf_token("/login").await;

    let response = app
        .client
        .post(app.url("/cart-delete-item"))
        .form(&[("_csrf", token.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("Some error occurred!"));
    assert!(!body.contains("missing field"));
}

#[tokio::test]
async fn test_post_without_token_is_forbidden() {
    let app = shop().await;
    // Establish a session so the token exists server side.
    app.csrf_token("/login").await;

    let response = app.client.post(app.url("/logout")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.text().await.unwrap().contains("Forbidden"));
}

#[tokio::test]
async fn test_post_with_wrong_token_is_forbidden() {
    let app = shop().await;
    app.csrf_token("/login").await;

    let response = app
        .client
        .post(app.url("/logout"))
        .form(&[("_csrf", "not-the-token")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_post_with_session_token_passes() {
    let app = shop().await;
    let token = app.csrf_token("/login").await;

    let response = app
        .client
        .post(app.url("/logout"))
        .form(&[("_csrf", token.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/");
}

#[tokio::test]
async fn test_token_accepted_from_header() {
    let app = shop().await;
    let token = app.csrf_token("/login").await;

    let response = app
        .client
        .post(app.url("/logout"))
        .header("x-csrf-token", token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_missing_static_file_falls_through_to_not_found() {
    let app = shop().await;

    let response = app
        .client
        .get(app.url("/images/missing.png"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("Page Not Found!"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = shop().await;

    let response = app
        .client
        .get(app.url("/login"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-me-123");
}

//! Authentication hydration through the full pipeline.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{Router, routing::get};
use reqwest::StatusCode;
use reqwest::header::COOKIE;

use bamazon_core::{Email, UserId};
use bamazon_integration_tests::{CountingUserStore, FailingUserStore, TestApp, test_user};
use bamazon_shop::middleware::OptionalUser;
use bamazon_shop::models::SessionUser;
use bamazon_shop::state::AppState;

/// Reports the email of the hydrated user, or `anonymous`.
async fn whoami(OptionalUser(user): OptionalUser) -> String {
    user.map_or_else(|| "anonymous".to_string(), |u| u.email.into_inner())
}

fn probe_routes() -> Router<AppState> {
    Router::new().route("/whoami", get(whoami))
}

fn reference(id: i32, email: &str) -> SessionUser {
    SessionUser {
        id: UserId::new(id),
        email: Email::parse(email).unwrap(),
    }
}

#[tokio::test]
async fn test_anonymous_request_never_queries_user_store() {
    let users = Arc::new(CountingUserStore::default());
    let app = TestApp::spawn(probe_routes(), users.clone()).await;

    let response = app.client.get(app.url("/whoami")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "anonymous");
    assert_eq!(users.calls(), 0);
}

#[tokio::test]
async fn test_session_reference_resolves_fresh_record() {
    // The store holds a newer email than the one cached in the session.
    let users = Arc::new(CountingUserStore::with_users([test_user(
        7,
        "ada@new.example.com",
    )]));
    let app = TestApp::spawn(probe_routes(), users.clone()).await;
    let cookie = app.seed_session(&reference(7, "ada@old.example.com")).await;

    let response = app
        .client
        .get(app.url("/whoami"))
        .header(COOKIE, cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ada@new.example.com");
    assert_eq!(users.calls(), 1);
}

#[tokio::test]
async fn test_stale_reference_continues_anonymously() {
    let users = Arc::new(CountingUserStore::default());
    let app = TestApp::spawn(probe_routes(), users.clone()).await;
    let cookie = app.seed_session(&reference(42, "gone@example.com")).await;

    let response = app
        .client
        .get(app.url("/whoami"))
        .header(COOKIE, cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "anonymous");
    assert_eq!(users.calls(), 1);
}

#[tokio::test]
async fn test_lookup_failure_renders_server_error_once() {
    let users = Arc::new(FailingUserStore::default());
    let app = TestApp::spawn(probe_routes(), users.clone()).await;
    let cookie = app.seed_session(&reference(7, "ada@example.com")).await;

    let response = app
        .client
        .get(app.url("/whoami"))
        .header(COOKIE, cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap();
    assert!(body.contains("Some error occurred!"));
    assert!(!body.contains("ada@example.com"));
    assert_eq!(users.calls(), 1);
}

#[tokio::test]
async fn test_each_request_queries_store_again() {
    let users = Arc::new(CountingUserStore::with_users([test_user(
        7,
        "ada@example.com",
    )]));
    let app = TestApp::spawn(probe_routes(), users.clone()).await;
    let cookie = app.seed_session(&reference(7, "ada@example.com")).await;

    for _ in 0..3 {
        let response = app
            .client
            .get(app.url("/whoami"))
            .header(COOKIE, cookie.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(users.calls(), 3);
}

//! Multipart image upload through the full pipeline.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    routing::{get, post},
};
use reqwest::StatusCode;
use reqwest::multipart::{Form as Multipart, Part};
use serde_json::{Value, json};

use bamazon_integration_tests::{CountingUserStore, TestApp};
use bamazon_shop::middleware::{MaybeImage, ViewContext};
use bamazon_shop::state::AppState;

/// Echoes the upload result and the decoded text fields.
async fn echo(
    MaybeImage(image): MaybeImage,
    Form(fields): Form<std::collections::BTreeMap<String, String>>,
) -> Json<Value> {
    Json(json!({
        "image": image.as_ref().map(|i| i.public_path()),
        "original_name": image.as_ref().map(|i| i.original_name.clone()),
        "size": image.as_ref().map(|i| i.size),
        "title": fields.get("title"),
    }))
}

/// Minimal page carrying the session's CSRF token.
async fn form_page(ctx: ViewContext) -> String {
    format!(r#"<form><input type="hidden" name="_csrf" value="{}"></form>"#, ctx.csrf_token)
}

async fn spawn() -> TestApp {
    let routes: Router<AppState> = Router::new()
        .route("/form", get(form_page))
        .route("/echo", post(echo));
    TestApp::spawn(routes, Arc::new(CountingUserStore::default())).await
}

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";

fn image_part(bytes: &'static [u8], name: &str, mime: &str) -> Part {
    Part::bytes(bytes)
        .file_name(name.to_string())
        .mime_str(mime)
        .unwrap()
}

#[tokio::test]
async fn test_png_is_stored_and_attached() {
    let app = spawn().await;
    let token = app.csrf_token("/form").await;

    let form = Multipart::new()
        .text("_csrf", token)
        .text("title", "Blue Mug")
        .part("image", image_part(PNG_BYTES, "mug.png", "image/png"));

    let response = app
        .client
        .post(app.url("/echo"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Blue Mug");
    assert_eq!(body["original_name"], "mug.png");
    assert_eq!(body["size"], PNG_BYTES.len());

    let public_path = body["image"].as_str().unwrap();
    assert!(public_path.starts_with("/images/"));
    assert!(public_path.ends_with("-mug.png"));

    let stored = app.stored_images();
    assert_eq!(stored.len(), 1);
    assert_eq!(format!("/images/{}", stored[0]), public_path);
}

#[tokio::test]
async fn test_stored_image_is_served() {
    let app = spawn().await;
    let token = app.csrf_token("/form").await;

    let form = Multipart::new()
        .text("_csrf", token)
        .part("image", image_part(PNG_BYTES, "mug.png", "image/png"));
    let body: Value = app
        .client
        .post(app.url("/echo"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let public_path = body["image"].as_str().unwrap();
    let response = app.client.get(app.url(public_path)).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn test_disallowed_type_is_dropped_without_error() {
    let app = spawn().await;
    let token = app.csrf_token("/form").await;

    let form = Multipart::new()
        .text("_csrf", token)
        .text("title", "Notes")
        .part("image", image_part(b"plain text", "notes.txt", "text/plain"));

    let response = app
        .client
        .post(app.url("/echo"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["image"], Value::Null);
    assert_eq!(body["title"], "Notes");
    assert!(app.stored_images().is_empty());
}

#[tokio::test]
async fn test_multipart_without_token_is_forbidden() {
    let app = spawn().await;
    app.csrf_token("/form").await;

    let form = Multipart::new()
        .text("title", "Blue Mug")
        .part("image", image_part(PNG_BYTES, "mug.png", "image/png"));

    let response = app
        .client
        .post(app.url("/echo"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // The refused request leaves no file behind.
    assert!(app.stored_images().is_empty());
}

#[tokio::test]
async fn test_unexpected_file_field_renders_server_error() {
    let app = spawn().await;
    let token = app.csrf_token("/form").await;

    let form = Multipart::new()
        .text("_csrf", token)
        .part("image", image_part(PNG_BYTES, "mug.png", "image/png"))
        .part("avatar", image_part(PNG_BYTES, "me.png", "image/png"));

    let response = app
        .client
        .post(app.url("/echo"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await.unwrap().contains("Some error occurred!"));
    assert!(app.stored_images().is_empty());
}

#[tokio::test]
async fn test_second_image_renders_server_error() {
    let app = spawn().await;
    let token = app.csrf_token("/form").await;

    let form = Multipart::new()
        .text("_csrf", token)
        .part("image", image_part(PNG_BYTES, "a.png", "image/png"))
        .part("image", image_part(PNG_BYTES, "b.png", "image/png"));

    let response = app
        .client
        .post(app.url("/echo"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.stored_images().is_empty());
}

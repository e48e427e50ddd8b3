//! Terminal error renderer.
//!
//! Responses produced from an [`AppError`](crate::error::AppError) carry an
//! [`ErrorPage`] marker. This stage swaps their plain-text body for the
//! matching HTML view while keeping the status code.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::context::ViewContext;
use crate::error::ErrorPage;
use crate::routes::errors;

/// Middleware that renders error views for marked responses.
pub async fn render_error_pages(session: Session, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    let status = response.status();
    let ctx = ViewContext::from_session(&session).await;
    let mut rendered = errors::render(page, ctx).into_response();
    *rendered.status_mut() = status;
    rendered
}

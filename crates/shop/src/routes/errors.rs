//! Error views: `GET /500`, the 404 fallback and the renderer used by the
//! terminal error stage.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, ErrorPage};
use crate::middleware::ViewContext;

#[derive(Template, WebTemplate)]
#[template(path = "errors/404.html")]
pub struct NotFoundTemplate {
    pub ctx: ViewContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "errors/403.html")]
pub struct ForbiddenTemplate {
    pub ctx: ViewContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "errors/500.html")]
pub struct ServerErrorTemplate {
    pub ctx: ViewContext,
}

/// Render the view for an error page. The caller sets the status.
#[must_use]
pub fn render(page: ErrorPage, ctx: ViewContext) -> Response {
    match page {
        ErrorPage::NotFound => NotFoundTemplate { ctx }.into_response(),
        ErrorPage::Forbidden => ForbiddenTemplate { ctx }.into_response(),
        ErrorPage::ServerError => ServerErrorTemplate { ctx }.into_response(),
    }
}

/// `GET /500`
pub async fn server_error(ctx: ViewContext) -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, ServerErrorTemplate { ctx })
}

/// Fallback for every unmatched request.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

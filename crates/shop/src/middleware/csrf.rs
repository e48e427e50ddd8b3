//! Per-session CSRF protection.
//!
//! Every request gets the session's token (created on first use) as a
//! [`CsrfToken`] extension for templates. State-changing requests must echo it
//! back in the `_csrf` form field, the `_csrf` query parameter, or one of the
//! `csrf-token` / `x-csrf-token` / `x-xsrf-token` headers; otherwise they are
//! refused with 403 before reaching any handler. An image stored by the
//! upload stage for a refused request is removed.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{HeaderMap, Method, header, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use tower_sessions::Session;

use super::upload::UploadedImage;
use crate::error::AppError;
use crate::models::session_keys;

/// Name of the form field and query parameter carrying the token.
pub const CSRF_FIELD: &str = "_csrf";

const CSRF_HEADERS: [&str; 3] = ["csrf-token", "x-csrf-token", "x-xsrf-token"];

/// The current session's CSRF token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// Generate a new random token (256-bit, URL-safe base64).
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!(
                "CSRF token not found in request extensions - middleware may be misconfigured"
            );
            Self(String::new())
        }))
    }
}

/// Load the session's token, creating and storing one if absent.
async fn session_token(session: &Session) -> Result<CsrfToken, AppError> {
    if let Some(token) = session.get::<String>(session_keys::CSRF_TOKEN).await? {
        return Ok(CsrfToken(token));
    }
    let token = CsrfToken::generate();
    session.insert(session_keys::CSRF_TOKEN, token.value()).await?;
    Ok(token)
}

/// Methods that never change state and are therefore not checked.
const fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Middleware that issues the session token and validates it on unsafe methods.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when the submitted token is missing or wrong,
/// and `AppError::Session` if the session cannot be read or written.
pub async fn csrf_guard(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&session).await?;
    let (mut parts, body) = request.into_parts();
    parts.extensions.insert(token.clone());

    if is_safe_method(&parts.method) {
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    // Body size is bounded by the outer request body limit layer.
    let (body, form_token) = if is_form(&parts.headers) {
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| AppError::BadRequest(format!("unreadable request body: {e}")))?;
        let form_token = token_from_form(&bytes);
        (Body::from(bytes), form_token)
    } else {
        (body, None)
    };

    let submitted = form_token
        .or_else(|| parts.uri.query().and_then(|q| token_from_form(q.as_bytes())))
        .or_else(|| token_from_headers(&parts.headers));

    let valid = submitted
        .as_deref()
        .is_some_and(|submitted| constant_time_compare(submitted, token.value()));

    if !valid {
        tracing::warn!(
            method = %parts.method,
            path = %parts.uri.path(),
            token_present = submitted.is_some(),
            "Rejected request with invalid CSRF token"
        );
        if let Some(image) = parts.extensions.get::<UploadedImage>() {
            image.discard().await;
        }
        return Err(AppError::Forbidden("invalid CSRF token".to_string()));
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.split(';')
                .next()
                .is_some_and(|essence| {
                    essence
                        .trim()
                        .eq_ignore_ascii_case("application/x-www-form-urlencoded")
                })
        })
}

fn token_from_form(bytes: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(bytes)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    CSRF_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    })
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

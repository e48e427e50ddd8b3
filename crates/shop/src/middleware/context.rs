//! Per-request values every view needs.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::auth::is_logged_in;
use super::csrf::CsrfToken;
use crate::models::session_keys;

/// Values shared by all templates: login state and the CSRF token for forms.
#[derive(Debug, Clone, Default)]
pub struct ViewContext {
    pub is_authenticated: bool,
    pub csrf_token: String,
}

impl ViewContext {
    /// Build the context straight from the session, for code running outside
    /// the CSRF stage.
    pub async fn from_session(session: &Session) -> Self {
        let csrf_token = session
            .get::<String>(session_keys::CSRF_TOKEN)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        Self {
            is_authenticated: is_logged_in(session).await,
            csrf_token,
        }
    }
}

impl<S> FromRequestParts<S> for ViewContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_authenticated = match parts.extensions.get::<Session>() {
            Some(session) => is_logged_in(session).await,
            None => false,
        };
        let csrf_token = parts
            .extensions
            .get::<CsrfToken>()
            .map(|token| token.value().to_string())
            .unwrap_or_default();

        Ok(Self {
            is_authenticated,
            csrf_token,
        })
    }
}

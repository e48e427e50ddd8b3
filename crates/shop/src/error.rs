//! Unified error handling with Sentry integration.
//!
//! Every stage of the request pipeline and every route handler returns
//! `Result<T, AppError>`. Converting an `AppError` into a response captures
//! server errors to Sentry and tags the response with an [`ErrorPage`] marker;
//! the terminal renderer in [`crate::middleware::error_page`] swaps the body
//! for the matching HTML view.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::middleware::upload::UploadError;
use crate::services::auth::AuthError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed (including user lookups during hydration).
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session store load/save failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Multipart parsing or image storage failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request refused (e.g. missing or wrong CSRF token).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Which error view the terminal renderer should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPage {
    NotFound,
    Forbidden,
    ServerError,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Upload(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Which error view represents this error.
    #[must_use]
    pub fn page(&self) -> ErrorPage {
        match self {
            Self::NotFound(_) => ErrorPage::NotFound,
            Self::Forbidden(_) => ErrorPage::Forbidden,
            _ => ErrorPage::ServerError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut response = (status, message).into_response();
        response.extensions_mut().insert(self.page());
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request hub.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_and_page(err: AppError) -> (StatusCode, Option<ErrorPage>) {
        let response = err.into_response();
        (
            response.status(),
            response.extensions().get::<ErrorPage>().copied(),
        )
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 12".to_string());
        assert_eq!(err.to_string(), "Not found: product 12");
    }

    #[test]
    fn test_store_failures_are_server_errors() {
        assert_eq!(
            status_and_page(AppError::Database(RepositoryError::Database(
                sqlx::Error::PoolTimedOut
            ))),
            (StatusCode::INTERNAL_SERVER_ERROR, Some(ErrorPage::ServerError))
        );
        assert_eq!(
            status_and_page(AppError::Internal("boom".to_string())),
            (StatusCode::INTERNAL_SERVER_ERROR, Some(ErrorPage::ServerError))
        );
    }

    #[test]
    fn test_client_errors_keep_their_status() {
        assert_eq!(
            status_and_page(AppError::NotFound("x".to_string())),
            (StatusCode::NOT_FOUND, Some(ErrorPage::NotFound))
        );
        assert_eq!(
            status_and_page(AppError::Forbidden("csrf".to_string())),
            (StatusCode::FORBIDDEN, Some(ErrorPage::Forbidden))
        );
        assert_eq!(
            status_and_page(AppError::BadRequest("x".to_string())),
            (StatusCode::BAD_REQUEST, Some(ErrorPage::ServerError))
        );
        assert_eq!(
            status_and_page(AppError::Auth(AuthError::InvalidCredentials)),
            (StatusCode::BAD_REQUEST, Some(ErrorPage::ServerError))
        );
    }
}

//! Authentication hydration middleware and extractors.
//!
//! The session only holds a [`SessionUser`] reference. On every request that
//! carries one, [`hydrate_user`] fetches the full record from the user store
//! and attaches it as a [`CurrentUser`] extension; handlers read it through
//! [`OptionalUser`] or [`RequireUser`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{SessionUser, User, session_keys};
use crate::state::AppState;

/// The user resolved for this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Middleware that resolves the session's user reference.
///
/// - No reference: the request continues anonymously without touching the store.
/// - Reference to an existing user: [`CurrentUser`] is attached.
/// - Reference to a user that no longer exists: the request continues anonymously.
///
/// # Errors
///
/// Returns `AppError::Database` if the lookup fails and `AppError::Session` if
/// the session cannot be read. The request is not forwarded in either case.
pub async fn hydrate_user(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(reference) = session.get::<SessionUser>(session_keys::USER).await? else {
        return Ok(next.run(request).await);
    };

    match state.users().find_by_id(reference.id).await? {
        Some(user) => {
            set_sentry_user(&user.id, Some(user.email.as_str()));
            request.extensions_mut().insert(CurrentUser(user));
        }
        None => {
            tracing::debug!(user_id = %reference.id, "Session references a missing user");
        }
    }

    Ok(next.run(request).await)
}

/// Extractor that requires an authenticated user.
///
/// Anonymous requests are redirected to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Orders for {}", user.email)
/// }
/// ```
pub struct RequireUser(pub User);

/// Rejection for [`RequireUser`].
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        Redirect::to("/login").into_response()
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .map(|CurrentUser(user)| Self(user.clone()))
            .ok_or(AuthRejection)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike [`RequireUser`], this never rejects.
pub struct OptionalUser(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<CurrentUser>()
                .map(|CurrentUser(user)| user.clone()),
        ))
    }
}

/// Whether the session carries the login marker.
pub async fn is_logged_in(session: &Session) -> bool {
    session
        .get::<bool>(session_keys::IS_LOGGED_IN)
        .await
        .ok()
        .flatten()
        .unwrap_or(false)
}

/// Mark the session as logged in as `user`. The session ID is rotated first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn log_in(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::IS_LOGGED_IN, true).await?;
    session
        .insert(session_keys::USER, SessionUser::from(user))
        .await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(())
}

/// Destroy the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted from the store.
pub async fn log_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bamazon_core::{Email, UserId};
    use chrono::Utc;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user() -> User {
        User {
            id: UserId::new(7),
            email: Email::parse("ada@example.com").unwrap(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_log_in_sets_marker_and_reference() {
        let session = session();
        assert!(!is_logged_in(&session).await);

        log_in(&session, &user()).await.unwrap();

        assert!(is_logged_in(&session).await);
        let reference: SessionUser = session.get(session_keys::USER).await.unwrap().unwrap();
        assert_eq!(reference.id, UserId::new(7));
        assert_eq!(reference.email.as_str(), "ada@example.com");
    }

    #[tokio::test]
    async fn test_log_out_clears_everything() {
        let session = session();
        log_in(&session, &user()).await.unwrap();
        session.insert(session_keys::CSRF_TOKEN, "tok").await.unwrap();

        log_out(&session).await.unwrap();

        assert!(!is_logged_in(&session).await);
        assert!(
            session
                .get::<SessionUser>(session_keys::USER)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            session
                .get::<String>(session_keys::CSRF_TOKEN)
                .await
                .unwrap()
                .is_none()
        );
    }
}

//! One-shot flash messages stored in the session.
//!
//! A message pushed during one request is shown by the next view that takes
//! it, then gone. Messages are grouped by kind (`error`, `success`).

use std::collections::BTreeMap;

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session_keys;

pub const ERROR: &str = "error";
pub const SUCCESS: &str = "success";

type Messages = BTreeMap<String, Vec<String>>;

/// Handle for reading and writing flash messages of the current session.
#[derive(Clone, Debug)]
pub struct Flash {
    session: Session,
}

impl Flash {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    async fn load(&self) -> Result<Messages, tower_sessions::session::Error> {
        Ok(self
            .session
            .get::<Messages>(session_keys::FLASH)
            .await?
            .unwrap_or_default())
    }

    /// Queue a message for the next request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn push(
        &self,
        kind: &str,
        message: impl Into<String>,
    ) -> Result<(), tower_sessions::session::Error> {
        let mut messages = self.load().await?;
        messages
            .entry(kind.to_string())
            .or_default()
            .push(message.into());
        self.session.insert(session_keys::FLASH, messages).await
    }

    /// Remove and return all queued messages of one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn take(&self, kind: &str) -> Result<Vec<String>, tower_sessions::session::Error> {
        let mut messages = self.load().await?;
        let Some(taken) = messages.remove(kind) else {
            return Ok(Vec::new());
        };
        if messages.is_empty() {
            self.session.remove::<Messages>(session_keys::FLASH).await?;
        } else {
            self.session.insert(session_keys::FLASH, messages).await?;
        }
        Ok(taken)
    }

    /// Remove all queued messages of one kind and return the first.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn take_first(
        &self,
        kind: &str,
    ) -> Result<Option<String>, tower_sessions::session::Error> {
        Ok(self.take(kind).await?.into_iter().next())
    }
}

/// Middleware that attaches a [`Flash`] handle to the request.
pub async fn attach_flash(session: Session, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(Flash::new(session));
    next.run(request).await
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Internal("flash middleware not installed".to_string()))
    }
}

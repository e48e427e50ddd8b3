//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during signup and login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bamazon_core::EmailError),

    /// Wrong password or unknown email.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Signup with an email that is already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too short.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords have to match")]
    PasswordMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show on the login and signup forms.
    ///
    /// `None` for server-side failures, which are reported as errors instead.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::InvalidEmail(_) => Some("Please enter a valid email.".to_owned()),
            Self::InvalidCredentials => Some("Invalid email or password.".to_owned()),
            Self::UserAlreadyExists => {
                Some("E-Mail exists already, please pick a different one.".to_owned())
            }
            Self::WeakPassword(msg) => Some(msg.clone()),
            Self::PasswordMismatch => Some("Passwords have to match!".to_owned()),
            Self::Repository(_) | Self::PasswordHash => None,
        }
    }
}

//! Types stored in the session.

use serde::{Deserialize, Serialize};

use bamazon_core::{Email, UserId};

use super::User;

/// Session-stored user reference.
///
/// Only the identifier is trusted; the full record is fetched again on every
/// request by the hydration middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Email,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Login marker, `true` once the user has authenticated.
    pub const IS_LOGGED_IN: &str = "is_logged_in";

    /// The logged-in [`super::SessionUser`].
    pub const USER: &str = "user";

    /// Anti-forgery token for this session.
    pub const CSRF_TOKEN: &str = "csrf_token";

    /// Pending one-shot flash messages.
    pub const FLASH: &str = "flash";

    /// Shopping cart.
    pub const CART: &str = "cart";
}

//! User domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bamazon_core::{Email, UserId};

/// A shop user.
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

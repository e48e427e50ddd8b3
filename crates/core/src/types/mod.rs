//! Core types for Bamazon.

pub mod email;
pub mod id;

pub use email::{Email, EmailError};
pub use id::{IdParseError, OrderId, ProductId, UserId};

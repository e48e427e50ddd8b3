//! Domain models for the shop.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartLine};
pub use order::{Order, OrderItem};
pub use product::{Product, ProductInput, ProductValidationError};
pub use session::{SessionUser, keys as session_keys};
pub use user::User;

//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bamazon_core::{Email, OrderId, ProductId, UserId};

/// A line in a placed order.
///
/// Title and price are copied at order time so later product edits or
/// deletions leave the order history intact.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Total formatted with two decimal places.
    #[must_use]
    pub fn display_total(&self) -> String {
        format!("{:.2}", self.total())
    }
}

//! Placed orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId, UserId};
use super::price::Price;

/// Product snapshot stored inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub emoji: String,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// A completed checkout. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    /// Grand total charged, tax included.
    pub total: Price,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Display reference: first eight characters of the id.
    #[must_use]
    pub fn reference(&self) -> String {
        self.id.short()
    }
}

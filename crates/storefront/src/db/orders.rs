//! Order repository.
//!
//! Orders are written once at checkout and never modified. Line items are
//! stored as a JSON array of product snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quickmart_core::{Order, OrderId, OrderItem, Price, ProductId, UserId};

use super::RepositoryError;
use crate::supabase::RestClient;

const TABLE: &str = "orders";

/// One element of the `orders.items` JSON array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRow {
    pub id: i64,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: Price::new(row.price),
            quantity: row.quantity,
            emoji: row.emoji.unwrap_or_default(),
        }
    }
}

impl From<&OrderItem> for OrderItemRow {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id.as_i64(),
            name: item.name.clone(),
            price: item.price.amount(),
            quantity: item.quantity,
            category: None,
            emoji: Some(item.emoji.clone()),
        }
    }
}

/// A row of the `orders` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItemRow>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.into_iter().map(OrderItem::from).collect(),
            total: Price::new(row.total),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct OrderInsert {
    user_id: UserId,
    items: Vec<OrderItemRow>,
    #[serde(with = "rust_decimal::serde::float")]
    total: Decimal,
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    rest: &'a RestClient,
    token: Option<&'a SecretString>,
}

impl<'a> OrderRepository<'a> {
    /// Create a repository that reads anonymously.
    #[must_use]
    pub const fn new(rest: &'a RestClient) -> Self {
        Self { rest, token: None }
    }

    /// Act as the signed-in user.
    #[must_use]
    pub const fn as_user(mut self, token: &'a SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Write one order and return it as stored.
    ///
    /// `total` is the grand total charged, tax included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert is rejected.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        items: &[OrderItem],
        total: Price,
    ) -> Result<Order, RepositoryError> {
        let body = OrderInsert {
            user_id,
            items: items.iter().map(OrderItemRow::from).collect(),
            total: total.amount(),
        };
        let row: OrderRow = self
            .rest
            .table(TABLE)
            .with_token(self.token)
            .insert(&body)
            .await?;
        tracing::info!(order_id = %row.id, total = %total, "Order created");
        Ok(row.into())
    }

    /// A user's orders, newest first. Empty if the read fails.
    pub async fn get_user_orders(&self, user_id: UserId) -> Vec<Order> {
        let result: Result<Vec<OrderRow>, _> = self
            .rest
            .table(TABLE)
            .select("*")
            .eq("user_id", user_id)
            .order("created_at", false)
            .with_token(self.token)
            .fetch()
            .await;

        match result {
            Ok(rows) => rows.into_iter().map(Order::from).collect(),
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Failed to load orders");
                Vec::new()
            }
        }
    }

    /// Every order, newest first. Empty if the read fails.
    pub async fn get_all_orders(&self) -> Vec<Order> {
        let result: Result<Vec<OrderRow>, _> = self
            .rest
            .table(TABLE)
            .select("*")
            .order("created_at", false)
            .with_token(self.token)
            .fetch()
            .await;

        match result {
            Ok(rows) => rows.into_iter().map(Order::from).collect(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load all orders");
                Vec::new()
            }
        }
    }
}

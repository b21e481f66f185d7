//! Transient shopping cart.
//!
//! The cart lives in the shopper's session and is never written to the
//! store until checkout. Each line holds a copy of the product taken when
//! it was added, so later catalog edits or deletions don't reach into an
//! open cart.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::product::Product;

/// A product snapshot with a quantity. Quantity is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity
    }
}

/// Ordered list of cart lines, one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add one unit of `product`.
    ///
    /// If the product is already in the cart its quantity goes up by one;
    /// otherwise a new line with quantity 1 is appended.
    pub fn add(&mut self, product: Product) {
        match self.items.iter_mut().find(|item| item.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(CartItem {
                product,
                quantity: 1,
            }),
        }
    }

    /// Change a line's quantity by `delta`, never going below 1.
    ///
    /// Returns `false` if the product isn't in the cart.
    pub fn update_quantity(&mut self, id: ProductId, delta: i32) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.product.id == id) else {
            return false;
        };
        let next = i64::from(item.quantity) + i64::from(delta);
        item.quantity = u32::try_from(next.max(1)).unwrap_or(u32::MAX);
        true
    }

    /// Remove a line. Returns `false` if the product isn't in the cart.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != id);
        self.items.len() != before
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of price × quantity. Tax is not included here; see [`crate::Bill`].
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

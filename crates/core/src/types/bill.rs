//! Bill (receipt) generation.
//!
//! A bill is computed from the cart at checkout time. This is the only
//! place tax is applied: the cart itself shows the untaxed subtotal.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::Cart;
use super::id::ProductId;
use super::order::OrderItem;
use super::price::Price;

/// Flat sales tax applied at bill generation (5%).
pub const TAX_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Exclusive upper bound for generated invoice numbers.
const INVOICE_NUMBER_RANGE: u32 = 100_000;

/// One printed line of a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub product_id: ProductId,
    pub name: String,
    pub emoji: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// A computed bill for the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub invoice_number: u32,
    pub issued_at: DateTime<Utc>,
    pub customer_name: String,
    pub lines: Vec<BillLine>,
    pub subtotal: Price,
    /// `subtotal × 5%`, rounded to paise.
    pub tax: Price,
    /// `subtotal × 1.05`, rounded to paise.
    pub grand_total: Price,
}

impl Bill {
    /// Build a bill from the cart.
    ///
    /// Returns `None` for an empty cart: there is nothing to bill.
    #[must_use]
    pub fn from_cart(
        cart: &Cart,
        customer_name: impl Into<String>,
        issued_at: DateTime<Utc>,
        invoice_number: u32,
    ) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }

        let lines = cart
            .items()
            .iter()
            .map(|item| BillLine {
                product_id: item.product.id,
                name: item.product.name.clone(),
                emoji: item.product.emoji.clone(),
                quantity: item.quantity,
                unit_price: item.product.price,
                line_total: item.line_total(),
            })
            .collect();

        let subtotal = cart.subtotal();
        let tax = subtotal.scale(TAX_RATE).round_to_paise();
        let grand_total = subtotal.scale(Decimal::ONE + TAX_RATE).round_to_paise();

        Some(Self {
            invoice_number,
            issued_at,
            customer_name: customer_name.into(),
            lines,
            subtotal,
            tax,
            grand_total,
        })
    }

    /// A random invoice number in `0..100000`.
    pub fn random_invoice_number<R: Rng + ?Sized>(rng: &mut R) -> u32 {
        rng.random_range(0..INVOICE_NUMBER_RANGE)
    }

    /// Invoice number zero-padded to six digits.
    #[must_use]
    pub fn invoice_label(&self) -> String {
        format!("{:06}", self.invoice_number)
    }

    /// Line items as stored on the order row.
    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|line| OrderItem {
                id: line.product_id,
                name: line.name.clone(),
                price: line.unit_price,
                quantity: line.quantity,
                emoji: line.emoji.clone(),
            })
            .collect()
    }
}

//! Checkout: turn the cart into a bill and the bill into an order.

use chrono::{DateTime, Utc};
use rand::Rng;
use secrecy::SecretString;
use thiserror::Error;

use quickmart_core::{Bill, Cart, CurrentUser, Order};

use crate::db::{OrderRepository, RepositoryError};
use crate::supabase::RestClient;

/// Errors that can occur at checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to bill.
    #[error("missing cart")]
    EmptyCart,

    /// The order could not be saved.
    #[error("failed to save order: {0}")]
    Repository(#[from] RepositoryError),
}

/// Build the bill for `cart` with a fresh invoice number.
///
/// Returns `None` for an empty cart.
pub fn prepare_bill<R: Rng + ?Sized>(
    cart: &Cart,
    customer: &CurrentUser,
    issued_at: DateTime<Utc>,
    rng: &mut R,
) -> Option<Bill> {
    Bill::from_cart(
        cart,
        customer.name.clone(),
        issued_at,
        Bill::random_invoice_number(rng),
    )
}

/// Checkout service.
pub struct CheckoutService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service acting as the signed-in user.
    #[must_use]
    pub const fn new(rest: &'a RestClient, token: &'a SecretString) -> Self {
        Self {
            orders: OrderRepository::new(rest).as_user(token),
        }
    }

    /// Save the cart as an order charged at the bill's grand total.
    ///
    /// The caller clears the cart on success.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to bill and
    /// `CheckoutError::Repository` if the order cannot be written.
    pub async fn confirm(&self, customer: &CurrentUser, cart: &Cart) -> Result<Order, CheckoutError> {
        let bill = Bill::from_cart(cart, customer.name.clone(), Utc::now(), 0)
            .ok_or(CheckoutError::EmptyCart)?;

        let order = self
            .orders
            .create_order(customer.id, &bill.order_items(), bill.grand_total)
            .await?;
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use quickmart_core::{Price, Product, ProductId, Role, UserId};

    use super::*;

    fn customer() -> CurrentUser {
        CurrentUser {
            id: UserId::new(uuid::Uuid::new_v4()),
            email: None,
            name: "Asha".to_string(),
            role: Role::Customer,
        }
    }

    #[test]
    fn test_prepare_bill_for_cart() {
        let mut cart = Cart::new();
        cart.add(Product {
            id: ProductId::new(1),
            name: "Rice".to_string(),
            price: Price::from_rupees(45),
            category: "Grains".to_string(),
            emoji: String::new(),
        });

        let mut rng = StdRng::seed_from_u64(7);
        let bill = prepare_bill(&cart, &customer(), Utc::now(), &mut rng).unwrap();
        assert_eq!(bill.customer_name, "Asha");
        assert!(bill.invoice_number < 100_000);
        assert_eq!(bill.invoice_label().len(), 6);
    }

    #[test]
    fn test_prepare_bill_empty_cart() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(prepare_bill(&Cart::new(), &customer(), Utc::now(), &mut rng).is_none());
    }

    #[tokio::test]
    async fn test_confirm_rejects_empty_cart_before_any_call() {
        let rest = RestClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/rest/v1".to_string(),
            SecretString::from("anon"),
        );
        let token = SecretString::from("token");
        let service = CheckoutService::new(&rest, &token);

        let err = service.confirm(&customer(), &Cart::new()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(err.to_string(), "missing cart");
    }
}

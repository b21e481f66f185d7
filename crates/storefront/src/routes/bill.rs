//! Bill page and checkout confirmation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use quickmart_core::{Bill, BillLine, Cart, TAX_RATE};
use rust_decimal::Decimal;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::models::session::{cart, set_cart};
use crate::routes::layout::Chrome;
use crate::services::notifications::notify;
use crate::services::{CheckoutError, CheckoutService, Toast, checkout::prepare_bill};
use crate::state::AppState;

/// Bill line display data.
#[derive(Debug, Clone)]
pub struct BillLineView {
    pub name: String,
    pub emoji: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&BillLine> for BillLineView {
    fn from(line: &BillLine) -> Self {
        Self {
            name: line.name.clone(),
            emoji: line.emoji.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.to_string(),
            line_total: line.line_total.to_string(),
        }
    }
}

/// Bill display data.
#[derive(Debug, Clone)]
pub struct BillView {
    pub invoice: String,
    pub date: String,
    pub customer: String,
    pub lines: Vec<BillLineView>,
    pub subtotal: String,
    pub tax_label: String,
    pub tax: String,
    pub grand_total: String,
}

impl From<&Bill> for BillView {
    fn from(bill: &Bill) -> Self {
        Self {
            invoice: bill.invoice_label(),
            date: bill.issued_at.format("%d/%m/%Y").to_string(),
            customer: bill.customer_name.clone(),
            lines: bill.lines.iter().map(BillLineView::from).collect(),
            subtotal: bill.subtotal.to_string(),
            tax_label: format!("Tax ({}%)", (TAX_RATE * Decimal::ONE_HUNDRED).normalize()),
            tax: bill.tax.to_string(),
            grand_total: bill.grand_total.to_string(),
        }
    }
}

/// Bill page template. `bill` is `None` when the cart is empty.
#[derive(Template, WebTemplate)]
#[template(path = "bill.html")]
pub struct BillTemplate {
    pub chrome: Chrome,
    pub bill: Option<BillView>,
}

/// Display the bill for the current cart.
#[instrument(skip_all)]
pub async fn show(RequireUser(signed_in): RequireUser, session: Session) -> impl IntoResponse {
    let current = cart(&session).await;
    let bill = prepare_bill(&current, &signed_in.user, Utc::now(), &mut rand::rng());

    BillTemplate {
        chrome: Chrome::load(&session, Some(&signed_in.user)).await,
        bill: bill.as_ref().map(BillView::from),
    }
}

/// Save the cart as an order, clear it and return to the storefront.
#[instrument(skip_all, fields(user_id = %signed_in.user.id))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireUser(signed_in): RequireUser,
    session: Session,
) -> Result<Response> {
    let current = cart(&session).await;
    let checkout = CheckoutService::new(state.supabase().rest(), signed_in.token());

    match checkout.confirm(&signed_in.user, &current).await {
        Ok(order) => {
            set_cart(&session, &Cart::new()).await?;
            let reference = order.reference();
            add_breadcrumb("checkout", "Order placed", Some(&[("order", reference.as_str())]));
            notify(
                &session,
                Toast::info(
                    "Order placed",
                    format!("Order #{reference} for {} saved.", order.total),
                ),
            )
            .await;
            Ok(Redirect::to("/").into_response())
        }
        Err(CheckoutError::EmptyCart) => {
            notify(&session, Toast::error("No Bill Found", "Your cart is empty.")).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "Checkout failed");
            notify(&session, Toast::error("Checkout Failed", e.to_string())).await;
            Ok(Redirect::to("/bill").into_response())
        }
    }
}

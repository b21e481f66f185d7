//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in/up/out, role management, and the session mirror
//! - `catalog` - Live product catalog fed by Realtime changes
//! - `checkout` - Bill preparation and order capture
//! - `notifications` - Per-session toast queue

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod notifications;

pub use auth::{AuthError, AuthService, SessionMirror};
pub use catalog::{CatalogFeed, CatalogSource, RestCatalog, Subscription};
pub use checkout::{CheckoutError, CheckoutService};
pub use notifications::{Toast, ToastVariant};

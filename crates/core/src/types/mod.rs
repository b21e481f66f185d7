//! Core types for QuickMart.
//!
//! This module provides type-safe wrappers and records for the storefront
//! domain.

pub mod bill;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod profile;
pub mod role;

pub use bill::{Bill, BillLine, TAX_RATE};
pub use cart::{Cart, CartItem};
pub use catalog::{categories, filter_products};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderItem};
pub use price::{CurrencyCode, Price};
pub use product::{Product, ProductDraft, ProductDraftError};
pub use profile::{CurrentUser, Profile, SessionIdentity, default_display_name, resolve_role};
pub use role::{Role, RoleParseError};

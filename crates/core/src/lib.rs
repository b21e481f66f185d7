//! QuickMart Core - Shared domain types and pure logic.
//!
//! This crate provides the types used by the storefront binary and its tests:
//!
//! - Type-safe IDs, email addresses and prices
//! - Products, the transient cart, bills and orders
//! - Role resolution for the session mirror
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. Everything here can be unit tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Domain types and the logic that operates on them

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

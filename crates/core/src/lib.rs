//! Stockroom Core - Shared fulfillment types.
//!
//! This crate provides the types shared by every Stockroom component:
//! - `storefront` - HTTP service owning the stock ledger, server carts and orders
//! - `client` - Shopper-side session, local cart and cart synchronization
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The feasibility rule lives here so the storefront
//! and any client evaluate quantities the same way.
//!
//! # Modules
//!
//! - [`types`] - Ids, quantities, prices, carts, orders and feasibility results

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! Core types for Stockroom.
//!
//! This module provides type-safe wrappers for the fulfillment domain.

pub mod cart;
pub mod feasibility;
pub mod id;
pub mod order;
pub mod payment;
pub mod price;
pub mod product;
pub mod quantity;
pub mod status;

pub use cart::{Cart, CartLine, LineSnapshot};
pub use feasibility::{FeasibilityResult, Infeasibility, StockLevel};
pub use id::*;
pub use order::{
    CommitViolation, CreateOrderRequest, LineRequest, MAX_ORDER_LINES, OrderLine, OrderReceipt,
    OrderRequestError, OrderView, Recipient, RecipientError, StatusEntry,
};
pub use payment::{PaymentCallback, PaymentCallbackError};
pub use price::Price;
pub use product::Product;
pub use quantity::{Quantity, QuantityError};
pub use status::*;

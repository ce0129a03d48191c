//! # loom-core: Pure Business Logic for the Loom Retail Ledger
//!
//! This crate is the **heart** of the retail inventory ledger. It contains
//! the stock rules, report aggregation and input validation as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Loom Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    loom-cli (operator)                          │   │
//! │  │    sell, restock, return, quick-sell, report, import ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  loom-ledger (LedgerService)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ loom-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │ validation│  │   │
//! │  │   │ Product   │  │   Money   │  │  merge    │  │   rules   │  │   │
//! │  │   │ Variant   │  │           │  │  records  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │  report   │  │  legacy   │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    loom-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (RetailProduct, Variant, SaleRecord, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`ledger`] - Stock and ledger rules shared by every mutation
//! - [`report`] - Per-product sales report
//! - [`legacy`] - Documents exported from the previous document store
//!
//! ## Stock Invariant
//! For every variant, between any two operations:
//! `0 <= sold_quantity <= quantity`. Available stock is
//! `quantity - sold_quantity`.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod legacy;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use report::{ReportProduct, ReportSale, SalesReport, VariantSales};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of ledger entries returned as `recent_sales` in a sales report
/// unless configured otherwise.
pub const DEFAULT_RECENT_SALES_LIMIT: usize = 10;

/// Upper bound for a single variant quantity or a single sale quantity.
///
/// ## Business Reason
/// Catches typos such as 100000 instead of 100 before they reach the
/// stock columns.
pub const MAX_STOCK_QUANTITY: i64 = 100_000;

/// Upper bound for any price in cents: list, cost or sold price.
///
/// Keeps `price × quantity` and per-product revenue sums well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Description given to products created by a quick sell.
pub const QUICK_SELL_DESCRIPTION: &str = "Quick sale";

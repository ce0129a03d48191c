//! # loom-ledger: Inventory Ledger Service
//!
//! Validated operations over the retail product aggregate and its sales
//! ledger.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller ──► LedgerService::sell_variant(id, SellVariant)                │
//! │                  │                                                      │
//! │                  ├── loom_core::validation::validate_sell   (no I/O)    │
//! │                  │        └── ValidationError ──► VALIDATION_ERROR      │
//! │                  │                                                      │
//! │                  ├── loom_db LedgerRepository::sell_variant             │
//! │                  │        ├── guarded UPDATE + sale record, one tx      │
//! │                  │        └── CoreError ──► NOT_FOUND / INVALID_STOCK   │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │            Ok(RetailProduct)  or  Err(LedgerError { code, message })    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`service`] - `LedgerService`, one method per ledger operation
//! - [`error`] - `LedgerError` with a machine-readable code
//! - [`config`] - `LedgerConfig`, loaded from `LOOM_*` environment variables

pub mod config;
pub mod error;
pub mod service;

pub use config::{ConfigError, LedgerConfig};
pub use error::{ErrorCode, LedgerError, LedgerResult};
pub use service::{ImportFailure, ImportSummary, LedgerService};

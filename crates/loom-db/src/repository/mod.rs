//! # Repository Module
//!
//! Database repository implementations for the Loom ledger.
//!
//! ## Split
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RetailProductRepository   aggregate CRUD, listings                     │
//! │       load_product(conn, id) ◄──── shared aggregate loader              │
//! │                                    │                                    │
//! │  LedgerRepository          sell, external sale, restock, return,        │
//! │                            price correction, cross-product listing      │
//! │                                                                         │
//! │  StandaloneSaleRepository  point-of-sale log                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository is a cheap `Clone` wrapper around the pool. Methods that
//! change stock open a transaction and make the guarded stock UPDATE its
//! first statement, which takes the SQLite write lock before anything is
//! read.
//!
//! ## Available Repositories
//!
//! - [`retail_product::RetailProductRepository`]
//! - [`ledger::LedgerRepository`]
//! - [`standalone_sale::StandaloneSaleRepository`]

pub mod ledger;
pub mod retail_product;
pub mod standalone_sale;

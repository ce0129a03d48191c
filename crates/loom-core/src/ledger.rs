//! # Ledger Rules
//!
//! Pure functions shared by every mutation of the inventory ledger.
//!
//! ## Where These Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LedgerService::update(id, partial)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  merge_variants(existing, incoming)   ← THIS MODULE (pure)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RetailProductRepository::update      ← loom-db (one transaction)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock checks themselves live on [`Variant`]; this module covers the
//! rules that involve more than one variant or build new ledger entries.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{NewRetailProduct, NewVariant, QuickSell, RetailProduct, SaleRecord, Variant};
use crate::QUICK_SELL_DESCRIPTION;

// =============================================================================
// Products
// =============================================================================

/// Builds a new aggregate from a create request.
///
/// The product gets a fresh id, an empty ledger and a cost price of 0
/// unless one was given.
pub fn new_product(input: NewRetailProduct, now: DateTime<Utc>) -> RetailProduct {
    RetailProduct {
        id: Uuid::new_v4().to_string(),
        variants: seed_variants(&input.variants),
        name: input.name,
        description: input.description,
        price_cents: input.price_cents,
        cost_price_cents: input.cost_price_cents.unwrap_or(0),
        category: input.category,
        material: input.material,
        images: input.images,
        sales_history: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Variants
// =============================================================================

/// Builds the stored variant list for a new product.
///
/// Input order and values are kept as-is, duplicates included. Every
/// variant starts with `sold_quantity = 0`.
pub fn seed_variants(input: &[NewVariant]) -> Vec<Variant> {
    input
        .iter()
        .map(|v| Variant::new(v.size.clone(), v.color.clone(), v.quantity))
        .collect()
}

/// Merges an incoming variant list into the existing one.
///
/// ## Rules
/// ```text
///   incoming (size, color) matches an existing variant
///       → keep existing sold_quantity, take incoming quantity
///   no match
///       → new variant, sold_quantity = 0
///   existing variant absent from incoming
///       → dropped (its sale records become orphans)
/// ```
///
/// Fails with `QuantityBelowSold` when a matched variant would end up with
/// fewer units than it has already sold.
pub fn merge_variants(existing: &[Variant], incoming: &[NewVariant]) -> CoreResult<Vec<Variant>> {
    incoming
        .iter()
        .map(|v| {
            let sold = existing
                .iter()
                .find(|e| e.matches(&v.size, &v.color))
                .map_or(0, |e| e.sold_quantity);

            if v.quantity < sold {
                return Err(CoreError::QuantityBelowSold {
                    size: v.size.clone(),
                    color: v.color.clone(),
                    sold,
                    quantity: v.quantity,
                });
            }

            Ok(Variant {
                size: v.size.clone(),
                color: v.color.clone(),
                quantity: v.quantity,
                sold_quantity: sold,
            })
        })
        .collect()
}

// =============================================================================
// Sale Records
// =============================================================================

/// The unit price recorded for a sale: the explicit price when given,
/// otherwise the product's list price. An explicit `0` is honoured.
#[inline]
pub fn resolve_sold_price(explicit_cents: Option<i64>, list_price_cents: i64) -> i64 {
    explicit_cents.unwrap_or(list_price_cents)
}

/// Creates a ledger entry with a fresh id.
pub fn new_sale_record(
    size: &str,
    color: &str,
    quantity: i64,
    sold_price_cents: i64,
    is_external: bool,
    sold_at: DateTime<Utc>,
) -> SaleRecord {
    SaleRecord {
        id: Uuid::new_v4().to_string(),
        size: size.to_string(),
        color: color.to_string(),
        quantity,
        sold_price_cents,
        sold_at,
        is_external,
    }
}

// =============================================================================
// Quick Sell
// =============================================================================

/// Name given to a quick-sell product: `"{category} {color} {size}"`.
pub fn quick_sell_name(category: &str, color: &str, size: &str) -> String {
    format!("{} {} {}", category, color, size)
}

/// The product a quick sell creates before selling it out.
pub fn quick_sell_product(input: &QuickSell) -> NewRetailProduct {
    NewRetailProduct {
        name: quick_sell_name(&input.category, &input.color, &input.size),
        description: QUICK_SELL_DESCRIPTION.to_string(),
        price_cents: input.sold_price_cents,
        cost_price_cents: Some(0),
        category: input.category.clone(),
        material: None,
        images: Vec::new(),
        variants: vec![NewVariant::new(
            input.size.clone(),
            input.color.clone(),
            input.quantity,
        )],
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

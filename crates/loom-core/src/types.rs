//! # Domain Types
//!
//! Core domain types used throughout the Loom retail ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   RetailProduct (aggregate root)                │   │
//! │  │  id, name, description, price_cents, cost_price_cents,          │   │
//! │  │  category, material, images, created_at, updated_at             │   │
//! │  └───────────────┬───────────────────────────────┬─────────────────┘   │
//! │                  │ owns 0..n                     │ owns 0..n           │
//! │  ┌───────────────▼───────────┐   ┌───────────────▼─────────────────┐   │
//! │  │         Variant           │   │          SaleRecord             │   │
//! │  │  ───────────────────────  │   │  ─────────────────────────────  │   │
//! │  │  size, color              │◄ ─│  size, color  (soft reference)  │   │
//! │  │  quantity                 │   │  quantity > 0                   │   │
//! │  │  sold_quantity            │   │  sold_price_cents, sold_at      │   │
//! │  │  0 <= sold <= quantity    │   │  is_external                    │   │
//! │  └───────────────────────────┘   └─────────────────────────────────┘   │
//! │                                                                         │
//! │  StandaloneSale: point-of-sale record with no product behind it         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Soft References
//! A sale record names its variant by `(size, color)` only. When an update
//! drops the variant, the record stays in the ledger as an **orphan**:
//! it still counts in revenue, is flagged in reports, and can no longer be
//! returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Variant
// =============================================================================

/// A size/color stock-keeping unit within a product.
///
/// ## State Machine
/// ```text
///   {quantity: Q, sold: S}   with 0 <= S <= Q
///
///   sell(k)     requires S + k <= Q   → S += k
///   restock(k)  requires S - k >= 0   → S -= k
///   return(k)   requires S - k >= 0   → S -= k
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Variant {
    pub size: String,
    pub color: String,
    /// Every unit ever put into inventory for this SKU.
    pub quantity: i64,
    /// Units sold and not yet restocked or returned.
    pub sold_quantity: i64,
}

impl Variant {
    /// Creates a fresh variant with nothing sold.
    pub fn new(size: impl Into<String>, color: impl Into<String>, quantity: i64) -> Self {
        Variant {
            size: size.into(),
            color: color.into(),
            quantity,
            sold_quantity: 0,
        }
    }

    /// Units still on the shelf.
    #[inline]
    pub fn available(&self) -> i64 {
        self.quantity - self.sold_quantity
    }

    /// True when this variant is addressed by `(size, color)`.
    #[inline]
    pub fn matches(&self, size: &str, color: &str) -> bool {
        self.size == size && self.color == color
    }

    /// Checks that `quantity` more units can be sold.
    pub fn check_sell(&self, quantity: i64) -> CoreResult<()> {
        if self.available() < quantity {
            return Err(CoreError::InsufficientStock {
                available: self.available(),
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Checks that `quantity` sold units can be put back on the shelf.
    pub fn check_restock(&self, quantity: i64) -> CoreResult<()> {
        if quantity > self.sold_quantity {
            return Err(CoreError::RestockExceedsSold {
                sold: self.sold_quantity,
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Checks that a sale of `sale_quantity` units can be reversed.
    pub fn check_return(&self, sale_quantity: i64) -> CoreResult<()> {
        if self.sold_quantity < sale_quantity {
            return Err(CoreError::ReturnExceedsSold {
                sold: self.sold_quantity,
                sale_quantity,
            });
        }
        Ok(())
    }

    /// Applies a sell transition.
    pub fn sell(&mut self, quantity: i64) -> CoreResult<()> {
        self.check_sell(quantity)?;
        self.sold_quantity += quantity;
        Ok(())
    }

    /// Applies a restock transition.
    pub fn restock(&mut self, quantity: i64) -> CoreResult<()> {
        self.check_restock(quantity)?;
        self.sold_quantity -= quantity;
        Ok(())
    }

    /// Applies the stock side of a sale return.
    pub fn return_units(&mut self, sale_quantity: i64) -> CoreResult<()> {
        self.check_return(sale_quantity)?;
        self.sold_quantity -= sale_quantity;
        Ok(())
    }
}

// =============================================================================
// Sale Record
// =============================================================================

/// One entry of a product's sales ledger.
///
/// `sold_price_cents` is the unit price actually charged and is independent
/// of the product's current list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleRecord {
    /// Unique identifier (UUID v4), assigned at append time.
    pub id: String,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub sold_price_cents: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    /// True when the units left through a channel this ledger does not
    /// track. External records never touched `sold_quantity`.
    pub is_external: bool,
}

impl SaleRecord {
    /// Returns the unit sold price as Money.
    #[inline]
    pub fn sold_price(&self) -> Money {
        Money::from_cents(self.sold_price_cents)
    }

    /// `sold_price × quantity`.
    #[inline]
    pub fn revenue(&self) -> Money {
        self.sold_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Retail Product
// =============================================================================

/// A sellable item family with its variants and sales ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RetailProduct {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub name: String,
    pub description: String,

    /// List price in cents.
    pub price_cents: i64,

    /// Cost price in cents. Only settable at creation.
    pub cost_price_cents: i64,

    pub category: String,
    pub material: Option<String>,

    /// Image references, in display order.
    pub images: Vec<String>,

    /// Variants, in the order they were supplied.
    pub variants: Vec<Variant>,

    /// Ledger, oldest first.
    pub sales_history: Vec<SaleRecord>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl RetailProduct {
    /// Returns the list price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost price as Money.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// First variant addressed by `(size, color)`.
    pub fn variant(&self, size: &str, color: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.matches(size, color))
    }

    /// Like [`RetailProduct::variant`] but fails with `VariantNotFound`.
    pub fn require_variant(&self, size: &str, color: &str) -> CoreResult<&Variant> {
        self.variant(size, color)
            .ok_or_else(|| CoreError::variant_not_found(size, color))
    }

    /// Ledger entry by id.
    pub fn sale(&self, sale_id: &str) -> Option<&SaleRecord> {
        self.sales_history.iter().find(|s| s.id == sale_id)
    }

    /// `Σ (quantity - sold_quantity)` over all variants.
    pub fn total_available(&self) -> i64 {
        self.variants.iter().map(Variant::available).sum()
    }

    /// `Σ sold_quantity` over all variants.
    pub fn total_sold(&self) -> i64 {
        self.variants.iter().map(|v| v.sold_quantity).sum()
    }

    /// True when the record's variant no longer exists on this product.
    pub fn is_orphaned(&self, sale: &SaleRecord) -> bool {
        self.variant(&sale.size, &sale.color).is_none()
    }

    /// Has at least one unit on the shelf.
    pub fn has_available_stock(&self) -> bool {
        self.variants.iter().any(|v| v.available() > 0)
    }

    /// Has at least one unit sold.
    pub fn has_sold_stock(&self) -> bool {
        self.variants.iter().any(|v| v.sold_quantity > 0)
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// A `(size, color, quantity)` triple supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewVariant {
    pub size: String,
    pub color: String,
    pub quantity: i64,
}

impl NewVariant {
    pub fn new(size: impl Into<String>, color: impl Into<String>, quantity: i64) -> Self {
        NewVariant {
            size: size.into(),
            color: color.into(),
            quantity,
        }
    }
}

/// Input for creating a retail product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewRetailProduct {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    /// Defaults to 0.
    #[serde(default)]
    pub cost_price_cents: Option<i64>,
    pub category: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub variants: Vec<NewVariant>,
}

/// Partial update of a retail product.
///
/// `None` leaves the field untouched. There is deliberately no cost price
/// field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RetailProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    /// Replaces the variant list, merged by `(size, color)`.
    #[serde(default)]
    pub variants: Option<Vec<NewVariant>>,
}

/// Input for selling a variant or recording an external sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SellVariant {
    pub size: String,
    pub color: String,
    pub quantity: i64,
    /// Falls back to the product's list price.
    #[serde(default)]
    pub sold_price_cents: Option<i64>,
}

/// Input for a bulk stock adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RestockVariant {
    pub size: String,
    pub color: String,
    pub quantity: i64,
}

/// Input for a quick sell: create a one-variant product and sell it out.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuickSell {
    pub category: String,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub sold_price_cents: i64,
}

// =============================================================================
// Sales Projection
// =============================================================================

/// A ledger entry annotated with its product, as returned by the
/// cross-product sales listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleEntry {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub id: String,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub sold_price_cents: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    pub is_external: bool,
}

impl SaleEntry {
    /// `sold_price × quantity`.
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.sold_price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Standalone Sales
// =============================================================================

/// Input for a point-of-sale record that is not tied to any product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewStandaloneSale {
    pub category: String,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub sold_price_cents: i64,
}

/// A stored point-of-sale record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StandaloneSale {
    pub id: String,
    pub category: String,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub sold_price_cents: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

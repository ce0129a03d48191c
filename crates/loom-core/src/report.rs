//! # Sales Report
//!
//! Per-product analytics computed from a loaded aggregate.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SalesReport                                                            │
//! │  ├── product          { id, name, category }                           │
//! │  ├── total_sold       Σ variant.sold_quantity                          │
//! │  ├── total_available  Σ (variant.quantity - variant.sold_quantity)     │
//! │  ├── total_revenue    Σ sale.sold_price × sale.quantity                │
//! │  ├── sales_by_variant one group per (color, size), first-seen order    │
//! │  └── recent_sales     last N ledger entries, newest first              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! External sales count towards revenue and the groups. They never touched
//! `sold_quantity`, so they do not show up in `total_sold`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{RetailProduct, SaleRecord};

/// Identity of the reported product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportProduct {
    pub id: String,
    pub name: String,
    pub category: String,
}

/// One sale inside a variant group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportSale {
    pub quantity: i64,
    pub sold_price_cents: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
}

/// Ledger entries grouped by `(color, size)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VariantSales {
    pub color: String,
    pub size: String,
    pub total_quantity: i64,
    pub total_revenue_cents: i64,
    /// The variant no longer exists on the product.
    pub orphaned: bool,
    pub sales: Vec<ReportSale>,
}

/// Per-product sales report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub product: ReportProduct,
    pub total_sold: i64,
    pub total_available: i64,
    pub total_revenue_cents: i64,
    pub sales_by_variant: Vec<VariantSales>,
    pub recent_sales: Vec<SaleRecord>,
}

impl SalesReport {
    /// Builds the report. `sales_history` must be oldest first.
    pub fn build(product: &RetailProduct, recent_limit: usize) -> Self {
        let mut groups: Vec<VariantSales> = Vec::new();

        for sale in &product.sales_history {
            let index = match groups
                .iter()
                .position(|g| g.color == sale.color && g.size == sale.size)
            {
                Some(index) => index,
                None => {
                    groups.push(VariantSales {
                        color: sale.color.clone(),
                        size: sale.size.clone(),
                        total_quantity: 0,
                        total_revenue_cents: 0,
                        orphaned: product.is_orphaned(sale),
                        sales: Vec::new(),
                    });
                    groups.len() - 1
                }
            };

            let group = &mut groups[index];
            group.total_quantity += sale.quantity;
            group.total_revenue_cents = group
                .total_revenue_cents
                .saturating_add(sale.revenue().cents());
            group.sales.push(ReportSale {
                quantity: sale.quantity,
                sold_price_cents: sale.sold_price_cents,
                sold_at: sale.sold_at,
            });
        }

        let total_revenue: Money = product.sales_history.iter().map(SaleRecord::revenue).sum();

        let recent_sales = product
            .sales_history
            .iter()
            .rev()
            .take(recent_limit)
            .cloned()
            .collect();

        SalesReport {
            product: ReportProduct {
                id: product.id.clone(),
                name: product.name.clone(),
                category: product.category.clone(),
            },
            total_sold: product.total_sold(),
            total_available: product.total_available(),
            total_revenue_cents: total_revenue.cents(),
            sales_by_variant: groups,
            recent_sales,
        }
    }

    /// Grand revenue as Money.
    pub fn total_revenue(&self) -> Money {
        Money::from_cents(self.total_revenue_cents)
    }

    /// Number of groups whose variant was removed.
    pub fn orphaned_groups(&self) -> usize {
        self.sales_by_variant.iter().filter(|g| g.orphaned).count()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Variant;
    use chrono::Duration;

    fn sale(id: &str, size: &str, color: &str, qty: i64, price: i64, minutes: i64) -> SaleRecord {
        SaleRecord {
            id: id.to_string(),
            size: size.to_string(),
            color: color.to_string(),
            quantity: qty,
            sold_price_cents: price,
            sold_at: DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(minutes),
            is_external: false,
        }
    }

    fn product(sales: Vec<SaleRecord>) -> RetailProduct {
        let mut black = Variant::new("M", "Black", 10);
        black.sold_quantity = 5;
        let mut white = Variant::new("S", "White", 4);
        white.sold_quantity = 1;
        RetailProduct {
            id: "p1".to_string(),
            name: "Basic Tee".to_string(),
            description: String::new(),
            price_cents: 1500,
            cost_price_cents: 700,
            category: "T-Shirt".to_string(),
            material: None,
            images: vec![],
            variants: vec![black, white],
            sales_history: sales,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn groups_in_first_seen_order() {
        let p = product(vec![
            sale("a", "S", "White", 1, 1500, 1),
            sale("b", "M", "Black", 2, 1000, 2),
            sale("c", "M", "Black", 3, 1200, 3),
        ]);
        let report = SalesReport::build(&p, 10);

        assert_eq!(report.sales_by_variant.len(), 2);
        assert_eq!(report.sales_by_variant[0].color, "White");
        let black = &report.sales_by_variant[1];
        assert_eq!(black.total_quantity, 5);
        assert_eq!(black.total_revenue_cents, 2 * 1000 + 3 * 1200);
        assert_eq!(black.sales.len(), 2);

        assert_eq!(report.total_revenue_cents, 1500 + 2000 + 3600);
        assert_eq!(report.total_sold, 6);
        assert_eq!(report.total_available, 8);
    }

    #[test]
    fn recent_sales_are_newest_first_and_limited() {
        let sales = (0..12)
            .map(|i| sale(&format!("s{}", i), "M", "Black", 1, 100, i))
            .collect();
        let report = SalesReport::build(&product(sales), 10);

        assert_eq!(report.recent_sales.len(), 10);
        assert_eq!(report.recent_sales[0].id, "s11");
        assert_eq!(report.recent_sales[9].id, "s2");
    }

    #[test]
    fn orphaned_group_is_flagged() {
        let p = product(vec![sale("a", "XL", "Green", 1, 100, 1)]);
        let report = SalesReport::build(&p, 10);
        assert!(report.sales_by_variant[0].orphaned);
        assert_eq!(report.orphaned_groups(), 1);
    }

    #[test]
    fn empty_ledger() {
        let report = SalesReport::build(&product(vec![]), 10);
        assert!(report.sales_by_variant.is_empty());
        assert!(report.recent_sales.is_empty());
        assert!(report.total_revenue().is_zero());
    }
}

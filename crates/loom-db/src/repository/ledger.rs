//! # Ledger Repository
//!
//! Stock mutations and sale records.
//!
//! ## Guarded Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Why Not Read, Check, Write?                            │
//! │                                                                         │
//! │  Terminal A: read sold=9 (qty 10) ─┐                                    │
//! │  Terminal B: read sold=9 (qty 10) ─┼─ both see 1 available              │
//! │  Terminal A: write sold=10         │                                    │
//! │  Terminal B: write sold=11   ◄─────┘  OVERSOLD                          │
//! │                                                                         │
//! │  Instead, the check is part of the write:                               │
//! │                                                                         │
//! │    UPDATE product_variants                                              │
//! │    SET sold_quantity = sold_quantity + k                                │
//! │    WHERE <first variant matching (size, color)>                         │
//! │      AND quantity - sold_quantity >= k                                  │
//! │                                                                         │
//! │  1 row  → stock moved, append the sale record, commit                   │
//! │  0 rows → re-read inside the same transaction and report why            │
//! │           (product missing, variant missing, or the numbers)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guarded UPDATE is always the first statement of its transaction, so
//! the SQLite write lock is held before anything is read. Concurrent
//! writers queue on `busy_timeout`; nobody decides on a stale read.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::retail_product::{
    insert_product, insert_sale_record, product_exists, require_product, touch_product,
};
use loom_core::ledger::{new_product, new_sale_record, quick_sell_product, resolve_sold_price};
use loom_core::{
    CoreError, QuickSell, RestockVariant, RetailProduct, SaleEntry, SaleRecord, SellVariant,
    Variant,
};

/// Selects the first variant (lowest position) for `(?1 product, ?2 size, ?3 color)`.
const FIRST_VARIANT: &str = "position = (SELECT MIN(position) FROM product_variants \
     WHERE product_id = ?1 AND size = ?2 AND color = ?3)";

// =============================================================================
// Connection-Level Helpers
// =============================================================================

/// Resolves the variant a failed guarded update was aimed at.
///
/// Runs inside the failing transaction, so the numbers are the ones the
/// UPDATE saw.
async fn diagnose_variant(
    conn: &mut SqliteConnection,
    product_id: &str,
    size: &str,
    color: &str,
) -> DbResult<Variant> {
    if !product_exists(conn, product_id).await? {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }

    let variant = sqlx::query_as::<_, Variant>(
        r#"
        SELECT size, color, quantity, sold_quantity
        FROM product_variants
        WHERE product_id = ?1 AND size = ?2 AND color = ?3
        ORDER BY position
        LIMIT 1
        "#,
    )
    .bind(product_id)
    .bind(size)
    .bind(color)
    .fetch_optional(&mut *conn)
    .await?;

    variant.ok_or_else(|| DbError::Domain(CoreError::variant_not_found(size, color)))
}

/// `sold_quantity += quantity` when that many units are available.
async fn apply_sell(
    conn: &mut SqliteConnection,
    product_id: &str,
    size: &str,
    color: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(&format!(
        "UPDATE product_variants SET sold_quantity = sold_quantity + ?4 \
         WHERE product_id = ?1 AND {} AND quantity - sold_quantity >= ?4",
        FIRST_VARIANT
    ))
    .bind(product_id)
    .bind(size)
    .bind(color)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let variant = diagnose_variant(conn, product_id, size, color).await?;
        variant.check_sell(quantity)?;
        return Err(DbError::Internal(format!(
            "sell of {} {} on {} matched no row",
            color, size, product_id
        )));
    }
    Ok(())
}

/// `sold_quantity -= quantity` when at least that many units are sold.
///
/// `check` produces the error for the numbers found when nothing matched.
async fn apply_decrement(
    conn: &mut SqliteConnection,
    product_id: &str,
    size: &str,
    color: &str,
    quantity: i64,
    check: fn(&Variant, i64) -> Result<(), CoreError>,
) -> DbResult<()> {
    let result = sqlx::query(&format!(
        "UPDATE product_variants SET sold_quantity = sold_quantity - ?4 \
         WHERE product_id = ?1 AND {} AND sold_quantity >= ?4",
        FIRST_VARIANT
    ))
    .bind(product_id)
    .bind(size)
    .bind(color)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let variant = diagnose_variant(conn, product_id, size, color).await?;
        check(&variant, quantity)?;
        return Err(DbError::Internal(format!(
            "decrement of {} {} on {} matched no row",
            color, size, product_id
        )));
    }
    Ok(())
}

async fn list_price(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let price: Option<i64> =
        sqlx::query_scalar("SELECT price_cents FROM retail_products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;
    price.ok_or_else(|| DbError::Domain(CoreError::ProductNotFound(product_id.to_string())))
}

/// Internal sell inside an open transaction: move stock, append the record.
async fn sell_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    input: &SellVariant,
    now: DateTime<Utc>,
) -> DbResult<SaleRecord> {
    apply_sell(conn, product_id, &input.size, &input.color, input.quantity).await?;

    let price = resolve_sold_price(input.sold_price_cents, list_price(conn, product_id).await?);
    let sale = new_sale_record(&input.size, &input.color, input.quantity, price, false, now);
    insert_sale_record(conn, product_id, &sale).await?;
    touch_product(conn, product_id, now).await?;
    Ok(sale)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock movements and the sales ledger.
///
/// Every method returns the aggregate as committed.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Sells units of a variant and appends an internal sale record.
    ///
    /// ## Errors
    /// - `ProductNotFound` / `VariantNotFound`
    /// - `InsufficientStock { available, requested }`
    pub async fn sell_variant(
        &self,
        product_id: &str,
        input: &SellVariant,
        now: DateTime<Utc>,
    ) -> DbResult<RetailProduct> {
        debug!(
            product_id = %product_id,
            size = %input.size,
            color = %input.color,
            quantity = input.quantity,
            "Selling variant"
        );

        let mut tx = self.pool.begin().await?;
        let sale = match sell_in(&mut tx, product_id, input, now).await {
            Ok(sale) => sale,
            Err(err) => {
                warn!(product_id = %product_id, error = %err, "Sell rejected");
                return Err(err);
            }
        };
        let product = require_product(&mut tx, product_id).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            sale_id = %sale.id,
            quantity = sale.quantity,
            sold_price = %sale.sold_price(),
            "Variant sold"
        );
        Ok(product)
    }

    /// Appends an external sale record. Stock is not checked or moved.
    pub async fn record_external_sale(
        &self,
        product_id: &str,
        input: &SellVariant,
        now: DateTime<Utc>,
    ) -> DbResult<RetailProduct> {
        debug!(
            product_id = %product_id,
            size = %input.size,
            color = %input.color,
            quantity = input.quantity,
            "Recording external sale"
        );

        let mut tx = self.pool.begin().await?;
        touch_product(&mut tx, product_id, now).await?;
        diagnose_variant(&mut tx, product_id, &input.size, &input.color).await?;

        let price = resolve_sold_price(input.sold_price_cents, list_price(&mut tx, product_id).await?);
        let sale = new_sale_record(&input.size, &input.color, input.quantity, price, true, now);
        insert_sale_record(&mut tx, product_id, &sale).await?;

        let product = require_product(&mut tx, product_id).await?;
        tx.commit().await?;

        info!(product_id = %product_id, sale_id = %sale.id, "External sale recorded");
        Ok(product)
    }

    /// Puts sold units back on the shelf without touching the ledger.
    ///
    /// ## Errors
    /// - `RestockExceedsSold { sold, requested }` when `quantity > sold_quantity`
    pub async fn restock_variant(
        &self,
        product_id: &str,
        input: &RestockVariant,
        now: DateTime<Utc>,
    ) -> DbResult<RetailProduct> {
        debug!(
            product_id = %product_id,
            size = %input.size,
            color = %input.color,
            quantity = input.quantity,
            "Restocking variant"
        );

        let mut tx = self.pool.begin().await?;
        if let Err(err) = apply_decrement(
            &mut tx,
            product_id,
            &input.size,
            &input.color,
            input.quantity,
            Variant::check_restock,
        )
        .await
        {
            warn!(product_id = %product_id, error = %err, "Restock rejected");
            return Err(err);
        }
        touch_product(&mut tx, product_id, now).await?;

        let product = require_product(&mut tx, product_id).await?;
        tx.commit().await?;

        info!(product_id = %product_id, quantity = input.quantity, "Variant restocked");
        Ok(product)
    }

    /// Removes a sale record and reverses its stock effect.
    ///
    /// ## Steps
    /// ```text
    /// DELETE ... RETURNING  → SaleNotFound when nothing was deleted
    ///      │
    ///      ├── internal: guarded decrement by record.quantity
    ///      │             VariantNotFound (orphan) / ReturnExceedsSold
    ///      └── external: variant must still exist, stock untouched
    /// ```
    /// Any failure rolls the delete back.
    pub async fn return_sale(
        &self,
        product_id: &str,
        sale_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<RetailProduct> {
        debug!(product_id = %product_id, sale_id = %sale_id, "Returning sale");

        let mut tx = self.pool.begin().await?;

        let sale = sqlx::query_as::<_, SaleRecord>(
            r#"
            DELETE FROM sale_records
            WHERE id = ?1 AND product_id = ?2
            RETURNING id, size, color, quantity, sold_price_cents, sold_at, is_external
            "#,
        )
        .bind(sale_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(sale) = sale else {
            if !product_exists(&mut tx, product_id).await? {
                return Err(CoreError::ProductNotFound(product_id.to_string()).into());
            }
            return Err(CoreError::SaleNotFound(sale_id.to_string()).into());
        };

        let reversed = if sale.is_external {
            diagnose_variant(&mut tx, product_id, &sale.size, &sale.color)
                .await
                .map(|_| ())
        } else {
            apply_decrement(
                &mut tx,
                product_id,
                &sale.size,
                &sale.color,
                sale.quantity,
                Variant::check_return,
            )
            .await
        };

        if let Err(err) = reversed {
            warn!(product_id = %product_id, sale_id = %sale_id, error = %err, "Return rejected");
            return Err(err);
        }
        touch_product(&mut tx, product_id, now).await?;

        let product = require_product(&mut tx, product_id).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            sale_id = %sale_id,
            quantity = sale.quantity,
            external = sale.is_external,
            "Sale returned"
        );
        Ok(product)
    }

    /// Corrects the sold price of one record. Stock is untouched.
    pub async fn update_sale_price(
        &self,
        product_id: &str,
        sale_id: &str,
        sold_price_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<RetailProduct> {
        debug!(
            product_id = %product_id,
            sale_id = %sale_id,
            sold_price_cents,
            "Updating sale price"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE sale_records SET sold_price_cents = ?3 WHERE id = ?1 AND product_id = ?2",
        )
        .bind(sale_id)
        .bind(product_id)
        .bind(sold_price_cents)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            if !product_exists(&mut tx, product_id).await? {
                return Err(CoreError::ProductNotFound(product_id.to_string()).into());
            }
            return Err(CoreError::SaleNotFound(sale_id.to_string()).into());
        }
        touch_product(&mut tx, product_id, now).await?;

        let product = require_product(&mut tx, product_id).await?;
        tx.commit().await?;

        info!(product_id = %product_id, sale_id = %sale_id, "Sale price corrected");
        Ok(product)
    }

    /// Creates a one-variant product and sells its whole quantity, in one
    /// transaction.
    pub async fn quick_sell(&self, input: &QuickSell, now: DateTime<Utc>) -> DbResult<RetailProduct> {
        debug!(
            category = %input.category,
            size = %input.size,
            color = %input.color,
            quantity = input.quantity,
            "Quick sell"
        );

        let product = new_product(quick_sell_product(input), now);
        let sell = SellVariant {
            size: input.size.clone(),
            color: input.color.clone(),
            quantity: input.quantity,
            sold_price_cents: Some(input.sold_price_cents),
        };

        let mut tx = self.pool.begin().await?;
        insert_product(&mut tx, &product).await?;
        sell_in(&mut tx, &product.id, &sell, now).await?;
        let product = require_product(&mut tx, &product.id).await?;
        tx.commit().await?;

        info!(product_id = %product.id, name = %product.name, "Quick sell completed");
        Ok(product)
    }

    /// Every ledger entry of every product, newest first.
    pub async fn all_sales(&self) -> DbResult<Vec<SaleEntry>> {
        let sales = sqlx::query_as::<_, SaleEntry>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                p.category,
                s.id,
                s.size,
                s.color,
                s.quantity,
                s.sold_price_cents,
                s.sold_at,
                s.is_external
            FROM sale_records s
            JOIN retail_products p ON p.id = s.product_id
            ORDER BY s.sold_at DESC, s.rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = sales.len(), "Loaded all sales");
        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use loom_core::{NewRetailProduct, NewVariant};

    async fn setup(variants: Vec<NewVariant>) -> (Database, RetailProduct) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product(
            NewRetailProduct {
                name: "Basic Tee".to_string(),
                description: "Cotton t-shirt".to_string(),
                price_cents: 1500,
                cost_price_cents: None,
                category: "T-Shirt".to_string(),
                material: None,
                images: vec![],
                variants,
            },
            Utc::now(),
        );
        db.products().insert(&product).await.unwrap();
        (db, product)
    }

    fn sell(size: &str, color: &str, quantity: i64, price: Option<i64>) -> SellVariant {
        SellVariant {
            size: size.to_string(),
            color: color.to_string(),
            quantity,
            sold_price_cents: price,
        }
    }

    #[tokio::test]
    async fn test_sell_moves_stock_and_appends_record() {
        let (db, product) = setup(vec![NewVariant::new("M", "Black", 10)]).await;

        let updated = db
            .ledger()
            .sell_variant(&product.id, &sell("M", "Black", 4, None), Utc::now())
            .await
            .unwrap();

        assert_eq!(updated.variants[0].sold_quantity, 4);
        assert_eq!(updated.sales_history.len(), 1);
        assert_eq!(updated.sales_history[0].sold_price_cents, 1500);
        assert!(!updated.sales_history[0].is_external);
    }

    #[tokio::test]
    async fn test_sell_reports_numbers_and_rolls_back() {
        let (db, product) = setup(vec![NewVariant::new("M", "Black", 10)]).await;
        let ledger = db.ledger();
        ledger
            .sell_variant(&product.id, &sell("M", "Black", 4, None), Utc::now())
            .await
            .unwrap();

        let err = ledger
            .sell_variant(&product.id, &sell("M", "Black", 7, None), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not enough stock. Available: 6, Requested: 7");

        let reloaded = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(reloaded.variants[0].sold_quantity, 4);
        assert_eq!(reloaded.sales_history.len(), 1);
    }

    #[tokio::test]
    async fn test_sell_unknown_variant_and_product() {
        let (db, product) = setup(vec![NewVariant::new("M", "Black", 10)]).await;
        let ledger = db.ledger();

        let err = ledger
            .sell_variant(&product.id, &sell("XL", "Black", 1, None), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::VariantNotFound { .. })));

        let err = ledger
            .sell_variant("missing", &sell("M", "Black", 1, None), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_sell_hits_first_duplicate_variant() {
        let (db, product) = setup(vec![
            NewVariant::new("M", "Black", 2),
            NewVariant::new("M", "Black", 50),
        ])
        .await;

        let updated = db
            .ledger()
            .sell_variant(&product.id, &sell("M", "Black", 2, None), Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.variants[0].sold_quantity, 2);
        assert_eq!(updated.variants[1].sold_quantity, 0);

        let err = db
            .ledger()
            .sell_variant(&product.id, &sell("M", "Black", 1, None), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 0, requested: 1 })
        ));
    }

    #[tokio::test]
    async fn test_restock_bounds() {
        let (db, product) = setup(vec![NewVariant::new("M", "Black", 10)]).await;
        let ledger = db.ledger();
        ledger
            .sell_variant(&product.id, &sell("M", "Black", 3, None), Utc::now())
            .await
            .unwrap();

        let restock = |quantity| RestockVariant {
            size: "M".to_string(),
            color: "Black".to_string(),
            quantity,
        };

        let err = ledger
            .restock_variant(&product.id, &restock(4), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot restock more than sold quantity. Sold: 3, Requested: 4"
        );

        let updated = ledger
            .restock_variant(&product.id, &restock(3), Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.variants[0].sold_quantity, 0);
        assert_eq!(updated.sales_history.len(), 1);
    }

    #[tokio::test]
    async fn test_return_round_trip() {
        let (db, product) = setup(vec![NewVariant::new("M", "Black", 10)]).await;
        let ledger = db.ledger();
        let sold = ledger
            .sell_variant(&product.id, &sell("M", "Black", 4, Some(1200)), Utc::now())
            .await
            .unwrap();
        let sale_id = sold.sales_history[0].id.clone();

        let returned = ledger
            .return_sale(&product.id, &sale_id, Utc::now())
            .await
            .unwrap();
        assert_eq!(returned.variants[0].sold_quantity, 0);
        assert!(returned.sales_history.is_empty());

        let err = ledger
            .return_sale(&product.id, &sale_id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(_))));
    }

    #[tokio::test]
    async fn test_external_sale_and_return_leave_stock_alone() {
        let (db, product) = setup(vec![NewVariant::new("M", "Black", 1)]).await;
        let ledger = db.ledger();

        let updated = ledger
            .record_external_sale(&product.id, &sell("M", "Black", 5, Some(900)), Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.variants[0].sold_quantity, 0);
        assert!(updated.sales_history[0].is_external);

        let sale_id = updated.sales_history[0].id.clone();
        let returned = ledger
            .return_sale(&product.id, &sale_id, Utc::now())
            .await
            .unwrap();
        assert_eq!(returned.variants[0].sold_quantity, 0);
        assert!(returned.sales_history.is_empty());
    }

    #[tokio::test]
    async fn test_update_sale_price() {
        let (db, product) = setup(vec![NewVariant::new("M", "Black", 10)]).await;
        let ledger = db.ledger();
        let sold = ledger
            .sell_variant(&product.id, &sell("M", "Black", 2, None), Utc::now())
            .await
            .unwrap();
        let sale_id = sold.sales_history[0].id.clone();

        let updated = ledger
            .update_sale_price(&product.id, &sale_id, 999, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.sales_history[0].sold_price_cents, 999);
        assert_eq!(updated.variants[0].sold_quantity, 2);

        let err = ledger
            .update_sale_price(&product.id, "nope", 1, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(_))));
    }

    #[tokio::test]
    async fn test_quick_sell() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let input = QuickSell {
            category: "Cap".to_string(),
            size: "One Size".to_string(),
            color: "Red".to_string(),
            quantity: 5,
            sold_price_cents: 1200,
        };

        let product = db.ledger().quick_sell(&input, Utc::now()).await.unwrap();
        assert_eq!(product.name, "Cap Red One Size");
        assert_eq!(product.variants[0].quantity, 5);
        assert_eq!(product.variants[0].sold_quantity, 5);
        assert_eq!(product.sales_history.len(), 1);
        assert_eq!(product.sales_history[0].sold_price_cents, 1200);
    }

    #[tokio::test]
    async fn test_all_sales_newest_first() {
        let (db, product) = setup(vec![NewVariant::new("M", "Black", 10)]).await;
        let ledger = db.ledger();
        let t0 = Utc::now();
        ledger
            .sell_variant(&product.id, &sell("M", "Black", 1, None), t0)
            .await
            .unwrap();
        ledger
            .record_external_sale(
                &product.id,
                &sell("M", "Black", 2, None),
                t0 + chrono::Duration::seconds(5),
            )
            .await
            .unwrap();

        let sales = ledger.all_sales().await.unwrap();
        assert_eq!(sales.len(), 2);
        assert!(sales[0].is_external);
        assert_eq!(sales[0].product_name, "Basic Tee");
        assert_eq!(sales[1].quantity, 1);
    }
}

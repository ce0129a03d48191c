//! # Retail Product Repository
//!
//! Stores and loads the `RetailProduct` aggregate.
//!
//! ## Aggregate Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  retail_products  (1)                                                   │
//! │       │                                                                 │
//! │       ├── product_images    (n, ordered by position)                   │
//! │       ├── product_variants  (n, ordered by position)                   │
//! │       └── sale_records      (n, ordered by sold_at, then insertion)    │
//! │                                                                         │
//! │  All children: ON DELETE CASCADE                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Listings
//! Listings load the whole result set with four queries (products, images,
//! variants, sales) sharing one WHERE clause, then stitch the aggregates
//! together in memory. The "available" and "sold" filters are `EXISTS`
//! predicates on `product_variants`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use loom_core::ledger::merge_variants;
use loom_core::{CoreError, RetailProduct, RetailProductUpdate, SaleRecord, Variant};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    description: String,
    price_cents: i64,
    cost_price_cents: i64,
    category: String,
    material: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(
        self,
        images: Vec<String>,
        variants: Vec<Variant>,
        sales_history: Vec<SaleRecord>,
    ) -> RetailProduct {
        RetailProduct {
            id: self.id,
            name: self.name,
            description: self.description,
            price_cents: self.price_cents,
            cost_price_cents: self.cost_price_cents,
            category: self.category,
            material: self.material,
            images,
            variants,
            sales_history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    product_id: String,
    #[sqlx(flatten)]
    variant: Variant,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    product_id: String,
    #[sqlx(flatten)]
    sale: SaleRecord,
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    product_id: String,
    url: String,
}

/// Which products a listing returns. Each filter is a fixed SQL predicate
/// over `retail_products p`.
#[derive(Debug, Clone, Copy)]
enum Listing {
    All,
    Available,
    Sold,
}

impl Listing {
    fn predicate(self) -> &'static str {
        match self {
            Listing::All => "1 = 1",
            Listing::Available => {
                "EXISTS (SELECT 1 FROM product_variants fv \
                 WHERE fv.product_id = p.id AND fv.quantity - fv.sold_quantity > 0)"
            }
            Listing::Sold => {
                "EXISTS (SELECT 1 FROM product_variants fv \
                 WHERE fv.product_id = p.id AND fv.sold_quantity > 0)"
            }
        }
    }

    fn order(self) -> &'static str {
        match self {
            Listing::All | Listing::Available => "p.created_at DESC, p.rowid DESC",
            Listing::Sold => "p.updated_at DESC, p.rowid DESC",
        }
    }
}

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price_cents, p.cost_price_cents, \
     p.category, p.material, p.created_at, p.updated_at";

// =============================================================================
// Connection-Level Helpers
// =============================================================================
//
// Shared with the ledger repository so every mutation can load and write the
// aggregate inside its own transaction.

/// True when the product row exists.
pub(crate) async fn product_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM retail_products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Bumps `updated_at`. Fails with `ProductNotFound` when the id is unknown.
///
/// As a write, this also takes the SQLite write lock when it is the first
/// statement of a transaction.
pub(crate) async fn touch_product(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE retail_products SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(id.to_string()).into());
    }
    Ok(())
}

/// Loads the variants of one product in stored order.
pub(crate) async fn load_variants(conn: &mut SqliteConnection, id: &str) -> DbResult<Vec<Variant>> {
    let variants = sqlx::query_as::<_, Variant>(
        r#"
        SELECT size, color, quantity, sold_quantity
        FROM product_variants
        WHERE product_id = ?1
        ORDER BY position
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(variants)
}

/// Loads one aggregate, or `None` when the id is unknown.
pub(crate) async fn load_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<RetailProduct>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM retail_products p WHERE p.id = ?1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let images = sqlx::query_scalar::<_, String>(
        "SELECT url FROM product_images WHERE product_id = ?1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let variants = load_variants(conn, id).await?;

    let sales = sqlx::query_as::<_, SaleRecord>(
        r#"
        SELECT id, size, color, quantity, sold_price_cents, sold_at, is_external
        FROM sale_records
        WHERE product_id = ?1
        ORDER BY sold_at, rowid
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(row.into_product(images, variants, sales)))
}

/// Like [`load_product`] but fails with `ProductNotFound`.
pub(crate) async fn require_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<RetailProduct> {
    load_product(conn, id)
        .await?
        .ok_or_else(|| DbError::Domain(CoreError::ProductNotFound(id.to_string())))
}

/// Replaces the variant rows of a product, positions follow slice order.
async fn write_variants(
    conn: &mut SqliteConnection,
    product_id: &str,
    variants: &[Variant],
) -> DbResult<()> {
    sqlx::query("DELETE FROM product_variants WHERE product_id = ?1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    for (position, variant) in variants.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO product_variants (product_id, position, size, color, quantity, sold_quantity)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(product_id)
        .bind(position as i64)
        .bind(&variant.size)
        .bind(&variant.color)
        .bind(variant.quantity)
        .bind(variant.sold_quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn write_images(conn: &mut SqliteConnection, product_id: &str, images: &[String]) -> DbResult<()> {
    sqlx::query("DELETE FROM product_images WHERE product_id = ?1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    for (position, url) in images.iter().enumerate() {
        sqlx::query("INSERT INTO product_images (product_id, position, url) VALUES (?1, ?2, ?3)")
            .bind(product_id)
            .bind(position as i64)
            .bind(url)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Appends one ledger row.
pub(crate) async fn insert_sale_record(
    conn: &mut SqliteConnection,
    product_id: &str,
    sale: &SaleRecord,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_records (
            id, product_id, size, color,
            quantity, sold_price_cents, sold_at, is_external
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&sale.id)
    .bind(product_id)
    .bind(&sale.size)
    .bind(&sale.color)
    .bind(sale.quantity)
    .bind(sale.sold_price_cents)
    .bind(sale.sold_at)
    .bind(sale.is_external)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes a complete aggregate: product row, images, variants and ledger.
pub(crate) async fn insert_product(conn: &mut SqliteConnection, product: &RetailProduct) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO retail_products (
            id, name, description, price_cents, cost_price_cents,
            category, material, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price_cents)
    .bind(product.cost_price_cents)
    .bind(&product.category)
    .bind(&product.material)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    write_images(conn, &product.id, &product.images).await?;
    write_variants(conn, &product.id, &product.variants).await?;
    for sale in &product.sales_history {
        insert_sale_record(conn, &product.id, sale).await?;
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for retail product aggregates.
///
/// ## Usage
/// ```rust,ignore
/// let repo = RetailProductRepository::new(pool);
///
/// repo.insert(&product).await?;
/// let available = repo.list_available().await?;
/// ```
#[derive(Debug, Clone)]
pub struct RetailProductRepository {
    pool: SqlitePool,
}

impl RetailProductRepository {
    /// Creates a new RetailProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RetailProductRepository { pool }
    }

    /// Inserts a complete aggregate in one transaction.
    ///
    /// Used for new products (empty ledger) and for imported ones, which
    /// arrive with stock already sold and a ledger.
    pub async fn insert(&self, product: &RetailProduct) -> DbResult<()> {
        debug!(
            id = %product.id,
            name = %product.name,
            variants = product.variants.len(),
            sales = product.sales_history.len(),
            "Inserting retail product"
        );

        let mut tx = self.pool.begin().await?;
        insert_product(&mut tx, product).await?;
        tx.commit().await?;

        info!(id = %product.id, "Retail product created");
        Ok(())
    }

    /// Gets a product by ID, `None` when absent.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<RetailProduct>> {
        let mut conn = self.pool.acquire().await?;
        load_product(&mut conn, id).await
    }

    /// Gets a product by ID, failing with `ProductNotFound`.
    pub async fn get_by_id(&self, id: &str) -> DbResult<RetailProduct> {
        let mut conn = self.pool.acquire().await?;
        require_product(&mut conn, id).await
    }

    /// All products, newest created first.
    pub async fn list_all(&self) -> DbResult<Vec<RetailProduct>> {
        self.list(Listing::All).await
    }

    /// Products with at least one unit on the shelf, newest created first.
    pub async fn list_available(&self) -> DbResult<Vec<RetailProduct>> {
        self.list(Listing::Available).await
    }

    /// Products with at least one unit sold, most recently updated first.
    pub async fn list_sold(&self) -> DbResult<Vec<RetailProduct>> {
        self.list(Listing::Sold).await
    }

    async fn list(&self, listing: Listing) -> DbResult<Vec<RetailProduct>> {
        debug!(?listing, "Listing retail products");

        let filter = listing.predicate();
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM retail_products p WHERE {} ORDER BY {}",
            PRODUCT_COLUMNS,
            filter,
            listing.order()
        ))
        .fetch_all(&mut *conn)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut images: HashMap<String, Vec<String>> = HashMap::new();
        let image_rows = sqlx::query_as::<_, ImageRow>(&format!(
            "SELECT i.product_id, i.url FROM product_images i \
             JOIN retail_products p ON p.id = i.product_id \
             WHERE {} ORDER BY i.product_id, i.position",
            filter
        ))
        .fetch_all(&mut *conn)
        .await?;
        for row in image_rows {
            images.entry(row.product_id).or_default().push(row.url);
        }

        let mut variants: HashMap<String, Vec<Variant>> = HashMap::new();
        let variant_rows = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT v.product_id, v.size, v.color, v.quantity, v.sold_quantity \
             FROM product_variants v \
             JOIN retail_products p ON p.id = v.product_id \
             WHERE {} ORDER BY v.product_id, v.position",
            filter
        ))
        .fetch_all(&mut *conn)
        .await?;
        for row in variant_rows {
            variants.entry(row.product_id).or_default().push(row.variant);
        }

        let mut sales: HashMap<String, Vec<SaleRecord>> = HashMap::new();
        let sale_rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT s.product_id, s.id, s.size, s.color, s.quantity, \
                    s.sold_price_cents, s.sold_at, s.is_external \
             FROM sale_records s \
             JOIN retail_products p ON p.id = s.product_id \
             WHERE {} ORDER BY s.product_id, s.sold_at, s.rowid",
            filter
        ))
        .fetch_all(&mut *conn)
        .await?;
        for row in sale_rows {
            sales.entry(row.product_id).or_default().push(row.sale);
        }

        let products: Vec<RetailProduct> = rows
            .into_iter()
            .map(|row| {
                let id = row.id.clone();
                row.into_product(
                    images.remove(&id).unwrap_or_default(),
                    variants.remove(&id).unwrap_or_default(),
                    sales.remove(&id).unwrap_or_default(),
                )
            })
            .collect();

        debug!(count = products.len(), "Listing returned products");
        Ok(products)
    }

    /// Applies a partial update in one transaction.
    ///
    /// ## Variant Merge
    /// When `variants` is supplied the stored list is rebuilt by
    /// [`merge_variants`]: sold quantities of matching `(size, color)`
    /// survive, new variants start at 0, omitted ones are dropped. A
    /// quantity below the preserved sold quantity aborts the whole update.
    ///
    /// ## Scalar Fields
    /// `None` keeps the stored value. `material` is optional on the product
    /// but cannot be cleared here: once set, an update can only replace it.
    pub async fn update(
        &self,
        id: &str,
        update: &RetailProductUpdate,
        now: DateTime<Utc>,
    ) -> DbResult<RetailProduct> {
        debug!(id = %id, variants = update.variants.is_some(), "Updating retail product");

        let mut tx = self.pool.begin().await?;

        // Scalar fields first: as a write it takes the lock before the
        // variant read below.
        let result = sqlx::query(
            r#"
            UPDATE retail_products SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                price_cents = COALESCE(?4, price_cents),
                category = COALESCE(?5, category),
                material = COALESCE(?6, material),
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.price_cents)
        .bind(&update.category)
        .bind(&update.material)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        if let Some(images) = &update.images {
            write_images(&mut tx, id, images).await?;
        }

        if let Some(incoming) = &update.variants {
            let existing = load_variants(&mut tx, id).await?;
            let merged = merge_variants(&existing, incoming)?;
            write_variants(&mut tx, id, &merged).await?;
        }

        let product = require_product(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, "Retail product updated");
        Ok(product)
    }

    /// Hard-deletes a product. Images, variants and ledger go with it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting retail product");

        let result = sqlx::query("DELETE FROM retail_products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(id = %id, "Retail product deleted");
        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM retail_products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use loom_core::ledger::new_product;
    use loom_core::{NewRetailProduct, NewVariant};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn tee(variants: Vec<NewVariant>) -> RetailProduct {
        new_product(
            NewRetailProduct {
                name: "Basic Tee".to_string(),
                description: "Cotton t-shirt".to_string(),
                price_cents: 1500,
                cost_price_cents: Some(600),
                category: "T-Shirt".to_string(),
                material: Some("Cotton".to_string()),
                images: vec!["front.jpg".to_string(), "back.jpg".to_string()],
                variants,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let db = test_db().await;
        let product = tee(vec![
            NewVariant::new("M", "Black", 10),
            NewVariant::new("S", "White", 0),
        ]);
        db.products().insert(&product).await.unwrap();

        let loaded = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(loaded, product);
    }

    #[tokio::test]
    async fn test_get_missing_is_product_not_found() {
        let db = test_db().await;
        let err = db.products().get_by_id("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
        assert!(db.products().find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listings_filter_by_stock() {
        let db = test_db().await;
        let repo = db.products();

        let mut sold_out = tee(vec![NewVariant::new("M", "Black", 2)]);
        sold_out.variants[0].sold_quantity = 2;
        let fresh = tee(vec![NewVariant::new("L", "Black", 3)]);
        let empty = tee(vec![NewVariant::new("XL", "Black", 0)]);

        repo.insert(&sold_out).await.unwrap();
        repo.insert(&fresh).await.unwrap();
        repo.insert(&empty).await.unwrap();

        assert_eq!(repo.list_all().await.unwrap().len(), 3);

        let available = repo.list_available().await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, fresh.id);

        let sold = repo.list_sold().await.unwrap();
        assert_eq!(sold.len(), 1);
        assert_eq!(sold[0].id, sold_out.id);
        assert_eq!(sold[0].variants[0].sold_quantity, 2);
    }

    #[tokio::test]
    async fn test_update_merges_variants() {
        let db = test_db().await;
        let repo = db.products();
        let mut product = tee(vec![
            NewVariant::new("M", "Black", 10),
            NewVariant::new("M", "White", 5),
        ]);
        product.variants[0].sold_quantity = 4;
        repo.insert(&product).await.unwrap();

        let update = RetailProductUpdate {
            price_cents: Some(1800),
            variants: Some(vec![
                NewVariant::new("M", "Black", 12),
                NewVariant::new("L", "Red", 2),
            ]),
            ..Default::default()
        };
        let updated = repo.update(&product.id, &update, Utc::now()).await.unwrap();

        assert_eq!(updated.price_cents, 1800);
        assert_eq!(updated.cost_price_cents, 600);
        assert_eq!(updated.name, "Basic Tee");
        assert_eq!(updated.variants.len(), 2);
        assert_eq!(updated.variants[0].sold_quantity, 4);
        assert_eq!(updated.variants[0].quantity, 12);
        assert_eq!(updated.variants[1].sold_quantity, 0);
    }

    #[tokio::test]
    async fn test_update_material_is_replace_only() {
        let db = test_db().await;
        let repo = db.products();
        let product = tee(vec![NewVariant::new("M", "Black", 1)]);
        repo.insert(&product).await.unwrap();

        let untouched = repo
            .update(&product.id, &RetailProductUpdate::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(untouched.material.as_deref(), Some("Cotton"));

        let update = RetailProductUpdate {
            material: Some("Linen".to_string()),
            ..Default::default()
        };
        let replaced = repo.update(&product.id, &update, Utc::now()).await.unwrap();
        assert_eq!(replaced.material.as_deref(), Some("Linen"));
    }

    #[tokio::test]
    async fn test_update_below_sold_rolls_back() {
        let db = test_db().await;
        let repo = db.products();
        let mut product = tee(vec![NewVariant::new("M", "Black", 10)]);
        product.variants[0].sold_quantity = 4;
        repo.insert(&product).await.unwrap();

        let update = RetailProductUpdate {
            name: Some("Renamed".to_string()),
            variants: Some(vec![NewVariant::new("M", "Black", 3)]),
            ..Default::default()
        };
        let err = repo.update(&product.id, &update, Utc::now()).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::QuantityBelowSold { .. })
        ));

        let reloaded = repo.get_by_id(&product.id).await.unwrap();
        assert_eq!(reloaded.name, "Basic Tee");
        assert_eq!(reloaded.variants[0].quantity, 10);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let repo = db.products();
        let product = tee(vec![NewVariant::new("M", "Black", 10)]);
        repo.insert(&product).await.unwrap();

        repo.delete(&product.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.delete(&product.id).await.is_err());
    }
}

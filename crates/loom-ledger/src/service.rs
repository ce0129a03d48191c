//! # Ledger Service
//!
//! One method per ledger operation. Each validates its input, stamps the
//! current time and delegates to a repository.
//!
//! ## Operations
//! ```text
//! ┌────────────────────────┬──────────────────────────────────────────────┐
//! │ catalog                │ create, find_all, find_available, find_sold, │
//! │                        │ find_one, update, remove                     │
//! ├────────────────────────┼──────────────────────────────────────────────┤
//! │ stock + ledger         │ sell_variant, record_external_sale,          │
//! │                        │ restock_variant, return_sale,                │
//! │                        │ update_sale_price, quick_sell                │
//! ├────────────────────────┼──────────────────────────────────────────────┤
//! │ reads                  │ get_all_sales, get_sales_report              │
//! ├────────────────────────┼──────────────────────────────────────────────┤
//! │ point of sale          │ create/list/remove_standalone_sale           │
//! ├────────────────────────┼──────────────────────────────────────────────┤
//! │ migration              │ import_legacy                                │
//! └────────────────────────┴──────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use loom_core::ledger::new_product;
use loom_core::legacy::parse_documents;
use loom_core::validation::{
    validate_new_product, validate_price, validate_quick_sell, validate_restock, validate_sell,
    validate_standalone_sale, validate_update,
};
use loom_core::{
    NewRetailProduct, NewStandaloneSale, QuickSell, RestockVariant, RetailProduct,
    RetailProductUpdate, SaleEntry, SalesReport, SellVariant, StandaloneSale, ValidationError,
    DEFAULT_RECENT_SALES_LIMIT,
};
use loom_db::Database;

// =============================================================================
// Import Summary
// =============================================================================

/// Outcome of a legacy import run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Products inserted
    pub imported: usize,

    /// Documents rejected
    pub skipped: usize,

    /// One entry per rejected document
    pub failures: Vec<ImportFailure>,
}

/// A rejected legacy document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    /// Position in the input array
    pub index: usize,
    pub legacy_id: Option<String>,
    pub error: LedgerError,
}

// =============================================================================
// Service
// =============================================================================

/// The inventory ledger.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct LedgerService {
    db: Database,
    recent_sales_limit: usize,
}

impl LedgerService {
    /// Wraps an open database.
    pub fn new(db: Database) -> Self {
        LedgerService {
            db,
            recent_sales_limit: DEFAULT_RECENT_SALES_LIMIT,
        }
    }

    /// Opens the configured database and runs migrations.
    pub async fn connect(config: &LedgerConfig) -> LedgerResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(LedgerService::new(db).with_recent_sales_limit(config.recent_sales_limit))
    }

    /// Sets how many entries `get_sales_report` returns in `recent_sales`.
    pub fn with_recent_sales_limit(mut self, limit: usize) -> Self {
        self.recent_sales_limit = limit;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Creates a product with zero sold stock and an empty ledger.
    pub async fn create(&self, input: NewRetailProduct) -> LedgerResult<RetailProduct> {
        validate_new_product(&input)?;

        let product = new_product(input, Utc::now());
        self.db.products().insert(&product).await?;
        Ok(product)
    }

    /// Every product, newest created first.
    pub async fn find_all(&self) -> LedgerResult<Vec<RetailProduct>> {
        Ok(self.db.products().list_all().await?)
    }

    /// Products with at least one unit available.
    pub async fn find_available(&self) -> LedgerResult<Vec<RetailProduct>> {
        Ok(self.db.products().list_available().await?)
    }

    /// Products with at least one unit sold, most recently updated first.
    pub async fn find_sold(&self) -> LedgerResult<Vec<RetailProduct>> {
        Ok(self.db.products().list_sold().await?)
    }

    pub async fn find_one(&self, id: &str) -> LedgerResult<RetailProduct> {
        Ok(self.db.products().get_by_id(id).await?)
    }

    /// Applies a partial update. See `RetailProductRepository::update` for
    /// the variant merge.
    pub async fn update(
        &self,
        id: &str,
        update: RetailProductUpdate,
    ) -> LedgerResult<RetailProduct> {
        validate_update(&update)?;
        Ok(self.db.products().update(id, &update, Utc::now()).await?)
    }

    /// Hard-deletes a product together with its ledger.
    pub async fn remove(&self, id: &str) -> LedgerResult<()> {
        self.db.products().delete(id).await?;
        Ok(())
    }

    // =========================================================================
    // Stock and Ledger
    // =========================================================================

    pub async fn sell_variant(&self, id: &str, input: SellVariant) -> LedgerResult<RetailProduct> {
        validate_sell(&input)?;
        Ok(self.db.ledger().sell_variant(id, &input, Utc::now()).await?)
    }

    /// Records a sale made outside the shop's stock. Stock is untouched.
    pub async fn record_external_sale(
        &self,
        id: &str,
        input: SellVariant,
    ) -> LedgerResult<RetailProduct> {
        validate_sell(&input)?;
        Ok(self
            .db
            .ledger()
            .record_external_sale(id, &input, Utc::now())
            .await?)
    }

    pub async fn restock_variant(
        &self,
        id: &str,
        input: RestockVariant,
    ) -> LedgerResult<RetailProduct> {
        validate_restock(&input)?;
        Ok(self
            .db
            .ledger()
            .restock_variant(id, &input, Utc::now())
            .await?)
    }

    /// Removes a sale record, putting internal sales back into stock.
    pub async fn return_sale(&self, product_id: &str, sale_id: &str) -> LedgerResult<RetailProduct> {
        Ok(self
            .db
            .ledger()
            .return_sale(product_id, sale_id, Utc::now())
            .await?)
    }

    pub async fn update_sale_price(
        &self,
        product_id: &str,
        sale_id: &str,
        sold_price_cents: i64,
    ) -> LedgerResult<RetailProduct> {
        validate_price("sold_price", sold_price_cents)?;
        Ok(self
            .db
            .ledger()
            .update_sale_price(product_id, sale_id, sold_price_cents, Utc::now())
            .await?)
    }

    /// Creates a single-variant product and sells all of it.
    pub async fn quick_sell(&self, input: QuickSell) -> LedgerResult<RetailProduct> {
        validate_quick_sell(&input)?;
        Ok(self.db.ledger().quick_sell(&input, Utc::now()).await?)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every ledger entry across products, newest first.
    pub async fn get_all_sales(&self) -> LedgerResult<Vec<SaleEntry>> {
        Ok(self.db.ledger().all_sales().await?)
    }

    pub async fn get_sales_report(&self, id: &str) -> LedgerResult<SalesReport> {
        let product = self.db.products().get_by_id(id).await?;
        let report = SalesReport::build(&product, self.recent_sales_limit);

        debug!(
            product_id = %id,
            groups = report.sales_by_variant.len(),
            orphaned = report.orphaned_groups(),
            revenue = %report.total_revenue(),
            "Sales report built"
        );
        Ok(report)
    }

    // =========================================================================
    // Standalone Sales
    // =========================================================================

    pub async fn create_standalone_sale(
        &self,
        input: NewStandaloneSale,
    ) -> LedgerResult<StandaloneSale> {
        validate_standalone_sale(&input)?;
        Ok(self
            .db
            .standalone_sales()
            .create(&input, Utc::now())
            .await?)
    }

    /// Newest first.
    pub async fn list_standalone_sales(&self) -> LedgerResult<Vec<StandaloneSale>> {
        Ok(self.db.standalone_sales().list().await?)
    }

    /// Returns whether a sale was removed. Removing twice is not an error.
    pub async fn remove_standalone_sale(&self, id: &str) -> LedgerResult<bool> {
        Ok(self.db.standalone_sales().remove(id).await?)
    }

    // =========================================================================
    // Legacy Import
    // =========================================================================

    /// Imports a JSON array of exported retail product documents.
    ///
    /// Each document is converted and inserted on its own; a rejected
    /// document is recorded in the summary and the rest carry on. Only a
    /// malformed array fails the whole call.
    pub async fn import_legacy(&self, json: &str) -> LedgerResult<ImportSummary> {
        let documents = parse_documents(json).map_err(|e| {
            LedgerError::from(ValidationError::InvalidFormat {
                field: "documents".to_string(),
                reason: e.to_string(),
            })
        })?;

        info!(documents = documents.len(), "Importing legacy retail products");

        let now = Utc::now();
        let mut summary = ImportSummary::default();

        for (index, document) in documents.into_iter().enumerate() {
            let legacy_id = document.id.as_ref().map(|id| id.as_str().to_string());

            let result = match document.into_import(now) {
                Ok(import) => self
                    .db
                    .products()
                    .insert(&import.product)
                    .await
                    .map(|_| import)
                    .map_err(LedgerError::from),
                Err(e) => Err(LedgerError::from(e)),
            };

            match result {
                Ok(import) => {
                    debug!(
                        legacy_id = ?import.legacy_id,
                        id = %import.product.id,
                        "Legacy product imported"
                    );
                    summary.imported += 1;
                }
                Err(error) => {
                    warn!(index, legacy_id = ?legacy_id, error = %error, "Legacy product skipped");
                    summary.skipped += 1;
                    summary.failures.push(ImportFailure {
                        index,
                        legacy_id,
                        error,
                    });
                }
            }
        }

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "Legacy import finished"
        );
        Ok(summary)
    }
}

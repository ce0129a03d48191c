//! # Database Migrations
//!
//! Embedded SQL migrations for the Loom ledger.
//!
//! ## Schema History
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  001_initial_schema      retail_products, product_images,              │
//! │                          product_variants, sale_records                │
//! │  002_add_cost_price      retail_products.cost_price_cents DEFAULT 0    │
//! │  003_add_external_sales  sale_records.is_external DEFAULT 0            │
//! │  004_standalone_sales    standalone_sales                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Columns added after the first release carry an explicit default, so rows
//! written before them read back complete without any defaulting in code.
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Each migration runs in its own transaction, in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)`.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}

//! Standalone sale repository: a point-of-sale log with no stock attached.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use loom_core::{NewStandaloneSale, StandaloneSale};

/// Repository for standalone sales.
#[derive(Debug, Clone)]
pub struct StandaloneSaleRepository {
    pool: SqlitePool,
}

impl StandaloneSaleRepository {
    /// Creates a new StandaloneSaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StandaloneSaleRepository { pool }
    }

    /// Stores a sale stamped with `now`.
    pub async fn create(
        &self,
        input: &NewStandaloneSale,
        now: DateTime<Utc>,
    ) -> DbResult<StandaloneSale> {
        let sale = StandaloneSale {
            id: Uuid::new_v4().to_string(),
            category: input.category.clone(),
            size: input.size.clone(),
            color: input.color.clone(),
            quantity: input.quantity,
            sold_price_cents: input.sold_price_cents,
            sold_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO standalone_sales (
                id, category, size, color, quantity, sold_price_cents, sold_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.category)
        .bind(&sale.size)
        .bind(&sale.color)
        .bind(sale.quantity)
        .bind(sale.sold_price_cents)
        .bind(sale.sold_at)
        .execute(&self.pool)
        .await?;

        info!(id = %sale.id, category = %sale.category, "Standalone sale recorded");
        Ok(sale)
    }

    /// All standalone sales, newest first.
    pub async fn list(&self) -> DbResult<Vec<StandaloneSale>> {
        let sales = sqlx::query_as::<_, StandaloneSale>(
            r#"
            SELECT id, category, size, color, quantity, sold_price_cents, sold_at
            FROM standalone_sales
            ORDER BY sold_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = sales.len(), "Loaded standalone sales");
        Ok(sales)
    }

    /// Deletes a sale. Returns `false` when nothing had that id.
    pub async fn remove(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM standalone_sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        debug!(id = %id, removed, "Standalone sale removal");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn cap() -> NewStandaloneSale {
        NewStandaloneSale {
            category: "Cap".to_string(),
            size: "One Size".to_string(),
            color: "Red".to_string(),
            quantity: 2,
            sold_price_cents: 800,
        }
    }

    #[tokio::test]
    async fn test_create_list_remove() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.standalone_sales();
        let t0 = Utc::now();

        let first = repo.create(&cap(), t0).await.unwrap();
        let second = repo
            .create(&cap(), t0 + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(listed[1].sold_price_cents, 800);

        assert!(repo.remove(&first.id).await.unwrap());
        assert!(!repo.remove(&first.id).await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_timestamp_orders_by_insertion() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.standalone_sales();
        let now = Utc::now();

        let first = repo.create(&cap(), now).await.unwrap();
        let second = repo.create(&cap(), now).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}

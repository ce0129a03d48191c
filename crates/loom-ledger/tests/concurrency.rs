//! Concurrent stock mutations against a file-backed, multi-connection pool.

use std::sync::Arc;

use loom_core::{NewRetailProduct, NewVariant, RestockVariant, SellVariant};
use loom_db::{Database, DbConfig};
use loom_ledger::{ErrorCode, LedgerService};
use tempfile::TempDir;

async fn file_service(dir: &TempDir) -> LedgerService {
    let config = DbConfig::new(dir.path().join("ledger.db")).max_connections(8);
    let db = Database::new(config).await.unwrap();
    LedgerService::new(db)
}

fn hoodie(quantity: i64) -> NewRetailProduct {
    NewRetailProduct {
        name: "Pullover Hoodie".to_string(),
        description: "Brushed fleece".to_string(),
        price_cents: 4500,
        cost_price_cents: Some(2000),
        category: "Hoodie".to_string(),
        material: None,
        images: vec![],
        variants: vec![NewVariant::new("M", "Black", quantity)],
    }
}

fn one_unit() -> SellVariant {
    SellVariant {
        size: "M".to_string(),
        color: "Black".to_string(),
        quantity: 1,
        sold_price_cents: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sells_never_oversell() {
    let dir = TempDir::new().unwrap();
    let ledger = Arc::new(file_service(&dir).await);
    let product = ledger.create(hoodie(5)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..12 {
        let ledger = Arc::clone(&ledger);
        let id = product.id.clone();
        handles.push(tokio::spawn(async move {
            ledger.sell_variant(&id, one_unit()).await
        }));
    }

    let mut sold = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(err) => {
                assert_eq!(err.code, ErrorCode::InvalidStock, "{}", err);
                rejected += 1;
            }
        }
    }

    assert_eq!(sold, 5);
    assert_eq!(rejected, 7);

    let after = ledger.find_one(&product.id).await.unwrap();
    assert_eq!(after.variants[0].sold_quantity, 5);
    assert_eq!(after.sales_history.len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sells_and_restocks_keep_bounds() {
    let dir = TempDir::new().unwrap();
    let ledger = Arc::new(file_service(&dir).await);
    let product = ledger.create(hoodie(3)).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let ledger = Arc::clone(&ledger);
        let id = product.id.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                ledger.sell_variant(&id, one_unit()).await.map(|_| ())
            } else {
                let restock = RestockVariant {
                    size: "M".to_string(),
                    color: "Black".to_string(),
                    quantity: 1,
                };
                ledger.restock_variant(&id, restock).await.map(|_| ())
            }
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            assert_eq!(err.code, ErrorCode::InvalidStock, "{}", err);
        }
    }

    let after = ledger.find_one(&product.id).await.unwrap();
    let variant = &after.variants[0];
    assert!(variant.sold_quantity >= 0 && variant.sold_quantity <= variant.quantity);

    // every successful sell left a record; restocks leave none
    let internal: i64 = after.sales_history.iter().map(|s| s.quantity).sum();
    assert!(variant.sold_quantity <= internal);
}

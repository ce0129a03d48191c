//! # Seed Data Generator
//!
//! Populates the database with textile products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p loom-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p loom-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p loom-db --bin seed -- --db ./data/loom.db
//!
//! # Load products from a JSON array of NewRetailProduct instead
//! cargo run -p loom-db --bin seed -- --fixture ./fixtures/products.json
//! ```
//!
//! ## Generated Products
//! Every product gets one variant per size and color of its line, with
//! stock between 0 and 24. Every third product is partially sold through
//! the ledger, so listings and reports have something to show.

use chrono::Utc;
use std::env;
use std::fs;

use loom_core::ledger::new_product;
use loom_core::{NewRetailProduct, NewVariant, SellVariant};
use loom_db::{Database, DbConfig};

/// (category, product names, base price in cents)
const LINES: &[(&str, &[&str], i64)] = &[
    (
        "T-Shirt",
        &["Basic Tee", "Pocket Tee", "V-Neck Tee", "Longline Tee", "Graphic Tee"],
        1500,
    ),
    (
        "Hoodie",
        &["Pullover Hoodie", "Zip Hoodie", "Fleece Hoodie", "Oversized Hoodie"],
        4500,
    ),
    (
        "Jeans",
        &["Slim Jeans", "Straight Jeans", "Relaxed Jeans", "Bootcut Jeans"],
        5500,
    ),
    (
        "Dress",
        &["Wrap Dress", "Shirt Dress", "Maxi Dress", "Slip Dress"],
        6500,
    ),
    ("Cap", &["Baseball Cap", "Bucket Hat", "Beanie"], 1200),
];

const MATERIALS: &[&str] = &["Cotton", "Linen", "Denim", "Wool Blend", "Polyester"];

const SIZES: &[&str] = &["S", "M", "L", "XL"];

const COLORS: &[&str] = &["Black", "White", "Navy", "Olive"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./loom_dev.db");
    let mut fixture: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--fixture" | "-f" => {
                if i + 1 < args.len() {
                    fixture = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Loom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>       Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>       Database file path (default: ./loom_dev.db)");
                println!("  -f, --fixture <FILE>  JSON array of products to load instead");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Loom Seed Data Generator");
    println!("========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let inputs = match &fixture {
        Some(path) => {
            println!("Loading fixture {}", path);
            let json = fs::read_to_string(path)?;
            serde_json::from_str::<Vec<NewRetailProduct>>(&json)?
        }
        None => generate_products(count),
    };

    println!();
    println!("Inserting {} products...", inputs.len());

    let start = std::time::Instant::now();
    let mut inserted = 0;
    let mut sales = 0;

    for (seed, input) in inputs.into_iter().enumerate() {
        let product = new_product(input, Utc::now());

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }
        inserted += 1;

        if seed % 3 == 0 {
            if let Some(variant) = product.variants.iter().find(|v| v.quantity > 1) {
                let sell = SellVariant {
                    size: variant.size.clone(),
                    color: variant.color.clone(),
                    quantity: variant.quantity / 2,
                    sold_price_cents: None,
                };
                match db.ledger().sell_variant(&product.id, &sell, Utc::now()).await {
                    Ok(_) => sales += 1,
                    Err(e) => eprintln!("Failed to sell {}: {}", product.name, e),
                }
            }
        }

        if inserted % 50 == 0 {
            println!("  Inserted {} products...", inserted);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Inserted {} products in {:?}", inserted, elapsed);
    println!("✓ Recorded {} sales", sales);

    let available = db.products().list_available().await?.len();
    let sold = db.products().list_sold().await?.len();
    println!("  Available listing: {} products", available);
    println!("  Sold listing: {} products", sold);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates `count` products by cycling through the product lines.
fn generate_products(count: usize) -> Vec<NewRetailProduct> {
    let names: Vec<(&str, &str, i64)> = LINES
        .iter()
        .flat_map(|(category, names, base)| names.iter().map(move |n| (*category, *n, *base)))
        .collect();

    (0..count)
        .map(|seed| {
            let (category, name, base) = names[seed % names.len()];
            generate_product(category, name, base, seed)
        })
        .collect()
}

/// Generates a single product with deterministic pseudo-random data.
fn generate_product(category: &str, name: &str, base_price: i64, seed: usize) -> NewRetailProduct {
    let material = MATERIALS[seed % MATERIALS.len()];

    // Price: base + up to $9.99
    let price_cents = base_price + ((seed * 37) % 1000) as i64;

    // Cost (45-65% of price)
    let cost_pct = 45 + (seed % 20) as i64;

    // Two colors per product, all sizes
    let colors = [COLORS[seed % COLORS.len()], COLORS[(seed + 1) % COLORS.len()]];
    let variants = colors
        .iter()
        .flat_map(|color| {
            SIZES.iter().enumerate().map(move |(idx, size)| {
                let quantity = ((seed * 7 + idx * 5) % 25) as i64;
                NewVariant::new(*size, *color, quantity)
            })
        })
        .collect();

    NewRetailProduct {
        name: format!("{} #{}", name, seed + 1),
        description: format!("{} {} in {}", material, name.to_lowercase(), category),
        price_cents,
        cost_price_cents: Some(price_cents * cost_pct / 100),
        category: category.to_string(),
        material: Some(material.to_string()),
        images: vec![format!(
            "https://images.example.com/{}/{}.jpg",
            category.to_lowercase(),
            seed
        )],
        variants,
    }
}

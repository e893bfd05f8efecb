//! # Seed Data Generator
//!
//! Populates the database with units, categories and stocked products for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path and batches per product
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --batches 3
//! ```
//!
//! ## Generated Data
//! - The standard units (`pcs`, `kg`, `g`, `l`, `ml`, `m`, `cm`, `mm`,
//!   `inch`, `pack`) with their decimal places
//! - Categories: Clothing, Footwear, Accessories, Plumbing, Other
//! - A product list per category, each restocked with a few batches,
//!   some of them dated so FIFO-by-expiry is visible

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::env;
use tally_core::{NewBatch, NewCategory, NewProduct, NewUnit};
use tally_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// (code, name, decimal places)
const UNITS: &[(&str, &str, u32)] = &[
    ("pcs", "Piece", 0),
    ("kg", "Kilogram", 3),
    ("g", "Gram", 0),
    ("l", "Litre", 2),
    ("ml", "Millilitre", 0),
    ("m", "Metre", 2),
    ("cm", "Centimetre", 1),
    ("mm", "Millimetre", 0),
    ("inch", "Inch", 2),
    ("pack", "Pack", 0),
];

/// (category, [(product name, unit code, price in cents, size label)])
const PRODUCTS: &[(&str, &[(&str, &str, i64, Option<&str>)])] = &[
    (
        "Clothing",
        &[
            ("Cotton T-Shirt", "pcs", 8_900, Some("M")),
            ("Cotton T-Shirt", "pcs", 8_900, Some("L")),
            ("Denim Jeans", "pcs", 24_900, Some("32")),
            ("Wool Socks", "pack", 3_500, None),
        ],
    ),
    (
        "Footwear",
        &[
            ("Running Shoes", "pcs", 45_000, Some("42")),
            ("Rubber Boots", "pcs", 19_900, Some("43")),
        ],
    ),
    (
        "Accessories",
        &[
            ("Leather Belt", "pcs", 12_000, None),
            ("Satin Ribbon", "m", 450, None),
        ],
    ),
    (
        "Plumbing",
        &[
            ("PVC Pipe 20mm", "m", 1_250, None),
            ("Copper Wire", "m", 800, None),
            ("Pipe Sealant", "l", 6_400, None),
            ("Cement Mix", "kg", 300, None),
        ],
    ),
    ("Other", &[("Batteries AA", "pack", 2_200, None)]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut batches_per_product: usize = 2;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--batches" | "-b" => {
                if i + 1 < args.len() {
                    batches_per_product = args[i + 1].parse().unwrap_or(2);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --batches <N>  Batches per product (default: 2)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally POS Seed Data Generator");
    println!("================================");
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

    let mut units = HashMap::new();
    for (code, name, decimal_places) in UNITS {
        let unit = db
            .units()
            .create(&NewUnit {
                code: code.to_string(),
                name: name.to_string(),
                decimal_places: *decimal_places,
            })
            .await?;
        units.insert(*code, unit);
    }
    println!("✓ Created {} units", units.len());

    let start = std::time::Instant::now();
    let today = Utc::now().date_naive();
    let mut generated = 0;
    let mut received = 0;

    for (category_name, products) in PRODUCTS {
        let category = db
            .categories()
            .create(&NewCategory {
                name: category_name.to_string(),
            })
            .await?;

        for (index, (name, unit_code, price_cents, size_label)) in products.iter().enumerate() {
            let Some(unit) = units.get(unit_code) else {
                eprintln!("Unknown unit {} for {}", unit_code, name);
                continue;
            };

            let product = match db
                .products()
                .create(&NewProduct {
                    name: name.to_string(),
                    unit_id: unit.id.clone(),
                    sale_price_cents: *price_cents,
                    category_id: category.id.clone(),
                    size_label: size_label.map(str::to_string),
                    barcode: None,
                    initial_batch: None,
                })
                .await
            {
                Ok(product) => product,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", name, e);
                    continue;
                }
            };
            generated += 1;

            for n in 0..batches_per_product {
                let seed = (index + n * 7) as i64;
                // Fractional amounts only where the unit allows them.
                let quantity = Decimal::new(5 + seed % 20, 0)
                    + Decimal::new(seed % 4 * 25, 2).round_dp(unit.decimal_places);
                let expiration_date = (n % 2 == 1).then(|| today + Duration::days(30 + seed * 3));

                db.batches()
                    .create(&NewBatch {
                        product_id: product.id.clone(),
                        quantity,
                        supplier: Some(format!("{} Supply Co.", category_name)),
                        purchase_price_cents: Some(price_cents * (60 + seed % 20) / 100),
                        expiration_date,
                    })
                    .await?;
                received += 1;
            }

            let stock = db.stock().get(&product.id).await?;
            println!(
                "  {:<20} {:>4} {:>10} {}",
                product.name,
                size_label.unwrap_or("-"),
                stock.quantity,
                unit.code
            );
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products and {} batches in {:?}",
        generated, received, elapsed
    );
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

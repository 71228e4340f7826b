//! # Seed Data
//!
//! Populates a database with the standard shipping zones and a small demo
//! catalog.
//!
//! ## Usage
//! ```bash
//! cargo run -p emporium-db --bin seed
//! cargo run -p emporium-db --bin seed -- --db ./data/emporium.db
//! cargo run -p emporium-db --bin seed -- --zones-only
//! ```
//!
//! Zones are matched by name, so re-running updates tariffs in place.
//! Products are only inserted into an empty catalog.

use emporium_core::Money;
use emporium_db::{Database, DbConfig, NewProduct};
use std::env;

/// Zone name and price per kilogram.
const ZONES: &[(&str, i64)] = &[
    ("Jawa", 10_000),
    ("Sumatera", 18_000),
    ("Kalimantan", 22_000),
    ("Sulawesi", 25_000),
    ("Bali & Nusa Tenggara", 20_000),
    ("Papua & Maluku", 35_000),
];

/// Name, price, weight in grams, stock.
const PRODUCTS: &[(&str, i64, i64, i64)] = &[
    ("Nasi Goreng Spesial", 25_000, 350, 100),
    ("Mie Ayam Bakso", 20_000, 300, 80),
    ("Es Teh Manis", 5_000, 400, 200),
    ("Jus Alpukat", 15_000, 450, 50),
    ("Keripik Singkong Pedas", 12_000, 200, 150),
    ("Makaroni Goreng", 10_000, 250, 120),
    ("Kaos Polos", 25_000, 250, 100),
    ("Tas Kanvas", 15_000, 500, 60),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./emporium_dev.db");
    let mut zones_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--zones-only" => zones_only = true,
            "--help" | "-h" => {
                println!("Emporium Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./emporium_dev.db)");
                println!("      --zones-only   Seed shipping zones and skip products");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Emporium Seed Data");
    println!("=====================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let zones = db.zones();
    let existing = zones.list_all().await?;
    for (name, price_per_kg) in ZONES {
        let price = Money::from_minor(*price_per_kg);
        match existing.iter().find(|z| z.name == *name) {
            Some(zone) => {
                zones.update(zone.id, name, price).await?;
                println!("  ↻ {} ({})", name, price);
            }
            None => {
                zones.create(name, price).await?;
                println!("  + {} ({})", name, price);
            }
        }
    }
    println!("✓ {} shipping zones", ZONES.len());

    if zones_only {
        return Ok(());
    }

    let products = db.products();
    let count = products.count().await?;
    if count > 0 {
        println!("⚠ Catalog already has {} products, skipping", count);
        return Ok(());
    }

    for (name, price, weight_grams, stock) in PRODUCTS {
        products
            .insert(&NewProduct {
                name: name.to_string(),
                price: Money::from_minor(*price),
                weight_grams: *weight_grams,
                stock: *stock,
            })
            .await?;
    }
    println!("✓ {} products", PRODUCTS.len());

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

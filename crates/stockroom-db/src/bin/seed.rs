//! # Seed Data Generator
//!
//! Populates the ledger with demo stock for development.
//!
//! ## Usage
//! ```bash
//! # 200 stock records (default)
//! cargo run -p stockroom-db --bin seed
//!
//! # Custom amount and database
//! cargo run -p stockroom-db --bin seed -- --count 1000 --db ./data/ledger.db
//! ```
//!
//! ## Generated Stock
//! - SKU: `{FAMILY}-{NNN}`
//! - Lots: `L{YYMM}-{N}`, inbound dates spread over the last months so
//!   FIFO ordering has something to chew on
//! - Locations: aisle/rack codes like `A01-R3`

use chrono::{Duration, NaiveDate, Utc};
use std::env;
use stockroom_core::{plan_delta, DeltaMode, InventoryKey};
use stockroom_db::{Database, DbConfig, InventoryRepository, WriteStamp};

/// Product families for realistic SKUs
const FAMILIES: &[&str] = &["BOLT", "NUT", "WASH", "SCRW", "PIPE", "VALV", "GASK", "HOSE"];

/// Number of distinct SKUs per family
const SKUS_PER_FAMILY: usize = 12;

/// Aisles in the demo warehouse
const AISLES: &[&str] = &["A01", "A02", "B01", "B02", "C01"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./stockroom_dev.db");

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
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of stock records to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockroom_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockroom Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Records:  {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.inventory().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} stock records", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating stock...");

    let today = Utc::now().date_naive();
    let start = std::time::Instant::now();
    let mut generated = 0;

    for n in 0..count {
        let (key, quantity, inbound_date) = generate_record(n, today);
        let now = Utc::now();
        let stamp = WriteStamp {
            actor_id: "seed",
            id_stamp: "SEED",
            at: now,
        };

        let mut tx = db.begin().await?;
        let current = InventoryRepository::find(&mut tx, &key)
            .await?
            .map(|r| r.quantity);
        let plan = match plan_delta(&key, current, quantity, DeltaMode::Receive { inbound_date }) {
            Ok(plan) => plan,
            Err(e) => {
                eprintln!("Skipping {}: {}", key, e);
                continue;
            }
        };
        if let Err(e) = InventoryRepository::apply(&mut tx, &key, plan, stamp).await {
            eprintln!("Failed to insert {}: {}", key, e);
            continue;
        }
        tx.commit().await?;

        generated += 1;
        if generated % 50 == 0 {
            println!("  Generated {} records...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} records in {:?}", generated, elapsed);

    println!();
    println!("Low stock (<= 10):");
    for row in db.inventory().low_stock(10).await?.iter().take(10) {
        println!("  {:<12} {}", row.sku, row.total);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Deterministic record number `n`: key, quantity and inbound date.
fn generate_record(n: usize, today: NaiveDate) -> (InventoryKey, i64, NaiveDate) {
    let family = FAMILIES[n % FAMILIES.len()];
    let sku = format!("{}-{:03}", family, (n / FAMILIES.len()) % SKUS_PER_FAMILY + 1);

    let age_days = ((n * 37) % 180) as i64;
    let inbound_date = today - Duration::days(age_days);
    let lot = format!("L{}-{}", inbound_date.format("%y%m"), n % 7 + 1);

    let aisle = AISLES[(n / 3) % AISLES.len()];
    let location = format!("{}-R{}", aisle, n % 5 + 1);

    // a few near-empty lots so the low stock report has content
    let quantity = if n % 11 == 0 { 1 + (n % 4) as i64 } else { 5 + ((n * 13) % 96) as i64 };

    (InventoryKey::new(sku, lot, location), quantity, inbound_date)
}

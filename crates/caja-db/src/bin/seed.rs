//! # Seed Data Generator
//!
//! Populates a development database with branches, cashiers and stocked
//! products so tills can be opened and sales rung up right away.
//!
//! ## Usage
//! ```bash
//! # Three branches, 40 products each (default)
//! cargo run -p caja-db --bin seed
//!
//! # More products per branch
//! cargo run -p caja-db --bin seed -- --products 200
//!
//! # Specify database path
//! cargo run -p caja-db --bin seed -- --db ./data/caja.db
//! ```
//!
//! ## Generated Data
//! - Branches: Centro, Norte, Sur
//! - Cashiers: `admin` (admin), one `cajero.<branch>` per branch
//! - Per branch: products `{BRANCH}-{CATEGORY}-{NNN}` with 0-60 units
//! - Two branch-less "virtual" items (gift wrap, bag) sellable anywhere

use caja_db::{Database, DbConfig, NewProduct};
use std::env;

const BRANCHES: &[&str] = &["Centro", "Norte", "Sur"];

/// Category code and base product names.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("BEB", &["Agua Mineral", "Jugo Naranja", "Bebida Cola", "Té Helado", "Café Molido"]),
    ("SNK", &["Papas Fritas", "Galletas", "Chocolate", "Maní Salado", "Barra Cereal"]),
    ("LAC", &["Leche Entera", "Yogur Natural", "Queso Mantecoso", "Mantequilla", "Crema"]),
    ("ALM", &["Arroz", "Fideos", "Aceite", "Azúcar", "Harina"]),
];

const VIRTUAL_ITEMS: &[(&str, &str, i64)] = &[("VIR-001", "Envoltorio Regalo", 50_000), ("VIR-002", "Bolsa", 10_000)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut per_branch: usize = 40;
    let mut db_path = String::from("./caja_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    per_branch = args[i + 1].parse().unwrap_or(40);
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
                println!("Caja POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N>  Products per branch (default: 40)");
                println!("  -d, --db <PATH>     Database file path (default: ./caja_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Caja POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Products per branch: {}", per_branch);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.branches().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} branches", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admin = db.cashiers().create("admin", true, None).await?;
    println!("✓ Admin cashier: {} ({})", admin.username, admin.id);

    let start = std::time::Instant::now();
    let mut generated = 0;

    for (branch_idx, branch_name) in BRANCHES.iter().enumerate() {
        let branch = db.branches().create(branch_name).await?;
        let username = format!("cajero.{}", branch_name.to_lowercase());
        let cashier = db.cashiers().create(&username, false, Some(&branch.id)).await?;
        println!();
        println!("Branch {} ({})", branch.name, branch.id);
        println!("  Cashier: {} ({})", cashier.username, cashier.id);

        let code = branch_name[..3].to_uppercase();
        for n in 0..per_branch {
            let (category, names) = CATEGORIES[n % CATEGORIES.len()];
            let name = names[(n / CATEGORIES.len()) % names.len()];
            let seed = branch_idx * 10_000 + n;

            // sale price 990-9.990 in whole units, cost 55-75% of it
            let sale_price_cents = (990 + ((seed * 37) % 9_000) as i64) * 100;
            let cost_pct = 55 + (seed % 21) as i64;

            let product = NewProduct {
                sku: format!("{code}-{category}-{n:03}"),
                name: format!("{name} {}", n / (CATEGORIES.len() * names.len()) + 1),
                purchase_price_cents: sale_price_cents * cost_pct / 100,
                sale_price_cents,
                branch_id: Some(branch.id.clone()),
                allow_sale_without_stock: false,
                legacy_stock: 0,
            };

            let sku = product.sku.clone();
            let inserted = match db.products().insert(product).await {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", sku, e);
                    continue;
                }
            };

            let stock = (seed % 61) as i64;
            if stock > 0 {
                db.products().restock(&inserted.id, &branch.id, stock).await?;
            }
            generated += 1;
        }
        println!("  Products: {}", per_branch);
    }

    for (sku, name, price) in VIRTUAL_ITEMS {
        db.products()
            .insert(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                purchase_price_cents: 0,
                sale_price_cents: *price,
                branch_id: None,
                allow_sale_without_stock: true,
                legacy_stock: 0,
            })
            .await?;
        generated += 1;
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!("✓ Seed complete!");

    Ok(())
}

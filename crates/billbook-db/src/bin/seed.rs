//! # Seed Data Generator
//!
//! Populates a development database with users and catalog items.
//!
//! ## Usage
//! ```bash
//! # Seed ./billbook_dev.db with the default catalog
//! cargo run -p billbook-db --bin seed
//!
//! # Cap the number of items
//! cargo run -p billbook-db --bin seed -- --count 20
//!
//! # Specify database path
//! cargo run -p billbook-db --bin seed -- --db ./data/billbook.db
//! ```
//!
//! ## Generated Data
//! - One Admin (`admin`) and one Editor (`editor`)
//! - Items per vendor and category, owned by the editor, with stock
//!   between 5 and 60

use std::env;

use billbook_core::{Money, Percentage, Role, User};
use billbook_db::{Catalog, Database, DbConfig, NewItem};
use chrono::Utc;
use uuid::Uuid;

/// (vendor, category, items as (name, sale price in rupees))
const CATALOG: &[(&str, &str, &[(&str, i64)])] = &[
    (
        "Agro Mills",
        "Grains",
        &[
            ("Basmati Rice", 120),
            ("Sona Masoori Rice", 70),
            ("Wheat Atta", 55),
            ("Toor Dal", 140),
            ("Moong Dal", 130),
            ("Chana Dal", 95),
        ],
    ),
    (
        "Spice Route",
        "Spices",
        &[
            ("Turmeric Powder", 40),
            ("Red Chilli Powder", 60),
            ("Garam Masala", 85),
            ("Cumin Seeds", 75),
            ("Black Pepper", 110),
        ],
    ),
    (
        "Looms & Co",
        "Apparel",
        &[
            ("Cotton Kurta", 100),
            ("Linen Shirt", 150),
            ("Silk Saree", 900),
            ("Denim Jeans", 650),
            ("Cotton Dupatta", 180),
        ],
    ),
    (
        "Dairy Fresh",
        "Dairy",
        &[("Paneer", 90), ("Ghee", 550), ("Curd", 35), ("Butter", 60)],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = usize::MAX;
    let mut db_path = String::from("./billbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
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
                println!("Billbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Maximum number of items (default: whole catalog)");
                println!("  -d, --db <PATH>    Database file path (default: ./billbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Billbook Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    if let Some(admin) = db.users().ensure_admin("admin", "admin@billbook.local").await? {
        println!("✓ Created admin '{}' ({})", admin.username, admin.id);
    }

    let editor = match db.users().get_by_username("editor").await? {
        Some(user) => user,
        None => {
            let user = User {
                id: Uuid::new_v4().to_string(),
                username: "editor".to_string(),
                email: "editor@billbook.local".to_string(),
                role: Role::Editor,
                created_at: Utc::now(),
            };
            db.users().insert(&user).await?;
            println!("✓ Created editor '{}' ({})", user.username, user.id);
            user
        }
    };
    let owner = editor.principal();

    println!();
    println!("Generating items...");

    let catalog = Catalog::new(db.clone());
    let start = std::time::Instant::now();
    let mut generated = 0;

    'vendors: for (vendor_idx, (vendor, category, items)) in CATALOG.iter().enumerate() {
        for (item_idx, (name, rupees)) in items.iter().enumerate() {
            if generated >= count {
                break 'vendors;
            }

            let seed = vendor_idx * 10 + item_idx;
            let sale_price = Money::from_major(*rupees);
            let request = NewItem {
                name: name.to_string(),
                // 60-80% of the sale price
                cost_price: Money::from_cents(sale_price.cents() * (60 + (seed % 20) as i64) / 100),
                sale_price,
                stock: 5 + (seed * 7 % 56) as i64,
                vendor_name: Some(vendor.to_string()),
                category: Some(category.to_string()),
                commission: Percentage::from_bps(if seed % 3 == 0 { 250 } else { 0 }),
            };

            match catalog.create_item(&owner, request).await {
                Ok(item) => {
                    generated += 1;
                    println!("  {:<20} {:>10}  stock {}", item.name, sale_price, item.stock);
                }
                Err(e) => eprintln!("Failed to insert {}: {}", name, e),
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} items in {:?}", generated, elapsed);
    println!("  Next bill number: {}", db.bills().peek_next_number().await?);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

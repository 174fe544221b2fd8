//! # Seed Data Generator
//!
//! Populates the database with a demo dataset for development and prints
//! the resulting annual rollup as CSV.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p atelier-db --bin seed
//!
//! # Specify database path and rollup year
//! cargo run -p atelier-db --bin seed -- --db ./data/atelier.db --year 2026
//! ```

use chrono::{TimeZone, Utc};
use std::env;
use uuid::Uuid;

use atelier_core::aggregate::CommissionAggregator;
use atelier_core::export::monthly_rollup_csv;
use atelier_core::rollup::MonthlyRollupEngine;
use atelier_core::{
    AdminRole, AdminUser, CommissionConfig, Expense, ItemKind, PaymentMethod, PaymentStatus,
    Product, Professional, Sale, SaleItem, Service, DEFAULT_LOCATION_ID,
};
use atelier_db::{Database, DbConfig};

const SERVICES: &[(&str, &str, i64, u32)] = &[
    ("svc-cut", "Haircut", 4_500, 1_500),
    ("svc-color", "Full Color", 12_000, 1_200),
    ("svc-style", "Blowout & Style", 6_500, 1_500),
    ("svc-treatment", "Keratin Treatment", 18_000, 1_000),
];

const PRODUCTS: &[(&str, &str, i64, i64, u32)] = &[
    ("prd-shampoo", "Repair Shampoo", 2_800, 1_200, 500),
    ("prd-serum", "Argan Serum", 4_200, 1_900, 500),
    ("prd-mask", "Hydration Mask", 3_500, 1_500, 800),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./atelier_dev.db");
    let mut year: i32 = 2026;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--year" | "-y" => {
                if i + 1 < args.len() {
                    year = args[i + 1].parse().unwrap_or(2026);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Atelier Console Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./atelier_dev.db)");
                println!("  -y, --year <YEAR>  Rollup year to print (default: 2026)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Atelier Console Seed Data Generator");
    println!("===================================");
    println!("Database: {db_path}");
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    if !db.staff().list_professionals().await?.is_empty() {
        println!("⚠ Database already seeded, skipping.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    seed_records(&db, year).await?;
    println!("✓ Demo dataset written");
    println!();

    print_rollup(&db, year).await?;

    Ok(())
}

async fn seed_records(db: &Database, year: i32) -> Result<(), Box<dyn std::error::Error>> {
    sqlx::query("INSERT INTO locations (id, name, is_active) VALUES (?1, ?2, 1)")
        .bind(DEFAULT_LOCATION_ID)
        .bind("Main Studio")
        .execute(db.pool())
        .await?;

    for (id, name, price, bps) in SERVICES {
        db.catalog()
            .insert_service(&Service {
                id: id.to_string(),
                name: name.to_string(),
                price_cents: *price,
                default_commission: Some(CommissionConfig::Percentage(*bps)),
                is_active: true,
            })
            .await?;
    }

    for (id, name, price, cost, bps) in PRODUCTS {
        db.catalog()
            .insert_product(&Product {
                id: id.to_string(),
                name: name.to_string(),
                price_cents: *price,
                purchase_cost_cents: *cost,
                default_commission: Some(CommissionConfig::Percentage(*bps)),
                current_stock: 40,
                is_active: true,
            })
            .await?;
    }

    // One professional on catalog defaults, one with a personal override
    // on color work.
    db.staff()
        .insert_professional(&Professional {
            id: "pro-ana".to_string(),
            name: "Ana Rivas".to_string(),
            is_active: true,
            default_commission: Some(CommissionConfig::Percentage(1_000)),
            service_overrides: [("svc-color".to_string(), CommissionConfig::Percentage(2_000))]
                .into_iter()
                .collect(),
            product_overrides: Default::default(),
        })
        .await?;
    db.staff()
        .insert_professional(&Professional {
            id: "pro-marco".to_string(),
            name: "Marco Deluca".to_string(),
            is_active: true,
            default_commission: None,
            service_overrides: Default::default(),
            product_overrides: Default::default(),
        })
        .await?;

    db.staff()
        .insert_admin(&AdminUser {
            id: "adm-owner".to_string(),
            name: "Lucia Ferr".to_string(),
            role: AdminRole::Owner,
            commission: Some(CommissionConfig::Percentage(1_500)),
        })
        .await?;

    db.ledger().set_discounts_affect_commissions(true).await?;

    // A few months of activity: settled sales, one deposit sale, expenses.
    for month in 1..=6u32 {
        let created = Utc.with_ymd_and_hms(year, month, 12, 11, 0, 0).unwrap();
        db.sales()
            .insert_sale(&Sale {
                id: Uuid::new_v4().to_string(),
                location_id: DEFAULT_LOCATION_ID.to_string(),
                client_id: Some("client-demo".to_string()),
                reservation_id: None,
                payment_method: PaymentMethod::Card,
                payment_status: PaymentStatus::Paid,
                total_cents: 16_500 + 2_800,
                amount_paid_cents: None,
                tip_cents: 1_000,
                discount_cents: 0,
                items: vec![
                    SaleItem {
                        item_id: "svc-color".to_string(),
                        kind: ItemKind::Service,
                        name_snapshot: "Full Color".to_string(),
                        quantity: 1,
                        unit_price_cents: 12_000,
                        subtotal_cents: 12_000,
                        discount_cents: 0,
                        professional_id: Some("pro-ana".to_string()),
                    },
                    SaleItem {
                        item_id: "svc-cut".to_string(),
                        kind: ItemKind::Service,
                        name_snapshot: "Haircut".to_string(),
                        quantity: 1,
                        unit_price_cents: 4_500,
                        subtotal_cents: 4_500,
                        discount_cents: 0,
                        professional_id: Some("pro-marco".to_string()),
                    },
                    SaleItem {
                        item_id: "prd-shampoo".to_string(),
                        kind: ItemKind::Product,
                        name_snapshot: "Repair Shampoo".to_string(),
                        quantity: 1,
                        unit_price_cents: 2_800,
                        subtotal_cents: 2_800,
                        discount_cents: 0,
                        professional_id: Some("pro-ana".to_string()),
                    },
                ],
                created_at: created,
            })
            .await?;

        db.ledger()
            .insert_expense(&Expense {
                id: Uuid::new_v4().to_string(),
                date: Utc.with_ymd_and_hms(year, month, 1, 9, 0, 0).unwrap(),
                amount_cents: 9_000,
                concept: "Rent".to_string(),
                recipient: "Studio landlord".to_string(),
                location_id: DEFAULT_LOCATION_ID.to_string(),
            })
            .await?;
    }

    // A deposit-paid sale: excluded from commissions, half-recognised in
    // revenue.
    db.sales()
        .insert_sale(&Sale {
            id: Uuid::new_v4().to_string(),
            location_id: DEFAULT_LOCATION_ID.to_string(),
            client_id: Some("client-demo".to_string()),
            reservation_id: None,
            payment_method: PaymentMethod::Transfer,
            payment_status: PaymentStatus::DepositPaid,
            total_cents: 18_000,
            amount_paid_cents: Some(9_000),
            tip_cents: 0,
            discount_cents: 0,
            items: vec![SaleItem {
                item_id: "svc-treatment".to_string(),
                kind: ItemKind::Service,
                name_snapshot: "Keratin Treatment".to_string(),
                quantity: 1,
                unit_price_cents: 18_000,
                subtotal_cents: 18_000,
                discount_cents: 0,
                professional_id: Some("pro-ana".to_string()),
            }],
            created_at: Utc.with_ymd_and_hms(year, 7, 3, 15, 0, 0).unwrap(),
        })
        .await?;

    Ok(())
}

async fn print_rollup(db: &Database, year: i32) -> Result<(), Box<dyn std::error::Error>> {
    let from = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).unwrap();

    let sales = db.sales().list_between(from, to, None).await?;
    let expenses = db.ledger().list_expenses_between(from, to, None).await?;
    let services = db.catalog().list_services().await?;
    let products = db.catalog().list_products().await?;
    let professionals = db.staff().list_professionals().await?;
    let admins = db.staff().list_admins().await?;
    let adjustments = db.ledger().list_adjustments(year).await?;
    let settings = db.ledger().engine_settings().await?;

    let engine = MonthlyRollupEngine::new(
        &services,
        &products,
        &professionals,
        &admins,
        &adjustments,
        settings,
    );
    let rollup = engine.annual(year, &sales, &expenses);

    println!("Annual rollup {year}:");
    println!("{}", monthly_rollup_csv(&rollup));

    let aggregator = CommissionAggregator::new(&services, &products, &professionals, settings);
    let report = aggregator.report(&sales);
    println!(
        "Commission rows: {} ({} cents unassigned)",
        report.rows.len(),
        report.unassigned_cents
    );

    Ok(())
}

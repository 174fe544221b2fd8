//! # atelier-db: Database Layer for Atelier Console
//!
//! This crate provides database access for Atelier Console. It uses
//! SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                     Atelier Console Data Flow                          │
//! │                                                                        │
//! │  Console surface (reports, cancellation)                               │
//! │       │                                                                │
//! │       ▼                                                                │
//! │  ┌────────────────────────────────────────────────────────────────┐   │
//! │  │                    atelier-db (THIS CRATE)                     │   │
//! │  │                                                                │   │
//! │  │  ┌─────────────┐  ┌───────────────┐  ┌─────────────────────┐  │   │
//! │  │  │  Database   │  │ Repositories  │  │ CancellationCoord.  │  │   │
//! │  │  │  (pool.rs)  │  │ sale/catalog/ │  │ one-transaction     │  │   │
//! │  │  │             │◄─│ staff/ledger/ │  │ reversal            │  │   │
//! │  │  │ SqlitePool  │  │ reservation   │  │                     │  │   │
//! │  │  └─────────────┘  └───────────────┘  └─────────────────────┘  │   │
//! │  │                                                                │   │
//! │  └──────────────────────────────┬─────────────────────────────────┘   │
//! │                                 │                                      │
//! │                                 ▼                                      │
//! │                         SQLite (WAL mode)                              │
//! │                                                                        │
//! │  Loaded slices feed atelier-core's engines; derived figures are        │
//! │  never written back.                                                   │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations per aggregate
//! - [`cancellation`] - The sale-cancellation unit of work
//! - [`history`] - One-shot full-history cache
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atelier_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/atelier.db")).await?;
//!
//! let sales = db.sales().list_between(from, to, None).await?;
//! let settings = db.ledger().engine_settings().await?;
//! db.cancellations().cancel_sale("sale-1", "admin").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cancellation;
pub mod error;
pub mod history;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use cancellation::CancellationCoordinator;
pub use error::DbError;
pub use history::FullHistoryCache;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::reservation::ReservationRepository;
pub use repository::sale::SaleRepository;
pub use repository::staff::StaffRepository;

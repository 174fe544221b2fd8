//! # Repository Module
//!
//! Database repository implementations for Atelier Console.
//!
//! ## Repository Pattern
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                        │
//! │  Console surface                                                       │
//! │       │  db.sales().list_between(from, to, None)                       │
//! │       ▼                                                                │
//! │  SaleRepository ── SQL isolated here ──► SQLite                        │
//! │                                                                        │
//! │  Benefits:                                                             │
//! │  • Reports receive plain atelier-core slices; the engines never        │
//! │    see SQL                                                             │
//! │  • Easy to test against an in-memory database                          │
//! │  • SQL is isolated in one place per aggregate                          │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`sale::SaleRepository`] - Sales, items, payment capture
//! - [`catalog::CatalogRepository`] - Services, products, stock movements
//! - [`staff::StaffRepository`] - Professionals, admin users
//! - [`ledger::LedgerRepository`] - Expenses, adjustments, settings
//! - [`reservation::ReservationRepository`] - Reservations

pub mod catalog;
pub mod ledger;
pub mod reservation;
pub mod sale;
pub mod staff;

use std::collections::HashMap;

use crate::error::DbResult;
use atelier_core::CommissionConfig;

/// Parses an optional JSON commission-config column.
pub(crate) fn decode_commission(raw: Option<&str>) -> DbResult<Option<CommissionConfig>> {
    raw.map(|text| serde_json::from_str(text).map_err(crate::error::DbError::from))
        .transpose()
}

/// Parses a JSON override-map column (item/admin id → config).
pub(crate) fn decode_override_map(raw: &str) -> DbResult<HashMap<String, CommissionConfig>> {
    Ok(serde_json::from_str(raw)?)
}

//! # atelier-core: Pure Business Logic for Atelier Console
//!
//! This crate is the **heart** of Atelier Console. It contains the
//! commission & financial rollup engine as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                     Atelier Console Architecture                       │
//! │                                                                        │
//! │  ┌────────────────────────────────────────────────────────────────┐   │
//! │  │              Console UI / export surfaces (external)           │   │
//! │  └──────────────────────────────┬─────────────────────────────────┘   │
//! │                                 │                                      │
//! │  ┌──────────────────────────────▼─────────────────────────────────┐   │
//! │  │               ★ atelier-core (THIS CRATE) ★                    │   │
//! │  │                                                                │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌─────────────────┐  │   │
//! │  │  │  money   │ │commission│ │ allocation│ │    aggregate    │  │   │
//! │  │  │  types   │ │ cascade  │ │eligibility│ │ commission rows │  │   │
//! │  │  └──────────┘ └──────────┘ └───────────┘ └─────────────────┘  │   │
//! │  │  ┌──────────────────────┐ ┌──────────┐ ┌────────────────────┐ │   │
//! │  │  │  rollup (monthly/    │ │ reversal │ │ export adapters    │ │   │
//! │  │  │  annual P&L)         │ │ planning │ │ (fixed columns)    │ │   │
//! │  │  └──────────────────────┘ └──────────┘ └────────────────────┘ │   │
//! │  │                                                                │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └──────────────────────────────┬─────────────────────────────────┘   │
//! │                                 │                                      │
//! │  ┌──────────────────────────────▼─────────────────────────────────┐   │
//! │  │                  atelier-db (Database Layer)                   │   │
//! │  │        SQLite repositories, cancellation transaction           │   │
//! │  └────────────────────────────────────────────────────────────────┘   │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, Professional, Expense, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`commission`] - Commission config union and resolution cascade
//! - [`allocation`] - Line amounts, eligibility, payment ratio, settings
//! - [`aggregate`] - Commission rows and summaries
//! - [`rollup`] - Monthly/annual profit-and-loss engine
//! - [`reversal`] - Cancellation planning (executed by atelier-db)
//! - [`export`] - Fixed-column presentation adapters
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Same records in, same figures out - always
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Derived, Never Stored**: Commission rows and rollups are recomputed
//!    on every query; nothing derived is persisted
//! 5. **Degrade Record-by-Record**: One malformed sale line is skipped with
//!    a warning; it never aborts a whole report
//!
//! ## Example Usage
//!
//! ```rust
//! use atelier_core::allocation::EngineSettings;
//! use atelier_core::aggregate::CommissionAggregator;
//!
//! let settings = EngineSettings::default();
//! let aggregator = CommissionAggregator::new(&[], &[], &[], settings);
//! let report = aggregator.report(&[]);
//! assert!(report.rows.is_empty());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod allocation;
pub mod commission;
pub mod error;
pub mod export;
pub mod money;
pub mod reversal;
pub mod rollup;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use atelier_core::Money` instead of
// `use atelier_core::money::Money`

pub use commission::CommissionConfig;
pub use error::{CoreError, ValidationError};
pub use money::{Money, Rate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default location ID for single-location deployments.
///
/// The schema carries `location_id` everywhere for multi-location
/// businesses; single-location installs use this constant until a second
/// location is registered.
pub const DEFAULT_LOCATION_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Slack, in cents, under which a sale still counts as fully paid.
///
/// ## Business Reason
/// Card terminals and cash rounding leave sub-unit residues; a sale one
/// currency unit short of its total is settled for commission purposes.
pub const FULL_PAYMENT_TOLERANCE_CENTS: i64 = 100;

/// Months in a rollup year. Buckets are fixed: empty months still appear.
pub const MONTHS_PER_YEAR: usize = 12;

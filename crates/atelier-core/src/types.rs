//! # Domain Types
//!
//! Core domain types used throughout Atelier Console.
//!
//! ## Type Hierarchy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                  │
//! │                                                                        │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐        │
//! │  │     Sale       │   │  Professional  │   │ Service/Product│        │
//! │  │  ────────────  │   │  ────────────  │   │  ────────────  │        │
//! │  │  id (UUID)     │   │  id (UUID)     │   │  id (UUID)     │        │
//! │  │  status        │   │  overrides     │   │  default rate  │        │
//! │  │  total_cents   │   │  default rate  │   │  cost_cents    │        │
//! │  │  items[]       │   └────────────────┘   └────────────────┘        │
//! │  └────────────────┘                                                   │
//! │                                                                        │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐        │
//! │  │   AdminUser    │   │    Expense     │   │  Reservation   │        │
//! │  │  + Monthly     │   │ manual ledger  │   │ deposit state  │        │
//! │  │    Adjustment  │   │   entries      │   │   machine      │        │
//! │  └────────────────┘   └────────────────┘   └────────────────┘        │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Source records (Sale, Expense, configuration) are created and mutated by
//! the surrounding system. Everything the engine derives from them
//! (commission rows, rollups) lives in [`crate::aggregate`] and
//! [`crate::rollup`] and is recomputed on every query, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::commission::CommissionConfig;
use crate::money::Money;

// =============================================================================
// Payment Status
// =============================================================================

/// Payment state of a sale or reservation.
///
/// ## State Machine
/// ```text
/// Pending ──► DepositPaid ──► Paid          (forward: payment capture)
/// Paid ──► DepositPaid | Pending            (backward: only via cancellation)
/// ```
/// No other transition is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing collected yet.
    Pending,
    /// A deposit was collected; balance outstanding.
    DepositPaid,
    /// Fully settled.
    Paid,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Bank transfer.
    Transfer,
}

// =============================================================================
// Item Kind
// =============================================================================

/// Whether a sale line is a performed service or a retail product.
///
/// The distinction drives the whole P&L split: service revenue and product
/// revenue roll up into separate profit lines with separate commission pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Service,
    Product,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale transaction with its ordered line items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub location_id: String,
    /// Client the sale was rung up for, when known.
    pub client_id: Option<String>,
    /// Set when the sale settles a reservation; drives rollback on cancel.
    pub reservation_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_cents: i64,
    /// Amount actually collected so far. `None` means fully collected;
    /// a value below `total_cents` marks a partial/deposit payment.
    pub amount_paid_cents: Option<i64>,
    pub tip_cents: i64,
    /// Sale-level discount (line-level discounts live on the items).
    pub discount_cents: i64,
    pub items: Vec<SaleItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the tip as Money.
    #[inline]
    pub fn tip(&self) -> Money {
        Money::from_cents(self.tip_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze catalog data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    /// Catalog id of the service or product sold.
    pub item_id: String,
    pub kind: ItemKind,
    /// Name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line total before discount (unit_price × quantity).
    pub subtotal_cents: i64,
    /// Discount applied to this line.
    pub discount_cents: i64,
    /// Professional credited with the line, when assigned.
    pub professional_id: Option<String>,
}

impl SaleItem {
    /// Returns the line subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Returns the line discount as Money.
    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }
}

// =============================================================================
// Staff
// =============================================================================

/// A professional (stylist, therapist, technician) who performs services
/// and sells products.
///
/// Commission configuration lives at three levels; resolution order is in
/// [`crate::commission::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Professional {
    pub id: String,
    pub name: String,
    /// Whether the professional is active (soft delete).
    pub is_active: bool,
    /// Fallback rate when neither an override nor a catalog default applies.
    pub default_commission: Option<CommissionConfig>,
    /// Per-service overrides, keyed by service id. Highest priority.
    pub service_overrides: HashMap<String, CommissionConfig>,
    /// Per-product overrides, keyed by product id. Highest priority.
    pub product_overrides: HashMap<String, CommissionConfig>,
}

/// Role of a console administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Owner,
    Manager,
}

/// An administrator entitled to a share of monthly profit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdminUser {
    pub id: String,
    pub name: String,
    pub role: AdminRole,
    /// Default profit commission, overridable per month via
    /// [`MonthlyAdjustment`].
    pub commission: Option<CommissionConfig>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A service offered on the menu.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    /// Default commission paid for performing this service.
    pub default_commission: Option<CommissionConfig>,
    pub is_active: bool,
}

/// A retail product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    /// What the business pays to restock one unit. Feeds the
    /// reinvestment line of the product P&L.
    pub purchase_cost_cents: i64,
    /// Default commission paid for selling this product.
    pub default_commission: Option<CommissionConfig>,
    pub current_stock: i64,
    pub is_active: bool,
}

impl Product {
    /// Returns the unit purchase cost as Money.
    #[inline]
    pub fn purchase_cost(&self) -> Money {
        Money::from_cents(self.purchase_cost_cents)
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// A hand-entered cost record (rent, supplies, payouts).
///
/// Distinct from commission rows, which are always derived and never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    pub id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub amount_cents: i64,
    pub concept: String,
    pub recipient: String,
    pub location_id: String,
}

impl Expense {
    /// Returns the expense amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Per-month admin commission overrides.
///
/// Absence of an admin id in a map means that admin falls back to their
/// default rate for that month. The service and product maps are
/// independent: an admin can be overridden on one P&L and not the other.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyAdjustment {
    pub year: i32,
    /// 1-based month.
    pub month: u32,
    /// Overrides applied against the service profit subtotal.
    pub service_overrides: HashMap<String, CommissionConfig>,
    /// Overrides applied against the product profit subtotal.
    pub product_overrides: HashMap<String, CommissionConfig>,
}

// =============================================================================
// Reservation
// =============================================================================

/// A client reservation, possibly holding a deposit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub client_id: String,
    pub status: PaymentStatus,
    pub total_cents: i64,
    /// Deposit collected upfront, when any.
    pub deposit_cents: Option<i64>,
    /// Outstanding balance (`total − deposit` while not fully paid).
    pub pending_cents: i64,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Why a stock quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementCause {
    Sale,
    Cancellation,
    Restock,
    Adjustment,
}

/// Audit record of an inventory quantity change with cause and
/// before/after values.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub from_qty: i64,
    pub to_qty: i64,
    pub quantity: i64,
    pub cause: MovementCause,
    /// Who triggered the change (user id or system actor).
    pub actor: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Report Filter
// =============================================================================

/// Pre-filter applied by presentation adapters before handing sales to the
/// aggregation engines. The engines themselves are filter-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportFilter {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    pub location_id: Option<String>,
    pub professional_id: Option<String>,
}

impl ReportFilter {
    /// Whether a sale falls inside this filter.
    ///
    /// The professional filter matches a sale when ANY of its lines is
    /// assigned to that professional.
    pub fn matches(&self, sale: &Sale) -> bool {
        if sale.created_at < self.from || sale.created_at >= self.to {
            return false;
        }
        if let Some(location) = &self.location_id {
            if &sale.location_id != location {
                return false;
            }
        }
        if let Some(professional) = &self.professional_id {
            if !sale
                .items
                .iter()
                .any(|item| item.professional_id.as_ref() == Some(professional))
            {
                return false;
            }
        }
        true
    }
}

/// Applies a [`ReportFilter`] to a sale slice, preserving input order.
pub fn filter_sales<'a>(sales: &'a [Sale], filter: &ReportFilter) -> Vec<&'a Sale> {
    sales.iter().filter(|s| filter.matches(s)).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

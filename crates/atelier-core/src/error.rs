//! # Error Types
//!
//! Domain-specific error types for atelier-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                   │
//! │                                                                        │
//! │  atelier-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                        │
//! │  atelier-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                        │
//! │  Flow: ValidationError → CoreError → DbError → caller                 │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-record problems inside the reporting path (unknown ids, missing
//! configs) are NOT errors - the aggregators skip the record, log a warning
//! and keep going. These enums cover the write path and input validation,
//! where failing loudly is the correct behavior.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The sale is not in a payment state that allows the operation.
    ///
    /// ## When This Occurs
    /// - Cancelling a sale that is still Pending (nothing to reverse)
    /// - Any transition outside the payment state machine
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidPaymentState {
        sale_id: String,
        current_status: String,
    },

    /// A product referenced by a sale line does not exist in stock records.
    ///
    /// ## When This Occurs
    /// - During cancellation planning. The write path is strict: an
    ///   unknown product aborts the whole reversal rather than crediting
    ///   stock that cannot be audited.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The sale references a reservation that was not supplied.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation at the storage boundary, before business
/// logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Amount paid exceeds the sale total.
    #[error("amount paid {paid} exceeds sale total {total}")]
    OverPaid { paid: i64, total: i64 },

    /// Invalid format (e.g., invalid month number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # Validation Module
//!
//! Input validation utilities for Atelier Console.
//!
//! Used at the storage boundary before records are written; the reporting
//! path never validates - it skips and warns instead (see
//! [`crate::aggregate`]).

use crate::commission::CommissionConfig;
use crate::error::ValidationError;
use crate::types::Sale;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an entity id: non-empty, at most 64 characters.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }
    Ok(())
}

/// Validates a display name: non-empty, at most 120 characters.
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.len() > 120 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 120,
        });
    }
    Ok(())
}

/// Validates a monetary amount that must not be negative.
pub fn validate_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a 1-based month number.
pub fn validate_month(month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }
    Ok(())
}

/// Validates a commission configuration.
///
/// Percentage rates are capped at 100%: a higher rate would let a single
/// line's commission exceed its own base, breaking the invariant that a
/// sale's commissions never exceed its total. Fixed amounts must not be
/// negative.
pub fn validate_commission(config: &CommissionConfig) -> ValidationResult<()> {
    match config {
        CommissionConfig::Percentage(bps) => {
            if *bps > 10_000 {
                return Err(ValidationError::OutOfRange {
                    field: "commission".to_string(),
                    min: 0,
                    max: 10_000,
                });
            }
        }
        CommissionConfig::Fixed(cents) => {
            if *cents < 0 {
                return Err(ValidationError::MustBePositive {
                    field: "commission".to_string(),
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a sale record before insert.
pub fn validate_sale(sale: &Sale) -> ValidationResult<()> {
    validate_id("sale_id", &sale.id)?;
    validate_id("location_id", &sale.location_id)?;
    validate_amount("total", sale.total_cents)?;
    validate_amount("tip", sale.tip_cents)?;
    validate_amount("discount", sale.discount_cents)?;

    if let Some(paid) = sale.amount_paid_cents {
        validate_amount("amount_paid", paid)?;
        if paid > sale.total_cents {
            return Err(ValidationError::OverPaid {
                paid,
                total: sale.total_cents,
            });
        }
    }

    for item in &sale.items {
        validate_id("item_id", &item.item_id)?;
        validate_amount("subtotal", item.subtotal_cents)?;
        validate_amount("item discount", item.discount_cents)?;
        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        if item.discount_cents > item.subtotal_cents {
            return Err(ValidationError::OutOfRange {
                field: "item discount".to_string(),
                min: 0,
                max: item.subtotal_cents,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemKind, PaymentMethod, PaymentStatus, SaleItem};
    use chrono::Utc;

    fn valid_sale() -> Sale {
        Sale {
            id: "sale-1".to_string(),
            location_id: "loc-1".to_string(),
            client_id: None,
            reservation_id: None,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Paid,
            total_cents: 5_000,
            amount_paid_cents: None,
            tip_cents: 0,
            discount_cents: 0,
            items: vec![SaleItem {
                item_id: "svc-1".to_string(),
                kind: ItemKind::Service,
                name_snapshot: "Cut".to_string(),
                quantity: 1,
                unit_price_cents: 5_000,
                subtotal_cents: 5_000,
                discount_cents: 0,
                professional_id: None,
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("sale_id", "sale-1").is_ok());
        assert!(validate_id("sale_id", "  ").is_err());
        assert!(validate_id("sale_id", &"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_month() {
        assert!(validate_month(1).is_ok());
        assert!(validate_month(12).is_ok());
        assert!(validate_month(0).is_err());
        assert!(validate_month(13).is_err());
    }

    #[test]
    fn test_validate_commission() {
        assert!(validate_commission(&CommissionConfig::Percentage(10_000)).is_ok());
        assert!(validate_commission(&CommissionConfig::Percentage(10_001)).is_err());
        assert!(validate_commission(&CommissionConfig::Fixed(0)).is_ok());
        assert!(validate_commission(&CommissionConfig::Fixed(-1)).is_err());
    }

    #[test]
    fn test_validate_sale_happy_path() {
        assert!(validate_sale(&valid_sale()).is_ok());
    }

    #[test]
    fn test_validate_sale_rejects_overpayment() {
        let mut sale = valid_sale();
        sale.amount_paid_cents = Some(6_000);
        assert!(matches!(
            validate_sale(&sale),
            Err(ValidationError::OverPaid { .. })
        ));
    }

    #[test]
    fn test_validate_sale_rejects_oversized_item_discount() {
        let mut sale = valid_sale();
        sale.items[0].discount_cents = 6_000;
        assert!(validate_sale(&sale).is_err());
    }

    #[test]
    fn test_validate_sale_rejects_nonpositive_quantity() {
        let mut sale = valid_sale();
        sale.items[0].quantity = 0;
        assert!(validate_sale(&sale).is_err());
    }
}

//! # Allocation Engine
//!
//! Decides what each sale line is actually worth under discounts and
//! partial payments, and whether a sale may generate commission rows
//! at all.
//!
//! ## Two Distinct Inclusion Predicates
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                                                                        │
//! │  Commission eligibility        Revenue recognition                     │
//! │  ─────────────────────         ──────────────────                     │
//! │  Paid, or within 1 unit        EVERY sale contributes, scaled         │
//! │  of fully paid                 by the fraction collected              │
//! │                                                                        │
//! │  Sale{total 200, paid 100, DepositPaid}                               │
//! │    → commission rows: NONE                                            │
//! │    → monthly income:  100 (200 × 0.5)                                 │
//! │                                                                        │
//! │  The payment ratio NEVER scales commission rows - a professional      │
//! │  is paid in full once the sale settles, or not at all before.         │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::money::Money;
use crate::types::{PaymentStatus, Sale, SaleItem};
use crate::FULL_PAYMENT_TOLERANCE_CENTS;

// =============================================================================
// Engine Settings
// =============================================================================

/// Computation settings, loaded once and threaded explicitly into every
/// aggregation call. Never ambient, never module-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// When true, commissions are computed on the discounted line amount
    /// (`subtotal − discount`); when false, on the raw subtotal.
    ///
    /// Applies identically to service and product lines.
    pub discounts_affect_commissions: bool,
}

impl Default for EngineSettings {
    /// The safe default: discounts reduce the commission base, so a
    /// misconfigured system can never over-pay staff.
    fn default() -> Self {
        EngineSettings {
            discounts_affect_commissions: true,
        }
    }
}

impl EngineSettings {
    /// Builds settings from a storage lookup that may have failed.
    ///
    /// A missing or unreadable setting falls back to the default and logs;
    /// report computation is never blocked on configuration.
    pub fn from_lookup(discounts_affect_commissions: Option<bool>) -> Self {
        match discounts_affect_commissions {
            Some(value) => EngineSettings {
                discounts_affect_commissions: value,
            },
            None => {
                warn!("discounts_affect_commissions unavailable, defaulting to true");
                EngineSettings::default()
            }
        }
    }
}

// =============================================================================
// Line Amounts
// =============================================================================

/// The real collected value of a line: subtotal minus its discount.
#[inline]
pub fn real_sale_amount(item: &SaleItem) -> Money {
    item.subtotal() - item.discount()
}

/// The base a commission is computed against, per the settings toggle.
#[inline]
pub fn commission_base(item: &SaleItem, settings: &EngineSettings) -> Money {
    if settings.discounts_affect_commissions {
        real_sale_amount(item)
    } else {
        item.subtotal()
    }
}

// =============================================================================
// Commission Eligibility
// =============================================================================

/// Whether a sale's lines may generate commission rows at all.
///
/// True when the sale is fully settled: `payment_status == Paid`, or the
/// outstanding balance is within [`FULL_PAYMENT_TOLERANCE_CENTS`] (rounding
/// slack of one currency unit). DepositPaid/Pending/partial sales are
/// excluded entirely - they still count toward revenue via
/// [`PaymentRatio`].
pub fn is_commission_eligible(sale: &Sale) -> bool {
    if sale.payment_status == PaymentStatus::Paid {
        return true;
    }
    match sale.amount_paid_cents {
        Some(paid) => sale.total_cents - paid <= FULL_PAYMENT_TOLERANCE_CENTS,
        None => false,
    }
}

// =============================================================================
// Payment Ratio
// =============================================================================

/// The fraction of a sale actually collected, as an exact cents pair.
///
/// Kept as numerator/denominator rather than a float so that scaling stays
/// in integer arithmetic end to end. Used ONLY for revenue recognition in
/// the rollup engine, never to scale commission rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRatio {
    paid_cents: i64,
    total_cents: i64,
}

impl PaymentRatio {
    /// Derives the ratio for a sale.
    ///
    /// A recorded payment below the total yields `paid/total`; anything
    /// else (no partial record, or a record at/above total) is 1.
    pub fn for_sale(sale: &Sale) -> Self {
        match sale.amount_paid_cents {
            Some(paid) if paid < sale.total_cents && sale.total_cents > 0 => PaymentRatio {
                paid_cents: paid,
                total_cents: sale.total_cents,
            },
            _ => PaymentRatio::full(),
        }
    }

    /// The identity ratio (everything collected).
    pub const fn full() -> Self {
        PaymentRatio {
            paid_cents: 1,
            total_cents: 1,
        }
    }

    /// Whether this ratio recognises the full amount.
    pub fn is_full(&self) -> bool {
        self.paid_cents == self.total_cents
    }

    /// Scales an amount by the ratio.
    pub fn apply(&self, amount: Money) -> Money {
        if self.is_full() {
            amount
        } else {
            amount.scale(self.paid_cents, self.total_cents)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemKind, PaymentMethod};
    use chrono::Utc;

    fn item(subtotal: i64, discount: i64) -> SaleItem {
        SaleItem {
            item_id: "svc-1".to_string(),
            kind: ItemKind::Service,
            name_snapshot: "Color".to_string(),
            quantity: 1,
            unit_price_cents: subtotal,
            subtotal_cents: subtotal,
            discount_cents: discount,
            professional_id: Some("pro-1".to_string()),
        }
    }

    fn sale(status: PaymentStatus, total: i64, paid: Option<i64>) -> Sale {
        Sale {
            id: "s1".to_string(),
            location_id: "loc-1".to_string(),
            client_id: None,
            reservation_id: None,
            payment_method: PaymentMethod::Card,
            payment_status: status,
            total_cents: total,
            amount_paid_cents: paid,
            tip_cents: 0,
            discount_cents: 0,
            items: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_real_sale_amount() {
        assert_eq!(real_sale_amount(&item(10_000, 1500)).cents(), 8500);
    }

    #[test]
    fn test_commission_base_follows_toggle() {
        let line = item(10_000, 1500);

        let with_discounts = EngineSettings {
            discounts_affect_commissions: true,
        };
        let without = EngineSettings {
            discounts_affect_commissions: false,
        };

        assert_eq!(commission_base(&line, &with_discounts).cents(), 8500);
        assert_eq!(commission_base(&line, &without).cents(), 10_000);
    }

    #[test]
    fn test_settings_lookup_defaults_safe() {
        assert!(EngineSettings::from_lookup(None).discounts_affect_commissions);
        assert!(!EngineSettings::from_lookup(Some(false)).discounts_affect_commissions);
    }

    #[test]
    fn test_paid_sale_is_eligible() {
        assert!(is_commission_eligible(&sale(PaymentStatus::Paid, 20_000, None)));
    }

    #[test]
    fn test_within_tolerance_is_eligible() {
        // 99 cents outstanding: inside the one-unit tolerance
        let s = sale(PaymentStatus::DepositPaid, 20_000, Some(19_901));
        assert!(is_commission_eligible(&s));
    }

    #[test]
    fn test_deposit_sale_is_not_eligible() {
        let s = sale(PaymentStatus::DepositPaid, 20_000, Some(10_000));
        assert!(!is_commission_eligible(&s));

        let pending = sale(PaymentStatus::Pending, 20_000, None);
        assert!(!is_commission_eligible(&pending));
    }

    #[test]
    fn test_ratio_partial() {
        let s = sale(PaymentStatus::DepositPaid, 20_000, Some(10_000));
        let ratio = PaymentRatio::for_sale(&s);
        assert!(!ratio.is_full());
        assert_eq!(ratio.apply(Money::from_cents(20_000)).cents(), 10_000);
    }

    #[test]
    fn test_ratio_full_when_no_partial_record() {
        let s = sale(PaymentStatus::Paid, 20_000, None);
        assert!(PaymentRatio::for_sale(&s).is_full());

        // A record at or above total is also full - never scale up.
        let over = sale(PaymentStatus::Paid, 20_000, Some(20_000));
        assert!(PaymentRatio::for_sale(&over).is_full());
    }

    #[test]
    fn test_ratio_never_scales_eligible_commission() {
        // An eligible sale within tolerance still recognises slightly
        // reduced revenue, while commissions are computed in full - the
        // two predicates are independent by design.
        let s = sale(PaymentStatus::DepositPaid, 20_000, Some(19_950));
        assert!(is_commission_eligible(&s));
        assert_eq!(
            PaymentRatio::for_sale(&s).apply(Money::from_cents(20_000)).cents(),
            19_950
        );
    }
}

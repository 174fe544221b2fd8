//! # Inventory Reversal Planning
//!
//! Pure planning half of the sale-cancellation unit of work. The plan is a
//! list of ordered, validated write steps; `atelier-db` executes it inside
//! a single transaction so that a partial failure leaves no state change.
//!
//! ## Split of Responsibilities
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  atelier-core (here)                 atelier-db                        │
//! │  ───────────────────                 ──────────                        │
//! │  read inputs, validate the           BEGIN                             │
//! │  payment-state machine,              apply stock deltas                │
//! │  compute from/to stock and           insert movement records           │
//! │  reservation rollback                update reservation                │
//! │       │                              delete sale + items               │
//! │       └── ReversalPlan ────────────► COMMIT (or roll back all)        │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::{ItemKind, PaymentStatus, Reservation, Sale};

// =============================================================================
// Plan Types
// =============================================================================

/// One product line's stock restoration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRestore {
    pub product_id: String,
    pub from_qty: i64,
    pub to_qty: i64,
    /// Units returned to stock (`to_qty − from_qty`).
    pub quantity: i64,
}

/// Restores a reservation's payment state after its settling sale is
/// cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRollback {
    pub reservation_id: String,
    /// `DepositPaid` when a deposit was recorded, `Pending` otherwise.
    pub new_status: PaymentStatus,
    /// Outstanding balance after rollback: `total − deposit`.
    pub pending_cents: i64,
}

/// The complete, validated cancellation unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalPlan {
    pub sale_id: String,
    /// One entry per product line, in sale-item order. Service lines have
    /// no stock to restore and do not appear.
    pub stock_restores: Vec<StockRestore>,
    pub reservation: Option<ReservationRollback>,
}

// =============================================================================
// Planner
// =============================================================================

/// Plans the reversal of one sale.
///
/// ## Validation
/// - Only `Paid` or `DepositPaid` sales can be cancelled. Cancelling a
///   `Pending` sale is rejected with [`CoreError::InvalidPaymentState`] -
///   there is nothing to reverse and the state machine allows no such
///   transition.
/// - Every product line must have a current stock level in `stock_levels`.
///   The write path is strict: an unknown product aborts the whole plan
///   rather than crediting stock that cannot be audited.
/// - When the sale references a reservation, the reservation record must
///   be supplied.
///
/// Quantities on the same product across lines accumulate in order, so a
/// sale with two lines of the same product plans `from 10 → 13 → 15`, not
/// two independent `10 → +n` steps.
pub fn plan_reversal(
    sale: &Sale,
    stock_levels: &HashMap<String, i64>,
    reservation: Option<&Reservation>,
) -> CoreResult<ReversalPlan> {
    match sale.payment_status {
        PaymentStatus::Paid | PaymentStatus::DepositPaid => {}
        PaymentStatus::Pending => {
            return Err(CoreError::InvalidPaymentState {
                sale_id: sale.id.clone(),
                current_status: "pending".to_string(),
            });
        }
    }

    let mut running: HashMap<&str, i64> = HashMap::new();
    let mut stock_restores = Vec::new();
    for item in &sale.items {
        if item.kind != ItemKind::Product {
            continue;
        }
        let base = match stock_levels.get(item.item_id.as_str()) {
            Some(level) => *level,
            None => return Err(CoreError::ProductNotFound(item.item_id.clone())),
        };
        let from_qty = *running.entry(item.item_id.as_str()).or_insert(base);
        let to_qty = from_qty + item.quantity;
        running.insert(item.item_id.as_str(), to_qty);

        stock_restores.push(StockRestore {
            product_id: item.item_id.clone(),
            from_qty,
            to_qty,
            quantity: item.quantity,
        });
    }

    let reservation_rollback = match &sale.reservation_id {
        None => None,
        Some(reservation_id) => {
            let reservation = reservation
                .filter(|r| &r.id == reservation_id)
                .ok_or_else(|| CoreError::ReservationNotFound(reservation_id.clone()))?;
            Some(rollback_for(reservation))
        }
    };

    Ok(ReversalPlan {
        sale_id: sale.id.clone(),
        stock_restores,
        reservation: reservation_rollback,
    })
}

/// The backward transition of the reservation state machine:
/// Paid → DepositPaid when a deposit was collected, Paid → Pending
/// otherwise, with the pending balance recomputed.
fn rollback_for(reservation: &Reservation) -> ReservationRollback {
    let deposit = reservation.deposit_cents.unwrap_or(0);
    let new_status = if deposit > 0 {
        PaymentStatus::DepositPaid
    } else {
        PaymentStatus::Pending
    };
    ReservationRollback {
        reservation_id: reservation.id.clone(),
        new_status,
        pending_cents: reservation.total_cents - deposit,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, SaleItem};
    use chrono::Utc;

    fn product_line(product_id: &str, qty: i64) -> SaleItem {
        SaleItem {
            item_id: product_id.to_string(),
            kind: ItemKind::Product,
            name_snapshot: product_id.to_string(),
            quantity: qty,
            unit_price_cents: 1_000,
            subtotal_cents: 1_000 * qty,
            discount_cents: 0,
            professional_id: None,
        }
    }

    fn service_line() -> SaleItem {
        SaleItem {
            item_id: "svc-1".to_string(),
            kind: ItemKind::Service,
            name_snapshot: "Cut".to_string(),
            quantity: 1,
            unit_price_cents: 3_000,
            subtotal_cents: 3_000,
            discount_cents: 0,
            professional_id: Some("pro-a".to_string()),
        }
    }

    fn sale(status: PaymentStatus, reservation_id: Option<&str>, items: Vec<SaleItem>) -> Sale {
        Sale {
            id: "sale-1".to_string(),
            location_id: "loc-1".to_string(),
            client_id: None,
            reservation_id: reservation_id.map(str::to_string),
            payment_method: PaymentMethod::Cash,
            payment_status: status,
            total_cents: items.iter().map(|i| i.subtotal_cents).sum(),
            amount_paid_cents: None,
            tip_cents: 0,
            discount_cents: 0,
            items,
            created_at: Utc::now(),
        }
    }

    fn stock(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries.iter().map(|(id, qty)| (id.to_string(), *qty)).collect()
    }

    #[test]
    fn test_restores_stock_with_before_after() {
        let sale = sale(PaymentStatus::Paid, None, vec![product_line("prd-x", 3), service_line()]);
        let plan = plan_reversal(&sale, &stock(&[("prd-x", 10)]), None).unwrap();

        assert_eq!(plan.stock_restores.len(), 1);
        assert_eq!(
            plan.stock_restores[0],
            StockRestore {
                product_id: "prd-x".to_string(),
                from_qty: 10,
                to_qty: 13,
                quantity: 3,
            }
        );
        assert!(plan.reservation.is_none());
    }

    #[test]
    fn test_repeated_product_accumulates() {
        let sale = sale(
            PaymentStatus::Paid,
            None,
            vec![product_line("prd-x", 3), product_line("prd-x", 2)],
        );
        let plan = plan_reversal(&sale, &stock(&[("prd-x", 10)]), None).unwrap();

        assert_eq!(plan.stock_restores[0].from_qty, 10);
        assert_eq!(plan.stock_restores[0].to_qty, 13);
        assert_eq!(plan.stock_restores[1].from_qty, 13);
        assert_eq!(plan.stock_restores[1].to_qty, 15);
    }

    #[test]
    fn test_pending_sale_is_rejected() {
        let sale = sale(PaymentStatus::Pending, None, vec![product_line("prd-x", 1)]);
        let err = plan_reversal(&sale, &stock(&[("prd-x", 10)]), None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentState { .. }));
    }

    #[test]
    fn test_unknown_product_aborts_plan() {
        let sale = sale(PaymentStatus::Paid, None, vec![product_line("prd-ghost", 1)]);
        let err = plan_reversal(&sale, &stock(&[]), None).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == "prd-ghost"));
    }

    #[test]
    fn test_reservation_rolls_back_to_deposit_paid() {
        let reservation = Reservation {
            id: "res-1".to_string(),
            client_id: "client-1".to_string(),
            status: PaymentStatus::Paid,
            total_cents: 30_000,
            deposit_cents: Some(10_000),
            pending_cents: 0,
        };
        let sale = sale(PaymentStatus::Paid, Some("res-1"), vec![service_line()]);
        let plan = plan_reversal(&sale, &stock(&[]), Some(&reservation)).unwrap();

        assert_eq!(
            plan.reservation,
            Some(ReservationRollback {
                reservation_id: "res-1".to_string(),
                new_status: PaymentStatus::DepositPaid,
                pending_cents: 20_000,
            })
        );
    }

    #[test]
    fn test_reservation_without_deposit_rolls_back_to_pending() {
        let reservation = Reservation {
            id: "res-1".to_string(),
            client_id: "client-1".to_string(),
            status: PaymentStatus::Paid,
            total_cents: 30_000,
            deposit_cents: None,
            pending_cents: 0,
        };
        let sale = sale(PaymentStatus::Paid, Some("res-1"), vec![service_line()]);
        let plan = plan_reversal(&sale, &stock(&[]), Some(&reservation)).unwrap();

        let rollback = plan.reservation.unwrap();
        assert_eq!(rollback.new_status, PaymentStatus::Pending);
        assert_eq!(rollback.pending_cents, 30_000);
    }

    #[test]
    fn test_missing_reservation_record_aborts() {
        let sale = sale(PaymentStatus::Paid, Some("res-1"), vec![service_line()]);
        let err = plan_reversal(&sale, &stock(&[]), None).unwrap_err();
        assert!(matches!(err, CoreError::ReservationNotFound(id) if id == "res-1"));
    }
}

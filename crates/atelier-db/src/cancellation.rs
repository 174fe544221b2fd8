//! # Cancellation Coordinator
//!
//! Executes a sale cancellation as ONE atomic unit of work: stock
//! restores, movement audit rows, reservation rollback and the sale
//! deletion either all happen or none do.
//!
//! ## The Unit of Work
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │    1. load sale + items                 ── not found? → fail clean     │
//! │    2. read stock of each product line                                  │
//! │    3. load linked reservation (if any)                                 │
//! │    4. atelier-core::plan_reversal       ── rejected? → ROLLBACK        │
//! │    5. apply stock deltas + audit rows                                  │
//! │    6. roll back reservation state                                      │
//! │    7. delete sale items, delete sale                                   │
//! │  COMMIT                                                                │
//! │                                                                        │
//! │  Idempotent: a second cancel finds no sale row and fails with          │
//! │  NotFound - stock is never credited twice.                             │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The read-modify-write on stock stays inside the transaction, so
//! concurrent sales/cancellations touching the same product cannot lose
//! updates.

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::catalog::insert_movement;
use crate::repository::reservation::fetch_reservation;
use crate::repository::sale::fetch_sale;
use atelier_core::reversal::{plan_reversal, ReversalPlan};
use atelier_core::{ItemKind, MovementCause, StockMovement};

/// Coordinates sale cancellations.
#[derive(Debug, Clone)]
pub struct CancellationCoordinator {
    pool: SqlitePool,
}

impl CancellationCoordinator {
    /// Creates a new CancellationCoordinator.
    pub fn new(pool: SqlitePool) -> Self {
        CancellationCoordinator { pool }
    }

    /// Cancels a sale, reversing its inventory effects and rolling back
    /// any linked reservation.
    ///
    /// Returns the executed plan so callers can display what was
    /// reversed.
    ///
    /// ## Errors
    /// - `NotFound` - unknown or already-cancelled sale
    /// - `Domain(InvalidPaymentState)` - the sale is still Pending
    /// - `Domain(ProductNotFound)` - a product line cannot be audited
    /// - `TransactionFailed` - commit failed; nothing was written
    pub async fn cancel_sale(&self, sale_id: &str, actor: &str) -> DbResult<ReversalPlan> {
        debug!(sale_id = %sale_id, actor = %actor, "Cancelling sale");

        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        // Current stock of every product line, read inside the transaction.
        let mut stock_levels: HashMap<String, i64> = HashMap::new();
        for item in sale.items.iter().filter(|i| i.kind == ItemKind::Product) {
            if stock_levels.contains_key(&item.item_id) {
                continue;
            }
            let level: Option<i64> =
                sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                    .bind(&item.item_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some(level) = level {
                stock_levels.insert(item.item_id.clone(), level);
            }
            // A missing product stays absent; planning rejects the sale.
        }

        let reservation = match &sale.reservation_id {
            Some(reservation_id) => fetch_reservation(&mut tx, reservation_id).await?,
            None => None,
        };

        let plan = plan_reversal(&sale, &stock_levels, reservation.as_ref())?;

        let now = Utc::now();
        for restore in &plan.stock_restores {
            // Delta update: concurrent writers cannot clobber each other,
            // and the audit row records the observed before/after values.
            sqlx::query("UPDATE products SET current_stock = current_stock + ?2 WHERE id = ?1")
                .bind(&restore.product_id)
                .bind(restore.quantity)
                .execute(&mut *tx)
                .await?;

            let movement = StockMovement {
                id: Uuid::new_v4().to_string(),
                product_id: restore.product_id.clone(),
                from_qty: restore.from_qty,
                to_qty: restore.to_qty,
                quantity: restore.quantity,
                cause: MovementCause::Cancellation,
                actor: actor.to_string(),
                created_at: now,
            };
            insert_movement(&mut tx, &movement).await?;
        }

        if let Some(rollback) = &plan.reservation {
            sqlx::query("UPDATE reservations SET status = ?2, pending_cents = ?3 WHERE id = ?1")
                .bind(&rollback.reservation_id)
                .bind(rollback.new_status)
                .bind(rollback.pending_cents)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            sale_id = %sale_id,
            restored_lines = plan.stock_restores.len(),
            reservation = ?plan.reservation.as_ref().map(|r| &r.reservation_id),
            "Sale cancelled"
        );

        Ok(plan)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

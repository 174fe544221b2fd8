//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                          Sale Lifecycle                                │
//! │                                                                        │
//! │  1. INSERT                                                             │
//! │     └── insert_sale() → sale + items in one transaction                │
//! │                                                                        │
//! │  2. PAYMENT CAPTURE (forward transitions only)                         │
//! │     └── record_payment() → Pending → DepositPaid → Paid                │
//! │                                                                        │
//! │  3. (OPTIONAL) CANCELLATION                                            │
//! │     └── CancellationCoordinator::cancel_sale() → rows deleted,         │
//! │         stock restored, reservation rolled back (separate module)      │
//! │                                                                        │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use atelier_core::validation::validate_sale;
use atelier_core::{CoreError, ItemKind, PaymentMethod, PaymentStatus, Sale, SaleItem};

// =============================================================================
// Row Mapping
// =============================================================================

/// Flat sale row; items are attached separately.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SaleRow {
    pub id: String,
    pub location_id: String,
    pub client_id: Option<String>,
    pub reservation_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_cents: i64,
    pub amount_paid_cents: Option<i64>,
    pub tip_cents: i64,
    pub discount_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SaleItemRow {
    pub sale_id: String,
    pub item_id: String,
    pub kind: ItemKind,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub professional_id: Option<String>,
}

impl SaleRow {
    pub(crate) fn into_sale(self, items: Vec<SaleItem>) -> Sale {
        Sale {
            id: self.id,
            location_id: self.location_id,
            client_id: self.client_id,
            reservation_id: self.reservation_id,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            total_cents: self.total_cents,
            amount_paid_cents: self.amount_paid_cents,
            tip_cents: self.tip_cents,
            discount_cents: self.discount_cents,
            items,
            created_at: self.created_at,
        }
    }
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            item_id: row.item_id,
            kind: row.kind,
            name_snapshot: row.name_snapshot,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            subtotal_cents: row.subtotal_cents,
            discount_cents: row.discount_cents,
            professional_id: row.professional_id,
        }
    }
}

const SALE_COLUMNS: &str = "id, location_id, client_id, reservation_id, payment_method, \
     payment_status, total_cents, amount_paid_cents, tip_cents, discount_cents, created_at";

const ITEM_COLUMNS: &str = "sale_id, item_id, kind, name_snapshot, quantity, \
     unit_price_cents, subtotal_cents, discount_cents, professional_id";

/// Loads one sale with its items inside an open connection/transaction.
/// Used by both this repository and the cancellation coordinator.
pub(crate) async fn fetch_sale(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Option<Sale>> {
    let row: Option<SaleRow> =
        sqlx::query_as(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
            .bind(sale_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(row) = row else { return Ok(None) };

    let item_rows: Vec<SaleItemRow> = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY position"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(
        row.into_sale(item_rows.into_iter().map(SaleItem::from).collect()),
    ))
}

/// Attaches item rows (pre-sorted by sale then position) to their sales,
/// preserving sale order.
fn assemble(rows: Vec<SaleRow>, item_rows: Vec<SaleItemRow>) -> Vec<Sale> {
    let mut items_by_sale: HashMap<String, Vec<SaleItem>> = HashMap::new();
    for row in item_rows {
        items_by_sale
            .entry(row.sale_id.clone())
            .or_default()
            .push(row.into());
    }

    rows.into_iter()
        .map(|row| {
            let items = items_by_sale.remove(&row.id).unwrap_or_default();
            row.into_sale(items)
        })
        .collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale with its items in one transaction.
    ///
    /// The sale is validated first; a malformed record is rejected before
    /// anything is written.
    pub async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        validate_sale(sale).map_err(CoreError::from)?;

        debug!(id = %sale.id, total = %sale.total_cents, "Inserting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO sales (
                id, location_id, client_id, reservation_id,
                payment_method, payment_status,
                total_cents, amount_paid_cents, tip_cents, discount_cents,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&sale.id)
        .bind(&sale.location_id)
        .bind(&sale.client_id)
        .bind(&sale.reservation_id)
        .bind(sale.payment_method)
        .bind(sale.payment_status)
        .bind(sale.total_cents)
        .bind(sale.amount_paid_cents)
        .bind(sale.tip_cents)
        .bind(sale.discount_cents)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in sale.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO sale_items (
                    id, sale_id, item_id, kind, name_snapshot,
                    quantity, unit_price_cents, subtotal_cents, discount_cents,
                    professional_id, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&sale.id)
            .bind(&item.item_id)
            .bind(item.kind)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.subtotal_cents)
            .bind(item.discount_cents)
            .bind(&item.professional_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Gets a sale (with items, in line order) by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// Lists sales in `[from, to)`, optionally restricted to a location,
    /// ordered by creation time then id. Items are attached in line order.
    ///
    /// This is the report loading path: the returned slice feeds the
    /// aggregation engines unchanged.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        location_id: Option<&str>,
    ) -> DbResult<Vec<Sale>> {
        debug!(from = %from, to = %to, location = ?location_id, "Loading sales for period");

        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM sales
             WHERE created_at >= ?1 AND created_at < ?2
               AND (?3 IS NULL OR location_id = ?3)
             ORDER BY created_at, id"
        ))
        .bind(from)
        .bind(to)
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        let item_rows: Vec<SaleItemRow> = sqlx::query_as(&format!(
            "SELECT si.sale_id, si.item_id, si.kind, si.name_snapshot, si.quantity,
                    si.unit_price_cents, si.subtotal_cents, si.discount_cents,
                    si.professional_id
             FROM sale_items si
             JOIN sales s ON s.id = si.sale_id
             WHERE s.created_at >= ?1 AND s.created_at < ?2
               AND (?3 IS NULL OR s.location_id = ?3)
             ORDER BY si.sale_id, si.position"
        ))
        .bind(from)
        .bind(to)
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(rows, item_rows))
    }

    /// Loads the full sale history (for advanced filters). Prefer
    /// [`crate::history::FullHistoryCache`] over calling this repeatedly.
    pub async fn list_all(&self) -> DbResult<Vec<Sale>> {
        let rows: Vec<SaleRow> =
            sqlx::query_as(&format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at, id"))
                .fetch_all(&self.pool)
                .await?;

        let item_rows: Vec<SaleItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items ORDER BY sale_id, position"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(rows, item_rows))
    }

    /// Records a payment capture: advances the payment state machine
    /// forward and stores the collected amount.
    ///
    /// Valid transitions: Pending → DepositPaid, Pending → Paid,
    /// DepositPaid → Paid. Anything else is rejected without writing.
    pub async fn record_payment(
        &self,
        sale_id: &str,
        new_status: PaymentStatus,
        amount_paid_cents: Option<i64>,
    ) -> DbResult<()> {
        let sale = self
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let valid = matches!(
            (sale.payment_status, new_status),
            (PaymentStatus::Pending, PaymentStatus::DepositPaid)
                | (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::DepositPaid, PaymentStatus::Paid)
        );
        if !valid {
            return Err(CoreError::InvalidPaymentState {
                sale_id: sale_id.to_string(),
                current_status: format!("{:?}", sale.payment_status),
            }
            .into());
        }

        debug!(sale_id = %sale_id, status = ?new_status, "Recording payment");

        sqlx::query(
            "UPDATE sales SET payment_status = ?2, amount_paid_cents = ?3 WHERE id = ?1",
        )
        .bind(sale_id)
        .bind(new_status)
        .bind(amount_paid_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sale(id: &str, location: &str, month: u32, items: Vec<SaleItem>) -> Sale {
        let total = items.iter().map(|i| i.subtotal_cents - i.discount_cents).sum();
        Sale {
            id: id.to_string(),
            location_id: location.to_string(),
            client_id: None,
            reservation_id: None,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Pending,
            total_cents: total,
            amount_paid_cents: None,
            tip_cents: 0,
            discount_cents: 0,
            items,
            created_at: Utc.with_ymd_and_hms(2026, month, 10, 12, 0, 0).unwrap(),
        }
    }

    fn item(item_id: &str, subtotal: i64) -> SaleItem {
        SaleItem {
            item_id: item_id.to_string(),
            kind: ItemKind::Service,
            name_snapshot: item_id.to_string(),
            quantity: 1,
            unit_price_cents: subtotal,
            subtotal_cents: subtotal,
            discount_cents: 0,
            professional_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_load_preserves_item_order() {
        let db = test_db().await;
        let repo = db.sales();

        repo.insert_sale(&sale(
            "sale-1",
            "loc-1",
            3,
            vec![item("svc-z", 1_000), item("svc-a", 2_000), item("svc-m", 3_000)],
        ))
        .await
        .unwrap();

        let loaded = repo.get_by_id("sale-1").await.unwrap().unwrap();
        let order: Vec<&str> = loaded.items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(order, ["svc-z", "svc-a", "svc-m"]);
    }

    #[tokio::test]
    async fn test_list_between_filters_period_and_location() {
        let db = test_db().await;
        let repo = db.sales();

        repo.insert_sale(&sale("sale-1", "loc-1", 2, vec![item("svc-a", 1_000)]))
            .await
            .unwrap();
        repo.insert_sale(&sale("sale-2", "loc-2", 2, vec![item("svc-a", 1_000)]))
            .await
            .unwrap();
        repo.insert_sale(&sale("sale-3", "loc-1", 8, vec![item("svc-a", 1_000)]))
            .await
            .unwrap();

        let from = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();

        let all = repo.list_between(from, to, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let loc1 = repo.list_between(from, to, Some("loc-1")).await.unwrap();
        assert_eq!(loc1.len(), 1);
        assert_eq!(loc1[0].id, "sale-1");
        assert_eq!(loc1[0].items.len(), 1);
    }

    #[tokio::test]
    async fn test_record_payment_walks_forward_only() {
        let db = test_db().await;
        let repo = db.sales();

        repo.insert_sale(&sale("sale-1", "loc-1", 3, vec![item("svc-a", 10_000)]))
            .await
            .unwrap();

        repo.record_payment("sale-1", PaymentStatus::DepositPaid, Some(4_000))
            .await
            .unwrap();
        repo.record_payment("sale-1", PaymentStatus::Paid, None).await.unwrap();

        // Backward transition outside cancellation is rejected.
        let err = repo
            .record_payment("sale-1", PaymentStatus::DepositPaid, Some(4_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }

    #[tokio::test]
    async fn test_insert_rejects_overpaid_sale() {
        let db = test_db().await;
        let mut bad = sale("sale-1", "loc-1", 3, vec![item("svc-a", 1_000)]);
        bad.amount_paid_cents = Some(2_000);

        let err = db.sales().insert_sale(&bad).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
        assert!(db.sales().get_by_id("sale-1").await.unwrap().is_none());
    }
}

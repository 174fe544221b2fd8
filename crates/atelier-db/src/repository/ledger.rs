//! # Ledger Repository
//!
//! Database operations for manual expense entries, monthly admin
//! commission adjustments, and the engine settings row.
//!
//! Expenses are the only cost records the system persists; professional
//! and admin commissions are always derived at query time.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbResult, DbError};
use crate::repository::decode_override_map;
use atelier_core::allocation::EngineSettings;
use atelier_core::validation::{validate_amount, validate_id, validate_month};
use atelier_core::{CoreError, Expense, MonthlyAdjustment};

/// Settings key for the discounts-affect-commissions toggle.
const DISCOUNTS_AFFECT_COMMISSIONS_KEY: &str = "discounts_affect_commissions";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    date: DateTime<Utc>,
    amount_cents: i64,
    concept: String,
    recipient: String,
    location_id: String,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            date: row.date,
            amount_cents: row.amount_cents,
            concept: row.concept,
            recipient: row.recipient,
            location_id: row.location_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdjustmentRow {
    year: i64,
    month: i64,
    service_overrides: String,
    product_overrides: String,
}

impl AdjustmentRow {
    fn into_adjustment(self) -> DbResult<MonthlyAdjustment> {
        Ok(MonthlyAdjustment {
            year: self.year as i32,
            month: self.month as u32,
            service_overrides: decode_override_map(&self.service_overrides)?,
            product_overrides: decode_override_map(&self.product_overrides)?,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for ledger database operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Inserts a manual expense entry.
    pub async fn insert_expense(&self, expense: &Expense) -> DbResult<()> {
        validate_id("expense_id", &expense.id).map_err(CoreError::from)?;
        validate_amount("amount", expense.amount_cents).map_err(CoreError::from)?;

        debug!(id = %expense.id, amount = %expense.amount_cents, "Inserting expense");

        sqlx::query(
            "INSERT INTO expenses (id, date, amount_cents, concept, recipient, location_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&expense.id)
        .bind(expense.date)
        .bind(expense.amount_cents)
        .bind(&expense.concept)
        .bind(&expense.recipient)
        .bind(&expense.location_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists expenses in `[from, to)`, optionally restricted to a
    /// location, ordered by date then id.
    pub async fn list_expenses_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        location_id: Option<&str>,
    ) -> DbResult<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            "SELECT id, date, amount_cents, concept, recipient, location_id
             FROM expenses
             WHERE date >= ?1 AND date < ?2
               AND (?3 IS NULL OR location_id = ?3)
             ORDER BY date, id",
        )
        .bind(from)
        .bind(to)
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Expense::from).collect())
    }

    /// Creates or replaces the adjustment row for one (year, month).
    pub async fn upsert_adjustment(&self, adjustment: &MonthlyAdjustment) -> DbResult<()> {
        validate_month(adjustment.month).map_err(CoreError::from)?;

        debug!(
            year = adjustment.year,
            month = adjustment.month,
            "Upserting monthly adjustment"
        );

        sqlx::query(
            "INSERT INTO monthly_adjustments (year, month, service_overrides, product_overrides)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(year, month) DO UPDATE SET
                service_overrides = excluded.service_overrides,
                product_overrides = excluded.product_overrides",
        )
        .bind(adjustment.year)
        .bind(adjustment.month)
        .bind(serde_json::to_string(&adjustment.service_overrides)?)
        .bind(serde_json::to_string(&adjustment.product_overrides)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists all adjustments for a year.
    pub async fn list_adjustments(&self, year: i32) -> DbResult<Vec<MonthlyAdjustment>> {
        let rows: Vec<AdjustmentRow> = sqlx::query_as(
            "SELECT year, month, service_overrides, product_overrides
             FROM monthly_adjustments WHERE year = ?1 ORDER BY month",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AdjustmentRow::into_adjustment).collect()
    }

    /// Loads the engine settings.
    ///
    /// A missing or unparsable settings row is NOT an error: computation
    /// falls back to the safe default (discounts affect commissions) with
    /// a warning, per [`EngineSettings::from_lookup`].
    pub async fn engine_settings(&self) -> DbResult<EngineSettings> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
                .bind(DISCOUNTS_AFFECT_COMMISSIONS_KEY)
                .fetch_optional(&self.pool)
                .await?;

        let flag = match value.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                warn!(value = %other, "unparsable discounts_affect_commissions setting");
                None
            }
            None => None,
        };

        Ok(EngineSettings::from_lookup(flag))
    }

    /// Stores the discounts-affect-commissions toggle.
    pub async fn set_discounts_affect_commissions(&self, value: bool) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(DISCOUNTS_AFFECT_COMMISSIONS_KEY)
        .bind(if value { "true" } else { "false" })
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Total manual expenses in `[from, to)`, in cents.
    pub async fn expense_total_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount_cents) FROM expenses WHERE date >= ?1 AND date < ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(total.unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

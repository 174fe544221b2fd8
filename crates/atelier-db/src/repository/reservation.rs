//! # Reservation Repository

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use atelier_core::{PaymentStatus, Reservation};

#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: String,
    client_id: String,
    status: PaymentStatus,
    total_cents: i64,
    deposit_cents: Option<i64>,
    pending_cents: i64,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: row.id,
            client_id: row.client_id,
            status: row.status,
            total_cents: row.total_cents,
            deposit_cents: row.deposit_cents,
            pending_cents: row.pending_cents,
        }
    }
}

/// Loads one reservation inside an open connection/transaction.
/// Shared with the cancellation coordinator.
pub(crate) async fn fetch_reservation(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Reservation>> {
    let row: Option<ReservationRow> = sqlx::query_as(
        "SELECT id, client_id, status, total_cents, deposit_cents, pending_cents
         FROM reservations WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Reservation::from))
}

/// Repository for reservation database operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Gets a reservation by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reservation>> {
        let mut conn = self.pool.acquire().await?;
        fetch_reservation(&mut conn, id).await
    }

    /// Inserts a reservation.
    pub async fn insert(&self, reservation: &Reservation) -> DbResult<()> {
        debug!(id = %reservation.id, "Inserting reservation");

        sqlx::query(
            "INSERT INTO reservations (
                id, client_id, status, total_cents, deposit_cents, pending_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&reservation.id)
        .bind(&reservation.client_id)
        .bind(reservation.status)
        .bind(reservation.total_cents)
        .bind(reservation.deposit_cents)
        .bind(reservation.pending_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a reservation's payment state and pending balance.
    pub async fn set_payment_state(
        &self,
        id: &str,
        status: PaymentStatus,
        pending_cents: i64,
    ) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE reservations SET status = ?2, pending_cents = ?3 WHERE id = ?1")
                .bind(id)
                .bind(status)
                .bind(pending_cents)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Reservation", id));
        }

        Ok(())
    }
}

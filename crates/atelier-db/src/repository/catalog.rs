//! # Catalog Repository
//!
//! Database operations for services, products, stock levels and the
//! stock-movement audit trail.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: Absolute update (lost updates under concurrency)            │
//! │     UPDATE products SET current_stock = 13 WHERE id = ?                │
//! │                                                                        │
//! │  ✅ CORRECT: Delta update inside a transaction                         │
//! │     UPDATE products SET current_stock = current_stock + 3              │
//! │     + INSERT INTO stock_movements (from, to, cause, actor, ...)        │
//! │                                                                        │
//! │  Two concurrent writers each apply their own delta; the audit row      │
//! │  records the before/after values each writer actually observed.        │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::decode_commission;
use atelier_core::{MovementCause, Product, Service, StockMovement};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: String,
    name: String,
    price_cents: i64,
    default_commission: Option<String>,
    is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price_cents: i64,
    purchase_cost_cents: i64,
    default_commission: Option<String>,
    current_stock: i64,
    is_active: bool,
}

impl ServiceRow {
    fn into_service(self) -> DbResult<Service> {
        Ok(Service {
            id: self.id,
            name: self.name,
            price_cents: self.price_cents,
            default_commission: decode_commission(self.default_commission.as_deref())?,
            is_active: self.is_active,
        })
    }
}

impl ProductRow {
    fn into_product(self) -> DbResult<Product> {
        Ok(Product {
            id: self.id,
            name: self.name,
            price_cents: self.price_cents,
            purchase_cost_cents: self.purchase_cost_cents,
            default_commission: decode_commission(self.default_commission.as_deref())?,
            current_stock: self.current_stock,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    product_id: String,
    from_qty: i64,
    to_qty: i64,
    quantity: i64,
    cause: MovementCause,
    actor: String,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for StockMovement {
    fn from(row: MovementRow) -> Self {
        StockMovement {
            id: row.id,
            product_id: row.product_id,
            from_qty: row.from_qty,
            to_qty: row.to_qty,
            quantity: row.quantity,
            cause: row.cause,
            actor: row.actor,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Lists active services, sorted by name.
    pub async fn list_services(&self) -> DbResult<Vec<Service>> {
        let rows: Vec<ServiceRow> = sqlx::query_as(
            "SELECT id, name, price_cents, default_commission, is_active
             FROM services WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ServiceRow::into_service).collect()
    }

    /// Lists active products, sorted by name.
    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, name, price_cents, purchase_cost_cents, default_commission,
                    current_stock, is_active
             FROM products WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    /// Gets a product by its ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, price_cents, purchase_cost_cents, default_commission,
                    current_stock, is_active
             FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductRow::into_product).transpose()
    }

    /// Inserts a new service.
    pub async fn insert_service(&self, service: &Service) -> DbResult<()> {
        debug!(id = %service.id, name = %service.name, "Inserting service");

        sqlx::query(
            "INSERT INTO services (id, name, price_cents, default_commission, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(service.price_cents)
        .bind(encode_commission(service.default_commission.as_ref())?)
        .bind(service.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a new product.
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            "INSERT INTO products (
                id, name, price_cents, purchase_cost_cents, default_commission,
                current_stock, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.purchase_cost_cents)
        .bind(encode_commission(product.default_commission.as_ref())?)
        .bind(product.current_stock)
        .bind(product.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adjusts a product's stock by a delta and writes the audit movement,
    /// both inside one transaction.
    ///
    /// Used for restocks and manual corrections. Sale cancellations go
    /// through [`crate::cancellation::CancellationCoordinator`], which
    /// folds the same two writes into the larger reversal transaction.
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        delta: i64,
        cause: MovementCause,
        actor: &str,
    ) -> DbResult<StockMovement> {
        debug!(product_id = %product_id, delta = %delta, cause = ?cause, "Adjusting stock");

        let mut tx = self.pool.begin().await?;

        let from_qty: Option<i64> =
            sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let from_qty = from_qty.ok_or_else(|| DbError::not_found("Product", product_id))?;

        sqlx::query("UPDATE products SET current_stock = current_stock + ?2 WHERE id = ?1")
            .bind(product_id)
            .bind(delta)
            .execute(&mut *tx)
            .await?;

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            from_qty,
            to_qty: from_qty + delta,
            quantity: delta,
            cause,
            actor: actor.to_string(),
            created_at: Utc::now(),
        };
        insert_movement(&mut tx, &movement).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(movement)
    }

    /// Lists a product's stock movements, newest first.
    pub async fn list_movements(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let rows: Vec<MovementRow> = sqlx::query_as(
            "SELECT id, product_id, from_qty, to_qty, quantity, cause, actor, created_at
             FROM stock_movements WHERE product_id = ?1 ORDER BY created_at DESC, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockMovement::from).collect())
    }
}

/// Serializes an optional commission config for a JSON text column.
pub(crate) fn encode_commission(
    config: Option<&atelier_core::CommissionConfig>,
) -> DbResult<Option<String>> {
    config
        .map(|c| serde_json::to_string(c).map_err(DbError::from))
        .transpose()
}

/// Inserts one stock movement row on an open transaction.
pub(crate) async fn insert_movement(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO stock_movements (
            id, product_id, from_qty, to_qty, quantity, cause, actor, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.from_qty)
    .bind(movement.to_qty)
    .bind(movement.quantity)
    .bind(movement.cause)
    .bind(&movement.actor)
    .bind(movement.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

//! # Staff Repository
//!
//! Database operations for professionals and admin users.
//!
//! Commission configuration is stored as JSON text columns: one optional
//! config per row plus two override maps keyed by catalog item id. The
//! tagged serde representation (`{"type":"percentage","value":1250}`)
//! keeps the columns readable and unambiguous.

use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{decode_commission, decode_override_map};
use atelier_core::validation::{validate_commission, validate_id, validate_name};
use atelier_core::{AdminRole, AdminUser, CommissionConfig, CoreError, Professional};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProfessionalRow {
    id: String,
    name: String,
    is_active: bool,
    default_commission: Option<String>,
    service_overrides: String,
    product_overrides: String,
}

impl ProfessionalRow {
    fn into_professional(self) -> DbResult<Professional> {
        Ok(Professional {
            id: self.id,
            name: self.name,
            is_active: self.is_active,
            default_commission: decode_commission(self.default_commission.as_deref())?,
            service_overrides: decode_override_map(&self.service_overrides)?,
            product_overrides: decode_override_map(&self.product_overrides)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id: String,
    name: String,
    role: String,
    commission: Option<String>,
}

impl AdminRow {
    fn into_admin(self) -> DbResult<AdminUser> {
        let role = match self.role.as_str() {
            "owner" => AdminRole::Owner,
            "manager" => AdminRole::Manager,
            other => {
                return Err(DbError::InvalidPayload(format!(
                    "unknown admin role '{other}'"
                )))
            }
        };
        Ok(AdminUser {
            id: self.id,
            name: self.name,
            role,
            commission: decode_commission(self.commission.as_deref())?,
        })
    }
}

fn role_text(role: AdminRole) -> &'static str {
    match role {
        AdminRole::Owner => "owner",
        AdminRole::Manager => "manager",
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for staff database operations.
#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    /// Creates a new StaffRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    /// Lists active professionals, sorted by name.
    pub async fn list_professionals(&self) -> DbResult<Vec<Professional>> {
        let rows: Vec<ProfessionalRow> = sqlx::query_as(
            "SELECT id, name, is_active, default_commission,
                    service_overrides, product_overrides
             FROM professionals WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(ProfessionalRow::into_professional)
            .collect()
    }

    /// Inserts a professional with validated commission configuration.
    pub async fn insert_professional(&self, professional: &Professional) -> DbResult<()> {
        validate_id("professional_id", &professional.id).map_err(CoreError::from)?;
        validate_name(&professional.name).map_err(CoreError::from)?;
        if let Some(config) = &professional.default_commission {
            validate_commission(config).map_err(CoreError::from)?;
        }
        for config in professional
            .service_overrides
            .values()
            .chain(professional.product_overrides.values())
        {
            validate_commission(config).map_err(CoreError::from)?;
        }

        debug!(id = %professional.id, name = %professional.name, "Inserting professional");

        sqlx::query(
            "INSERT INTO professionals (
                id, name, is_active, default_commission,
                service_overrides, product_overrides
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&professional.id)
        .bind(&professional.name)
        .bind(professional.is_active)
        .bind(
            professional
                .default_commission
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(serde_json::to_string(&professional.service_overrides)?)
        .bind(serde_json::to_string(&professional.product_overrides)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces a professional's override maps and default rate.
    pub async fn update_commissions(
        &self,
        professional_id: &str,
        default_commission: Option<CommissionConfig>,
        service_overrides: &HashMap<String, CommissionConfig>,
        product_overrides: &HashMap<String, CommissionConfig>,
    ) -> DbResult<()> {
        if let Some(config) = &default_commission {
            validate_commission(config).map_err(CoreError::from)?;
        }
        for config in service_overrides.values().chain(product_overrides.values()) {
            validate_commission(config).map_err(CoreError::from)?;
        }

        let result = sqlx::query(
            "UPDATE professionals SET
                default_commission = ?2,
                service_overrides = ?3,
                product_overrides = ?4
             WHERE id = ?1",
        )
        .bind(professional_id)
        .bind(
            default_commission
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(serde_json::to_string(service_overrides)?)
        .bind(serde_json::to_string(product_overrides)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Professional", professional_id));
        }

        Ok(())
    }

    /// Lists admin users, sorted by id for stable commission iteration.
    pub async fn list_admins(&self) -> DbResult<Vec<AdminUser>> {
        let rows: Vec<AdminRow> =
            sqlx::query_as("SELECT id, name, role, commission FROM admin_users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(AdminRow::into_admin).collect()
    }

    /// Inserts an admin user.
    pub async fn insert_admin(&self, admin: &AdminUser) -> DbResult<()> {
        validate_id("admin_id", &admin.id).map_err(CoreError::from)?;
        validate_name(&admin.name).map_err(CoreError::from)?;
        if let Some(config) = &admin.commission {
            validate_commission(config).map_err(CoreError::from)?;
        }

        debug!(id = %admin.id, name = %admin.name, "Inserting admin user");

        sqlx::query(
            "INSERT INTO admin_users (id, name, role, commission) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&admin.id)
        .bind(&admin.name)
        .bind(role_text(admin.role))
        .bind(admin.commission.as_ref().map(serde_json::to_string).transpose()?)
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

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_professional_roundtrip_with_override_maps() {
        let db = test_db().await;
        let repo = db.staff();

        repo.insert_professional(&Professional {
            id: "pro-1".to_string(),
            name: "Ana".to_string(),
            is_active: true,
            default_commission: Some(CommissionConfig::Percentage(1_000)),
            service_overrides: [("svc-1".to_string(), CommissionConfig::Percentage(2_000))]
                .into_iter()
                .collect(),
            product_overrides: [("prd-1".to_string(), CommissionConfig::Fixed(300))]
                .into_iter()
                .collect(),
        })
        .await
        .unwrap();

        let listed = repo.list_professionals().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed[0].service_overrides.get("svc-1"),
            Some(&CommissionConfig::Percentage(2_000))
        );
        assert_eq!(
            listed[0].product_overrides.get("prd-1"),
            Some(&CommissionConfig::Fixed(300))
        );
        assert_eq!(
            listed[0].default_commission,
            Some(CommissionConfig::Percentage(1_000))
        );
    }

    #[tokio::test]
    async fn test_insert_rejects_over_100_percent() {
        let db = test_db().await;
        let err = db
            .staff()
            .insert_professional(&Professional {
                id: "pro-1".to_string(),
                name: "Ana".to_string(),
                is_active: true,
                default_commission: Some(CommissionConfig::Percentage(10_001)),
                service_overrides: Default::default(),
                product_overrides: Default::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }

    #[tokio::test]
    async fn test_admins_listed_by_id() {
        let db = test_db().await;
        let repo = db.staff();

        repo.insert_admin(&AdminUser {
            id: "adm-b".to_string(),
            name: "B".to_string(),
            role: AdminRole::Manager,
            commission: None,
        })
        .await
        .unwrap();
        repo.insert_admin(&AdminUser {
            id: "adm-a".to_string(),
            name: "A".to_string(),
            role: AdminRole::Owner,
            commission: Some(CommissionConfig::Percentage(1_500)),
        })
        .await
        .unwrap();

        let admins = repo.list_admins().await.unwrap();
        assert_eq!(admins.len(), 2);
        assert_eq!(admins[0].id, "adm-a");
        assert_eq!(admins[0].role, AdminRole::Owner);
        assert_eq!(admins[1].id, "adm-b");
    }
}

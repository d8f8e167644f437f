use crate::models::catalog::{AllowedPlan, Plan};
use anyhow::{Context, Result};
use sqlx::PgPool;

/// Read-only catalog access for the pricing flow. Plans and override rows
/// are admin-managed elsewhere.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_plan(&self, id: i64) -> Result<Option<Plan>> {
        sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch plan")
    }

    pub async fn get_resellable_plans(&self) -> Result<Vec<Plan>> {
        sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE is_active = TRUE AND reseller_visible = TRUE ORDER BY price ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch resellable plans")
    }

    /// The single override row for a (reseller, plan) pair, if any. The
    /// schema's UNIQUE (reseller_id, plan_id) guarantees at most one.
    pub async fn get_override(&self, reseller_id: i64, plan_id: i64) -> Result<Option<AllowedPlan>> {
        sqlx::query_as::<_, AllowedPlan>(
            "SELECT * FROM allowed_plans WHERE reseller_id = $1 AND plan_id = $2",
        )
        .bind(reseller_id)
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch allowed-plan override")
    }

    pub async fn get_overrides_for_reseller(&self, reseller_id: i64) -> Result<Vec<AllowedPlan>> {
        sqlx::query_as::<_, AllowedPlan>("SELECT * FROM allowed_plans WHERE reseller_id = $1")
            .bind(reseller_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch reseller overrides")
    }
}

use crate::models::config::{ConfigStatus, ResellerConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: PgPool,
}

impl ConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ResellerConfig>> {
        sqlx::query_as::<_, ResellerConfig>("SELECT * FROM reseller_configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch config by ID")
    }

    pub async fn get_by_reseller(&self, reseller_id: i64) -> Result<Vec<ResellerConfig>> {
        sqlx::query_as::<_, ResellerConfig>(
            "SELECT * FROM reseller_configs WHERE reseller_id = $1 AND status <> 'deleted' ORDER BY id",
        )
        .bind(reseller_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch reseller configs")
    }

    pub async fn get_active_by_reseller(&self, reseller_id: i64) -> Result<Vec<ResellerConfig>> {
        sqlx::query_as::<_, ResellerConfig>(
            "SELECT * FROM reseller_configs WHERE reseller_id = $1 AND status = 'active' ORDER BY id",
        )
        .bind(reseller_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active configs")
    }

    pub async fn count_active(&self, reseller_id: i64) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM reseller_configs WHERE reseller_id = $1 AND status = 'active'",
        )
        .bind(reseller_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count active configs")
    }

    pub async fn create(
        &self,
        reseller_id: i64,
        external_username: &str,
        panel_id: Option<i64>,
        traffic_limit_bytes: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO reseller_configs \
             (reseller_id, external_username, panel_id, traffic_limit_bytes, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(reseller_id)
        .bind(external_username)
        .bind(panel_id)
        .bind(traffic_limit_bytes)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create reseller config")
    }

    pub async fn set_status(&self, id: i64, status: ConfigStatus) -> Result<()> {
        let query = match status {
            ConfigStatus::Active => {
                "UPDATE reseller_configs SET status = $1, disabled_at = NULL WHERE id = $2"
            }
            ConfigStatus::Disabled => {
                "UPDATE reseller_configs SET status = $1, disabled_at = now() WHERE id = $2"
            }
            ConfigStatus::Deleted => {
                "UPDATE reseller_configs SET status = $1, deleted_at = now() WHERE id = $2"
            }
        };
        sqlx::query(query)
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update config status")?;
        Ok(())
    }
}

use crate::models::reseller::{Reseller, ResellerKind, ResellerStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct ResellerRepository {
    pool: PgPool,
}

impl ResellerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Reseller>> {
        sqlx::query_as::<_, Reseller>("SELECT * FROM resellers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch reseller by ID")
    }

    pub async fn get_by_owner(&self, owner_user_id: i64) -> Result<Option<Reseller>> {
        sqlx::query_as::<_, Reseller>("SELECT * FROM resellers WHERE owner_user_id = $1")
            .bind(owner_user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch reseller by owner")
    }

    pub async fn get_active_by_kind(&self, kind: ResellerKind) -> Result<Vec<Reseller>> {
        sqlx::query_as::<_, Reseller>(
            "SELECT * FROM resellers WHERE kind = $1 AND status = 'active' ORDER BY id",
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active resellers")
    }

    pub async fn set_status(&self, id: i64, status: ResellerStatus) -> Result<()> {
        sqlx::query("UPDATE resellers SET status = $1, updated_at = now() WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update reseller status")?;
        Ok(())
    }

    /// Opens a fresh billing window and zeroes the usage counter. Used by
    /// admin renewal of traffic-kind resellers; also clears suspension.
    pub async fn open_window(
        &self,
        id: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        traffic_total_bytes: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE resellers SET window_starts_at = $1, window_ends_at = $2, \
             traffic_total_bytes = $3, traffic_used_bytes = 0, status = 'active', \
             updated_at = now() WHERE id = $4",
        )
        .bind(starts_at)
        .bind(ends_at)
        .bind(traffic_total_bytes)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to open billing window")?;
        Ok(())
    }

    pub async fn create(
        &self,
        owner_user_id: i64,
        kind: ResellerKind,
        username_prefix: &str,
    ) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO resellers (owner_user_id, kind, username_prefix) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(owner_user_id)
        .bind(kind)
        .bind(username_prefix)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create reseller")
    }
}

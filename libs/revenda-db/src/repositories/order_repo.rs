use crate::models::order::ResellerOrder;
use anyhow::{Context, Result};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ResellerOrder>> {
        sqlx::query_as::<_, ResellerOrder>("SELECT * FROM reseller_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch order by ID")
    }

    pub async fn get_by_reseller(&self, reseller_id: i64) -> Result<Vec<ResellerOrder>> {
        sqlx::query_as::<_, ResellerOrder>(
            "SELECT * FROM reseller_orders WHERE reseller_id = $1 ORDER BY created_at DESC",
        )
        .bind(reseller_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch reseller orders")
    }

    pub async fn record_fulfillment(
        &self,
        order_id: i64,
        fulfillment: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE reseller_orders SET fulfillment = $1, status = 'fulfilled' WHERE id = $2",
        )
        .bind(fulfillment)
        .bind(order_id)
        .execute(&self.pool)
        .await
        .context("Failed to record order fulfillment")?;
        Ok(())
    }

    /// Stores provisioning progress without changing the order status, so
    /// an interrupted fulfillment can resume from the recorded accounts.
    pub async fn save_partial_fulfillment(
        &self,
        order_id: i64,
        fulfillment: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query("UPDATE reseller_orders SET fulfillment = $1 WHERE id = $2")
            .bind(fulfillment)
            .bind(order_id)
            .execute(&self.pool)
            .await
            .context("Failed to save partial fulfillment")?;
        Ok(())
    }
}

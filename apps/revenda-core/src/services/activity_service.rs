use anyhow::Result;
use sqlx::PgPool;

/// Append-only audit feed. The notification collaborator tails this table;
/// the core itself never messages anyone.
pub struct ActivityService;

impl ActivityService {
    pub async fn log(pool: &PgPool, reseller_id: Option<i64>, event: &str, details: &str) -> Result<()> {
        sqlx::query("INSERT INTO activity_log (reseller_id, event, details) VALUES ($1, $2, $3)")
            .bind(reseller_id)
            .bind(event)
            .bind(details)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn log_tx<'a, E>(executor: E, reseller_id: Option<i64>, event: &str, details: &str) -> Result<()>
    where
        E: sqlx::Executor<'a, Database = sqlx::Postgres>,
    {
        sqlx::query("INSERT INTO activity_log (reseller_id, event, details) VALUES ($1, $2, $3)")
            .bind(reseller_id)
            .bind(event)
            .bind(details)
            .execute(executor)
            .await?;
        Ok(())
    }
}

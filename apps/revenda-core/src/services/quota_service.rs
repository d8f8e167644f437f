use crate::quota::{DeniedReason, SuspendCause, apply_usage, evaluate_admission, wallet_resumes};
use crate::services::activity_service::ActivityService;
use crate::settings::SettingsService;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use revenda_db::models::reseller::{Reseller, ResellerStatus};
use revenda_db::repositories::config_repo::ConfigRepository;
use revenda_db::repositories::reseller_repo::ResellerRepository;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one usage increment.
#[derive(Debug, Clone, Copy)]
pub struct UsageOutcome {
    pub traffic_used_bytes: i64,
    /// Set when this increment tipped the reseller into suspension.
    pub suspended: Option<SuspendCause>,
    /// Configs disabled by the suspension cascade.
    pub disabled_configs: u64,
}

/// Transactional side of the ledger. All multi-row mutations run inside a
/// single transaction; concurrent usage syncs serialize on the reseller row
/// lock, so two overlapping deltas both land (no lost updates).
#[derive(Debug, Clone)]
pub struct QuotaService {
    pool: PgPool,
    settings: Arc<SettingsService>,
    reseller_repo: ResellerRepository,
    config_repo: ConfigRepository,
}

impl QuotaService {
    pub fn new(pool: PgPool, settings: Arc<SettingsService>) -> Self {
        let reseller_repo = ResellerRepository::new(pool.clone());
        let config_repo = ConfigRepository::new(pool.clone());
        Self {
            pool,
            settings,
            reseller_repo,
            config_repo,
        }
    }

    /// Admission check. Callers invoke this immediately before creating or
    /// re-enabling a config; the remaining check-then-act window is a
    /// tolerated soft limit, not a transactional guarantee.
    pub async fn can_provision(&self, reseller_id: i64) -> Result<Result<(), DeniedReason>> {
        let reseller = self
            .reseller_repo
            .get_by_id(reseller_id)
            .await?
            .with_context(|| format!("Reseller {} not found", reseller_id))?;
        let active_configs = self.config_repo.count_active(reseller_id).await?;
        let settings = self.settings.quota_settings().await;
        Ok(evaluate_admission(
            &reseller,
            active_configs,
            &settings,
            Utc::now(),
        ))
    }

    /// Adds `delta_bytes` to the reseller total and the owning config, then
    /// re-evaluates the active→suspended transition. Both counter updates
    /// are atomic increments inside one transaction: they land together or
    /// not at all. Deduplication across sync cycles is the caller's job.
    pub async fn record_usage(
        &self,
        reseller_id: i64,
        config_id: i64,
        delta_bytes: i64,
    ) -> Result<UsageOutcome> {
        let settings = self.settings.quota_settings().await;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // Row lock serializes overlapping sync runs for this reseller.
        let reseller = sqlx::query_as::<_, Reseller>(
            "SELECT * FROM resellers WHERE id = $1 FOR UPDATE",
        )
        .bind(reseller_id)
        .fetch_optional(&mut *tx)
        .await?
        .with_context(|| format!("Reseller {} not found", reseller_id))?;

        let new_used: i64 = sqlx::query_scalar(
            "UPDATE resellers SET traffic_used_bytes = traffic_used_bytes + $1, \
             updated_at = now() WHERE id = $2 RETURNING traffic_used_bytes",
        )
        .bind(delta_bytes)
        .bind(reseller_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to increment reseller usage")?;

        let updated = sqlx::query(
            "UPDATE reseller_configs SET usage_bytes = usage_bytes + $1 \
             WHERE id = $2 AND reseller_id = $3",
        )
        .bind(delta_bytes)
        .bind(config_id)
        .bind(reseller_id)
        .execute(&mut *tx)
        .await
        .context("Failed to increment config usage")?;
        if updated.rows_affected() != 1 {
            // Rolls back the reseller-side increment too.
            anyhow::bail!("Config {} not found under reseller {}", config_id, reseller_id);
        }

        // The row lock guarantees the locked snapshot plus this delta is
        // exactly what the increment returned, so the pure transition and
        // the stored counter agree.
        let transition = apply_usage(&reseller, delta_bytes, &settings, now);
        debug_assert_eq!(transition.traffic_used_bytes, new_used);

        let mut outcome = UsageOutcome {
            traffic_used_bytes: new_used,
            suspended: None,
            disabled_configs: 0,
        };

        if let Some(cause) = transition.suspend {
            outcome.suspended = Some(cause);
            outcome.disabled_configs = Self::suspend_in_tx(&mut tx, reseller_id, cause).await?;
        }

        tx.commit().await?;

        if let Some(cause) = outcome.suspended {
            warn!(
                "Reseller {} suspended ({:?}), {} configs disabled",
                reseller_id, cause, outcome.disabled_configs
            );
        }

        Ok(outcome)
    }

    /// Marks the reseller suspended and disables every active config it
    /// owns, stamping `disabled_at`. Runs inside the caller's transaction
    /// so the transition and its cascade are one atomic step.
    pub(crate) async fn suspend_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        reseller_id: i64,
        cause: SuspendCause,
    ) -> Result<u64> {
        sqlx::query("UPDATE resellers SET status = 'suspended', updated_at = now() WHERE id = $1")
            .bind(reseller_id)
            .execute(&mut **tx)
            .await
            .context("Failed to suspend reseller")?;

        let disabled = sqlx::query(
            "UPDATE reseller_configs SET status = 'disabled', disabled_at = now() \
             WHERE reseller_id = $1 AND status = 'active'",
        )
        .bind(reseller_id)
        .execute(&mut **tx)
        .await
        .context("Failed to disable reseller configs")?
        .rows_affected();

        ActivityService::log_tx(
            &mut **tx,
            Some(reseller_id),
            "reseller_suspended",
            &format!("cause={:?} disabled_configs={}", cause, disabled),
        )
        .await?;

        Ok(disabled)
    }

    /// Credits the wallet and resumes a suspended wallet-billed reseller
    /// when the new balance rises strictly above the threshold. Returns the
    /// new balance.
    pub async fn top_up(&self, reseller_id: i64, amount: i64) -> Result<i64> {
        let settings = self.settings.quota_settings().await;

        let mut tx = self.pool.begin().await?;
        let reseller = sqlx::query_as::<_, Reseller>(
            "SELECT * FROM resellers WHERE id = $1 FOR UPDATE",
        )
        .bind(reseller_id)
        .fetch_optional(&mut *tx)
        .await?
        .with_context(|| format!("Reseller {} not found", reseller_id))?;

        let new_balance: i64 = sqlx::query_scalar(
            "UPDATE resellers SET wallet_balance = wallet_balance + $1, \
             updated_at = now() WHERE id = $2 RETURNING wallet_balance",
        )
        .bind(amount)
        .bind(reseller_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to credit wallet")?;

        let resumed = reseller.status == ResellerStatus::Suspended
            && wallet_resumes(&reseller, new_balance, &settings);
        if resumed {
            sqlx::query("UPDATE resellers SET status = 'active', updated_at = now() WHERE id = $1")
                .bind(reseller_id)
                .execute(&mut *tx)
                .await?;
            ActivityService::log_tx(
                &mut *tx,
                Some(reseller_id),
                "reseller_resumed",
                &format!("balance={}", new_balance),
            )
            .await?;
        }
        tx.commit().await?;

        if resumed {
            info!("Reseller {} resumed after top-up, balance {}", reseller_id, new_balance);
        }
        Ok(new_balance)
    }

    /// Manual admin reactivation. Configs stay disabled; re-enabling goes
    /// through the admission check.
    pub async fn reactivate(&self, reseller_id: i64) -> Result<()> {
        self.reseller_repo
            .set_status(reseller_id, ResellerStatus::Active)
            .await?;
        ActivityService::log(&self.pool, Some(reseller_id), "reseller_resumed", "manual").await?;
        info!("Reseller {} reactivated by admin", reseller_id);
        Ok(())
    }

    /// Admin renewal for traffic-kind resellers: new window, fresh quota,
    /// usage counter reset to zero, suspension cleared.
    pub async fn open_window(
        &self,
        reseller_id: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        traffic_total_bytes: i64,
    ) -> Result<()> {
        self.reseller_repo
            .open_window(reseller_id, starts_at, ends_at, traffic_total_bytes)
            .await?;
        ActivityService::log(
            &self.pool,
            Some(reseller_id),
            "window_opened",
            &format!("ends_at={} total_bytes={}", ends_at, traffic_total_bytes),
        )
        .await?;
        Ok(())
    }
}

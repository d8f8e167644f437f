use crate::quota::SuspendCause;
use crate::services::activity_service::ActivityService;
use crate::services::quota_service::QuotaService;
use crate::settings::SettingsService;
use anyhow::{Context, Result};
use revenda_db::models::reseller::{Reseller, ResellerKind, ResellerStatus};
use revenda_db::repositories::reseller_repo::ResellerRepository;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{error, info};

/// Hourly usage billing for wallet-billed (plan-kind) resellers: each cycle
/// charges active configs × hourly rate and applies the suspension rule.
/// The balance may float negative down to the configured threshold.
pub struct WalletBillingService {
    pool: PgPool,
    settings: Arc<SettingsService>,
    reseller_repo: ResellerRepository,
}

impl WalletBillingService {
    pub fn new(pool: PgPool, settings: Arc<SettingsService>) -> Self {
        let reseller_repo = ResellerRepository::new(pool.clone());
        Self {
            pool,
            settings,
            reseller_repo,
        }
    }

    pub async fn start(&self) {
        let secs = self.settings.wallet_billing_secs().await;
        info!("Starting wallet billing loop, every {}s", secs);
        let mut ticker = interval(Duration::from_secs(secs));

        loop {
            ticker.tick().await;
            if let Err(e) = self.bill_once().await {
                error!("Wallet billing error: {}", e);
            }
        }
    }

    pub async fn bill_once(&self) -> Result<()> {
        let settings = self.settings.quota_settings().await;
        if settings.wallet_hourly_cost <= 0 {
            return Ok(());
        }

        let resellers = self
            .reseller_repo
            .get_active_by_kind(ResellerKind::Plan)
            .await?;

        let mut charged = 0usize;
        let mut suspended = 0usize;
        for reseller in resellers {
            let mut tx = self.pool.begin().await?;
            let locked = sqlx::query_as::<_, Reseller>(
                "SELECT * FROM resellers WHERE id = $1 FOR UPDATE",
            )
            .bind(reseller.id)
            .fetch_one(&mut *tx)
            .await?;
            if locked.status != ResellerStatus::Active {
                continue;
            }

            let active_configs: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM reseller_configs WHERE reseller_id = $1 AND status = 'active'",
            )
            .bind(reseller.id)
            .fetch_one(&mut *tx)
            .await?;
            let charge = active_configs * settings.wallet_hourly_cost;
            if charge == 0 {
                continue;
            }

            let new_balance: i64 = sqlx::query_scalar(
                "UPDATE resellers SET wallet_balance = wallet_balance - $1, \
                 updated_at = now() WHERE id = $2 RETURNING wallet_balance",
            )
            .bind(charge)
            .bind(reseller.id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to charge wallet")?;

            ActivityService::log_tx(
                &mut *tx,
                Some(reseller.id),
                "wallet_charged",
                &format!("configs={} charge={} balance={}", active_configs, charge, new_balance),
            )
            .await?;

            if new_balance <= settings.wallet_suspend_threshold {
                QuotaService::suspend_in_tx(&mut tx, reseller.id, SuspendCause::WalletBelowThreshold)
                    .await?;
                suspended += 1;
            }
            tx.commit().await?;
            charged += 1;
        }

        if charged > 0 {
            info!("Wallet billing: {} resellers charged, {} suspended", charged, suspended);
        }
        Ok(())
    }
}

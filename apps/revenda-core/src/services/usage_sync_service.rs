use crate::provisioner::Provisioner;
use crate::services::quota_service::QuotaService;
use crate::settings::SettingsService;
use anyhow::Result;
use revenda_db::models::reseller::ResellerKind;
use revenda_db::repositories::config_repo::ConfigRepository;
use revenda_db::repositories::reseller_repo::ResellerRepository;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{error, info};

/// Periodic usage sync: polls the panel for cumulative per-account counters
/// and feeds the deltas to the quota ledger. Deltas are computed against
/// the counters stored locally, so overlapping runs never double-count an
/// interval (the ledger's row lock serializes the writes themselves).
pub struct UsageSyncService {
    quota: QuotaService,
    settings: Arc<SettingsService>,
    reseller_repo: ResellerRepository,
    config_repo: ConfigRepository,
    provisioner: Arc<dyn Provisioner>,
}

impl UsageSyncService {
    pub fn new(
        pool: PgPool,
        quota: QuotaService,
        settings: Arc<SettingsService>,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        let reseller_repo = ResellerRepository::new(pool.clone());
        let config_repo = ConfigRepository::new(pool);
        Self {
            quota,
            settings,
            reseller_repo,
            config_repo,
            provisioner,
        }
    }

    pub async fn start(&self) {
        let secs = self.settings.usage_sync_secs().await;
        info!("Starting usage sync loop, every {}s", secs);
        let mut ticker = interval(Duration::from_secs(secs));

        loop {
            ticker.tick().await;
            if let Err(e) = self.sync_once().await {
                error!("Usage sync error: {}", e);
            }
        }
    }

    pub async fn sync_once(&self) -> Result<()> {
        let resellers = self
            .reseller_repo
            .get_active_by_kind(ResellerKind::Traffic)
            .await?;

        let mut synced = 0usize;
        let mut suspended = 0usize;
        for reseller in resellers {
            let configs = self.config_repo.get_active_by_reseller(reseller.id).await?;
            if configs.is_empty() {
                continue;
            }

            let usernames: Vec<String> =
                configs.iter().map(|c| c.external_username.clone()).collect();
            let reported = self.provisioner.fetch_usage(&usernames).await?;

            let mut reseller_suspended = false;
            for config in &configs {
                let Some(&panel_total) = reported.get(&config.external_username) else {
                    continue;
                };
                // Panel counters are cumulative; anything at or below what
                // we already booked has been seen.
                let delta = panel_total.saturating_sub(config.usage_bytes);
                if delta == 0 {
                    continue;
                }

                let outcome = self.quota.record_usage(reseller.id, config.id, delta).await?;
                synced += 1;
                if outcome.suspended.is_some() {
                    // Keep booking the remaining deltas: the reseller is
                    // already suspended, and skipping them would leave the
                    // local counters behind the panel's cumulative totals,
                    // replaying the same traffic next cycle.
                    reseller_suspended = true;
                }
            }
            if reseller_suspended {
                suspended += 1;
            }
        }

        if synced > 0 || suspended > 0 {
            info!("Usage sync: {} configs updated, {} resellers suspended", synced, suspended);
        }
        Ok(())
    }
}

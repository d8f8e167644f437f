use crate::provisioner::Provisioner;
use crate::quota::DeniedReason;
use crate::services::activity_service::ActivityService;
use crate::services::quota_service::QuotaService;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use revenda_db::models::config::{ConfigStatus, ResellerConfig};
use revenda_db::repositories::config_repo::ConfigRepository;
use revenda_db::repositories::reseller_repo::ResellerRepository;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Panel account name: reseller prefix plus a random suffix.
pub fn generate_username(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}_{}", prefix, suffix.to_lowercase())
}

/// Config lifecycle for traffic-kind resellers. Every create/enable goes
/// through the admission check first; panel state and the local row are
/// kept in step.
#[derive(Clone)]
pub struct ProvisionService {
    pool: PgPool,
    quota: QuotaService,
    reseller_repo: ResellerRepository,
    config_repo: ConfigRepository,
    provisioner: Arc<dyn Provisioner>,
}

impl ProvisionService {
    pub fn new(pool: PgPool, quota: QuotaService, provisioner: Arc<dyn Provisioner>) -> Self {
        let reseller_repo = ResellerRepository::new(pool.clone());
        let config_repo = ConfigRepository::new(pool.clone());
        Self {
            pool,
            quota,
            reseller_repo,
            config_repo,
            provisioner,
        }
    }

    pub async fn create_config(
        &self,
        reseller_id: i64,
        traffic_limit_bytes: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Result<ResellerConfig, DeniedReason>> {
        if let Err(reason) = self.quota.can_provision(reseller_id).await? {
            return Ok(Err(reason));
        }

        let reseller = self
            .reseller_repo
            .get_by_id(reseller_id)
            .await?
            .with_context(|| format!("Reseller {} not found", reseller_id))?;

        let username = generate_username(&reseller.username_prefix);
        let account = self
            .provisioner
            .create_account(&username, traffic_limit_bytes, expires_at)
            .await
            .context("Panel provisioning failed")?;

        let config_id = self
            .config_repo
            .create(
                reseller_id,
                &account.username,
                Some(account.id),
                traffic_limit_bytes,
                expires_at,
            )
            .await?;

        ActivityService::log(
            &self.pool,
            Some(reseller_id),
            "config_created",
            &format!("config={} username={}", config_id, account.username),
        )
        .await?;
        info!("Created config {} ({}) for reseller {}", config_id, account.username, reseller_id);

        let config = self
            .config_repo
            .get_by_id(config_id)
            .await?
            .context("Config vanished after insert")?;
        Ok(Ok(config))
    }

    /// Re-enabling a disabled config counts as provisioning and is gated
    /// by the same admission check.
    pub async fn enable_config(&self, config_id: i64) -> Result<Result<(), DeniedReason>> {
        let config = self.get_live_config(config_id).await?;
        if let Err(reason) = self.quota.can_provision(config.reseller_id).await? {
            return Ok(Err(reason));
        }

        self.provisioner
            .set_enabled(&config.external_username, true)
            .await
            .context("Panel enable failed")?;
        self.config_repo
            .set_status(config_id, ConfigStatus::Active)
            .await?;
        Ok(Ok(()))
    }

    pub async fn disable_config(&self, config_id: i64) -> Result<()> {
        let config = self.get_live_config(config_id).await?;
        self.provisioner
            .set_enabled(&config.external_username, false)
            .await
            .context("Panel disable failed")?;
        self.config_repo
            .set_status(config_id, ConfigStatus::Disabled)
            .await?;
        Ok(())
    }

    /// Soft delete: the panel account is removed, the row stays with
    /// `deleted_at` stamped.
    pub async fn delete_config(&self, config_id: i64) -> Result<()> {
        let config = self.get_live_config(config_id).await?;
        self.provisioner
            .remove_account(&config.external_username)
            .await
            .context("Panel removal failed")?;
        self.config_repo
            .set_status(config_id, ConfigStatus::Deleted)
            .await?;
        ActivityService::log(
            &self.pool,
            Some(config.reseller_id),
            "config_deleted",
            &format!("config={} username={}", config_id, config.external_username),
        )
        .await?;
        Ok(())
    }

    async fn get_live_config(&self, config_id: i64) -> Result<ResellerConfig> {
        let config = self
            .config_repo
            .get_by_id(config_id)
            .await?
            .with_context(|| format!("Config {} not found", config_id))?;
        anyhow::ensure!(
            config.status != ConfigStatus::Deleted,
            "Config {} is deleted",
            config_id
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_carry_prefix_and_random_suffix() {
        let a = generate_username("rsl7");
        let b = generate_username("rsl7");
        assert!(a.starts_with("rsl7_"));
        assert_eq!(a.len(), "rsl7_".len() + 8);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
}

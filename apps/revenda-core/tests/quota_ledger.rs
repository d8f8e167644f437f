//! Quota ledger integration tests. These run against a real database and
//! are ignored by default; point DATABASE_URL at a disposable Postgres and
//! run with `cargo test -- --ignored`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use revenda_core::provisioner::{PanelAccount, Provisioner};
use revenda_core::quota::SuspendCause;
use revenda_core::services::quota_service::QuotaService;
use revenda_core::services::usage_sync_service::UsageSyncService;
use revenda_core::settings::SettingsService;
use revenda_db::models::config::ConfigStatus;
use revenda_db::models::reseller::{ResellerKind, ResellerStatus};
use revenda_db::repositories::config_repo::ConfigRepository;
use revenda_db::repositories::reseller_repo::ResellerRepository;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

const GB: i64 = 1024 * 1024 * 1024;

async fn pool() -> Result<PgPool> {
    let url = std::env::var("DATABASE_URL")?;
    revenda_db::connect(&url).await
}

/// A traffic reseller with an open window and `quota` bytes to spend.
async fn traffic_reseller(pool: &PgPool, quota: i64) -> Result<i64> {
    let repo = ResellerRepository::new(pool.clone());
    let id = repo
        .create(rand::random::<u32>() as i64, ResellerKind::Traffic, "itest")
        .await?;
    repo.open_window(id, Utc::now(), Utc::now() + Duration::days(30), quota)
        .await?;
    Ok(id)
}

async fn add_config(pool: &PgPool, reseller_id: i64, username: &str) -> Result<i64> {
    ConfigRepository::new(pool.clone())
        .create(reseller_id, username, None, 10 * GB, None)
        .await
}

#[tokio::test]
#[ignore = "requires a migrated Postgres at DATABASE_URL"]
async fn overlapping_usage_deltas_both_land() -> Result<()> {
    let pool = pool().await?;
    let settings = Arc::new(SettingsService::new(pool.clone()).await?);
    let quota = QuotaService::new(pool.clone(), settings);

    let reseller_id = traffic_reseller(&pool, 100 * GB).await?;
    let config_id = add_config(&pool, reseller_id, "itest_overlap").await?;

    let (a, b) = tokio::join!(
        quota.record_usage(reseller_id, config_id, 1_000),
        quota.record_usage(reseller_id, config_id, 1_000),
    );
    a?;
    b?;

    let reseller = ResellerRepository::new(pool.clone())
        .get_by_id(reseller_id)
        .await?
        .unwrap();
    assert_eq!(reseller.traffic_used_bytes, 2_000);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a migrated Postgres at DATABASE_URL"]
async fn quota_crossing_suspends_and_disables_configs() -> Result<()> {
    let pool = pool().await?;
    let settings = Arc::new(SettingsService::new(pool.clone()).await?);
    let quota = QuotaService::new(pool.clone(), settings);

    let reseller_id = traffic_reseller(&pool, 1_000).await?;
    let first = add_config(&pool, reseller_id, "itest_cross_a").await?;
    let second = add_config(&pool, reseller_id, "itest_cross_b").await?;

    let outcome = quota.record_usage(reseller_id, first, 1_000).await?;
    assert_eq!(outcome.suspended, Some(SuspendCause::QuotaExhausted));
    assert_eq!(outcome.disabled_configs, 2);

    let reseller = ResellerRepository::new(pool.clone())
        .get_by_id(reseller_id)
        .await?
        .unwrap();
    assert_eq!(reseller.status, ResellerStatus::Suspended);

    let configs = ConfigRepository::new(pool.clone());
    for id in [first, second] {
        let config = configs.get_by_id(id).await?.unwrap();
        assert_eq!(config.status, ConfigStatus::Disabled);
        assert!(config.disabled_at.is_some());
    }
    Ok(())
}

#[tokio::test]
#[ignore = "requires a migrated Postgres at DATABASE_URL"]
async fn credit_leaves_traffic_reseller_suspended() -> Result<()> {
    let pool = pool().await?;
    let settings = Arc::new(SettingsService::new(pool.clone()).await?);
    let quota = QuotaService::new(pool.clone(), settings);

    let reseller_id = traffic_reseller(&pool, 1_000).await?;
    let config_id = add_config(&pool, reseller_id, "itest_credit").await?;
    quota.record_usage(reseller_id, config_id, 1_000).await?;

    // The suspension came from traffic, not the wallet; money cannot lift it.
    quota.top_up(reseller_id, 1_000_000).await?;

    let reseller = ResellerRepository::new(pool.clone())
        .get_by_id(reseller_id)
        .await?
        .unwrap();
    assert_eq!(reseller.status, ResellerStatus::Suspended);
    assert_eq!(reseller.wallet_balance, 1_000_000);
    Ok(())
}

/// Panel stand-in reporting fixed cumulative counters.
struct FixedUsagePanel {
    usage: HashMap<String, i64>,
}

#[async_trait]
impl Provisioner for FixedUsagePanel {
    async fn create_account(
        &self,
        _username: &str,
        _traffic_limit_bytes: i64,
        _expires_at: Option<DateTime<Utc>>,
    ) -> Result<PanelAccount> {
        anyhow::bail!("not used in this test")
    }

    async fn set_enabled(&self, _username: &str, _enabled: bool) -> Result<()> {
        Ok(())
    }

    async fn remove_account(&self, _username: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_usage(&self, usernames: &[String]) -> Result<HashMap<String, i64>> {
        Ok(usernames
            .iter()
            .filter_map(|u| self.usage.get(u).map(|v| (u.clone(), *v)))
            .collect())
    }
}

#[tokio::test]
#[ignore = "requires a migrated Postgres at DATABASE_URL"]
async fn sync_books_remaining_deltas_after_suspension() -> Result<()> {
    let pool = pool().await?;
    let settings = Arc::new(SettingsService::new(pool.clone()).await?);
    let quota = QuotaService::new(pool.clone(), settings.clone());

    let reseller_id = traffic_reseller(&pool, 1_000).await?;
    let first = add_config(&pool, reseller_id, "itest_sync_a").await?;
    let second = add_config(&pool, reseller_id, "itest_sync_b").await?;

    // The first delta alone exhausts the quota; the second must still be
    // booked so local counters match the panel's cumulative totals.
    let panel = Arc::new(FixedUsagePanel {
        usage: HashMap::from([
            ("itest_sync_a".to_string(), 1_500),
            ("itest_sync_b".to_string(), 700),
        ]),
    });
    let sync = UsageSyncService::new(pool.clone(), quota, settings, panel);
    sync.sync_once().await?;

    let configs = ConfigRepository::new(pool.clone());
    assert_eq!(configs.get_by_id(first).await?.unwrap().usage_bytes, 1_500);
    assert_eq!(configs.get_by_id(second).await?.unwrap().usage_bytes, 700);

    let reseller = ResellerRepository::new(pool.clone())
        .get_by_id(reseller_id)
        .await?
        .unwrap();
    assert_eq!(reseller.status, ResellerStatus::Suspended);
    assert_eq!(reseller.traffic_used_bytes, 2_200);
    Ok(())
}

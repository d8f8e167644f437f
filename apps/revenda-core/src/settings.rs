use crate::quota::QuotaSettings;
use anyhow::{Context, Result};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub const KEY_CONFIGS_MAX_ACTIVE: &str = "configs_max_active";
pub const KEY_WALLET_SUSPEND_THRESHOLD: &str = "wallet_suspend_threshold";
pub const KEY_WALLET_HOURLY_COST: &str = "wallet_hourly_cost";
pub const KEY_USAGE_SYNC_SECS: &str = "usage_sync_secs";
pub const KEY_WALLET_BILLING_SECS: &str = "wallet_billing_secs";

/// DB-backed settings with an in-memory cache. Writes go through `set` so
/// the cache never goes stale within one process.
#[derive(Debug, Clone)]
pub struct SettingsService {
    pool: PgPool,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl SettingsService {
    pub async fn new(pool: PgPool) -> Result<Self> {
        let service = Self {
            pool,
            cache: Arc::new(RwLock::new(HashMap::new())),
        };
        service.reload_cache().await?;
        Ok(service)
    }

    pub async fn reload_cache(&self) -> Result<()> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch settings from DB")?;

        let mut cache = self.cache.write().await;
        cache.clear();
        for (key, value) in rows {
            cache.insert(key, value);
        }
        info!("Settings cache reloaded with {} items", cache.len());
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let cache = self.cache.read().await;
        cache.get(key).cloned()
    }

    pub async fn get_i64(&self, key: &str, default: i64) -> i64 {
        match self.get(key).await {
            Some(raw) => raw.trim().parse().unwrap_or(default),
            None => default,
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("Failed to update setting in DB")?;

        let mut cache = self.cache.write().await;
        cache.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Ledger tunables with their documented defaults.
    pub async fn quota_settings(&self) -> QuotaSettings {
        let defaults = QuotaSettings::default();
        QuotaSettings {
            configs_max_active: self
                .get_i64(KEY_CONFIGS_MAX_ACTIVE, defaults.configs_max_active)
                .await,
            wallet_suspend_threshold: self
                .get_i64(KEY_WALLET_SUSPEND_THRESHOLD, defaults.wallet_suspend_threshold)
                .await,
            wallet_hourly_cost: self
                .get_i64(KEY_WALLET_HOURLY_COST, defaults.wallet_hourly_cost)
                .await,
        }
    }

    pub async fn usage_sync_secs(&self) -> u64 {
        self.get_i64(KEY_USAGE_SYNC_SECS, 300).await.max(1) as u64
    }

    pub async fn wallet_billing_secs(&self) -> u64 {
        self.get_i64(KEY_WALLET_BILLING_SECS, 3600).await.max(1) as u64
    }
}

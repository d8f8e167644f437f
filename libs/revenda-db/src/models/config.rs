use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "config_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConfigStatus {
    Active,
    Disabled,
    Deleted,
}

/// One provisioned VPN account owned by a reseller.
///
/// Rows are never dropped; deletion is a soft transition to `Deleted`
/// with `deleted_at` stamped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResellerConfig {
    pub id: i64,
    pub reseller_id: i64,
    pub external_username: String,
    pub panel_id: Option<i64>,
    pub traffic_limit_bytes: i64,
    pub usage_bytes: i64,
    pub status: ConfigStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub disabled_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

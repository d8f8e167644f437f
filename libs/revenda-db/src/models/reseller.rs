use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which ceiling regime applies to a reseller.
///
/// `Plan` resellers buy plans in bulk against a wallet balance and are
/// billed hourly; `Traffic` resellers provision individual configs against
/// a data-volume quota inside a billing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reseller_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResellerKind {
    Plan,
    Traffic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reseller_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResellerStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reseller {
    pub id: i64,
    pub owner_user_id: i64,
    pub kind: ResellerKind,
    pub status: ResellerStatus,
    pub username_prefix: String,
    pub traffic_total_bytes: i64,
    pub traffic_used_bytes: i64,
    pub window_starts_at: Option<DateTime<Utc>>,
    pub window_ends_at: Option<DateTime<Utc>>,
    /// Minor currency units; may float negative down to the suspension threshold.
    pub wallet_balance: i64,
    pub allowed_service_ids: serde_json::Value,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reseller {
    pub fn remaining_bytes(&self) -> i64 {
        (self.traffic_total_bytes - self.traffic_used_bytes).max(0)
    }
}

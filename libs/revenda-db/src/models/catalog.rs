use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Retail price in minor currency units.
    pub price: i64,
    pub currency: String,
    pub volume_gb: i32,
    pub duration_days: i32,
    pub reseller_visible: bool,
    pub reseller_discount_percent: Option<f64>,
    /// Global fixed resale price, minor units.
    pub reseller_price: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-reseller pricing exception for one catalog plan.
///
/// At most one row exists per (reseller_id, plan_id); the schema enforces
/// the uniqueness. Admin-managed, read-only to the pricing flow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AllowedPlan {
    pub id: i64,
    pub reseller_id: i64,
    pub plan_id: i64,
    /// "percent" or "price"; NULL means the row only grants/denies access.
    pub override_kind: Option<String>,
    pub override_value: Option<f64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

pub const OVERRIDE_KIND_PERCENT: &str = "percent";
pub const OVERRIDE_KIND_PRICE: &str = "price";

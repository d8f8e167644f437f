use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Bulk plan purchase by a plan-kind reseller.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResellerOrder {
    pub id: i64,
    pub reseller_id: i64,
    pub plan_id: i64,
    pub quantity: i32,
    /// Minor units, as resolved at purchase time.
    pub unit_price: i64,
    pub total_price: i64,
    /// Which rung of the precedence chain produced `unit_price`.
    pub price_source: String,
    /// 'download' or 'onscreen'
    pub delivery: String,
    pub status: String,
    /// Serialized provisioning results, filled in after fulfillment.
    pub fulfillment: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

pub const DELIVERY_DOWNLOAD: &str = "download";
pub const DELIVERY_ONSCREEN: &str = "onscreen";

pub const ORDER_STATUS_PAID: &str = "paid";
pub const ORDER_STATUS_FULFILLED: &str = "fulfilled";

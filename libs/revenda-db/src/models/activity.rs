use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only audit feed. Suspension/resume transitions land here for the
/// notification side to pick up.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityEntry {
    pub id: i64,
    pub reseller_id: Option<i64>,
    pub event: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

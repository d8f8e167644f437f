//! Admission and suspension rules for reseller capacity.
//!
//! Pure functions over reseller snapshots and an explicit settings struct;
//! the transactional side (atomic counters, cascade) lives in
//! `services::quota_service`. Which ceiling applies is selected by the
//! reseller kind: traffic resellers burn a windowed byte quota, plan
//! resellers burn a wallet balance that may float negative down to the
//! suspension threshold.

use chrono::{DateTime, Utc};
use revenda_db::models::reseller::{Reseller, ResellerKind, ResellerStatus};
use serde::Serialize;

/// Tunables for the ledger, loaded from the settings store with these
/// defaults. Thresholds are minor currency units.
#[derive(Debug, Clone, Copy)]
pub struct QuotaSettings {
    pub configs_max_active: i64,
    /// Negative: a limited negative float is allowed before cutoff.
    pub wallet_suspend_threshold: i64,
    /// Hourly charge per active config for wallet-billed resellers.
    /// Zero disables usage billing until configured.
    pub wallet_hourly_cost: i64,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            configs_max_active: 50,
            wallet_suspend_threshold: -100_000,
            wallet_hourly_cost: 0,
        }
    }
}

/// Business-rule denial. Never raised as an error; always handled locally
/// by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedReason {
    ResellerNotActive,
    ConfigLimitReached,
    QuotaExhausted,
    WindowExpired,
    WalletBelowThreshold,
}

impl DeniedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeniedReason::ResellerNotActive => "reseller_not_active",
            DeniedReason::ConfigLimitReached => "config_limit_reached",
            DeniedReason::QuotaExhausted => "quota_exhausted",
            DeniedReason::WindowExpired => "window_expired",
            DeniedReason::WalletBelowThreshold => "wallet_below_threshold",
        }
    }
}

/// What tipped an active reseller into suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspendCause {
    QuotaExhausted,
    WindowExpired,
    WalletBelowThreshold,
}

fn window_expired(reseller: &Reseller, now: DateTime<Utc>) -> bool {
    match (reseller.window_starts_at, reseller.window_ends_at) {
        // Half-open window: expiry fires exactly at window_ends_at.
        (_, Some(end)) if now >= end => true,
        (Some(start), _) if now < start => true,
        _ => false,
    }
}

/// May this reseller create or re-enable a config right now?
///
/// Callers must invoke this immediately before acting; the narrow
/// check-then-act window that remains is a tolerated soft limit.
pub fn evaluate_admission(
    reseller: &Reseller,
    active_configs: i64,
    settings: &QuotaSettings,
    now: DateTime<Utc>,
) -> Result<(), DeniedReason> {
    if reseller.status != ResellerStatus::Active {
        return Err(DeniedReason::ResellerNotActive);
    }
    if active_configs >= settings.configs_max_active {
        return Err(DeniedReason::ConfigLimitReached);
    }
    match reseller.kind {
        ResellerKind::Traffic => {
            if window_expired(reseller, now) {
                return Err(DeniedReason::WindowExpired);
            }
            if reseller.remaining_bytes() == 0 {
                return Err(DeniedReason::QuotaExhausted);
            }
        }
        ResellerKind::Plan => {
            if reseller.wallet_balance <= settings.wallet_suspend_threshold {
                return Err(DeniedReason::WalletBelowThreshold);
            }
        }
    }
    Ok(())
}

/// Should an *active* reseller transition to suspended, given its current
/// snapshot? Evaluated after each usage increment and each billing charge.
pub fn suspension_due(
    reseller: &Reseller,
    settings: &QuotaSettings,
    now: DateTime<Utc>,
) -> Option<SuspendCause> {
    match reseller.kind {
        ResellerKind::Traffic => {
            if reseller
                .window_ends_at
                .is_some_and(|end| now >= end)
            {
                Some(SuspendCause::WindowExpired)
            } else if reseller.traffic_used_bytes >= reseller.traffic_total_bytes {
                Some(SuspendCause::QuotaExhausted)
            } else {
                None
            }
        }
        ResellerKind::Plan => {
            if reseller.wallet_balance <= settings.wallet_suspend_threshold {
                Some(SuspendCause::WalletBelowThreshold)
            } else {
                None
            }
        }
    }
}

/// Suspension is recoverable: a top-up that lifts the balance *strictly*
/// above the threshold resumes a wallet-billed reseller. This is a wallet
/// rule only; traffic-kind resellers come back through admin reactivation
/// or a new window, never through a credit.
pub fn wallet_resumes(reseller: &Reseller, new_balance: i64, settings: &QuotaSettings) -> bool {
    reseller.kind == ResellerKind::Plan && new_balance > settings.wallet_suspend_threshold
}

/// Outcome of one modeled usage increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageTransition {
    pub traffic_used_bytes: i64,
    pub suspend: Option<SuspendCause>,
}

/// Pure model of one usage increment against a reseller snapshot. The
/// storage layer performs the same arithmetic as an atomic SQL increment
/// under the reseller row lock, so folding transitions one after another
/// models serialized concurrent sync runs exactly: two deltas of X always
/// accumulate to 2X.
pub fn apply_usage(
    reseller: &Reseller,
    delta_bytes: i64,
    settings: &QuotaSettings,
    now: DateTime<Utc>,
) -> UsageTransition {
    let mut next = reseller.clone();
    next.traffic_used_bytes = next.traffic_used_bytes.saturating_add(delta_bytes);
    let suspend = if next.status == ResellerStatus::Active {
        suspension_due(&next, settings, now)
    } else {
        None
    };
    UsageTransition {
        traffic_used_bytes: next.traffic_used_bytes,
        suspend,
    }
}

//! Resale price resolution.
//!
//! A strict precedence chain, not a best-price search: the first matching
//! rung wins even when a later rung would be cheaper. An explicitly
//! deactivated override row denies the plan outright, regardless of any
//! plan-level discount.

use revenda_db::models::catalog::{AllowedPlan, OVERRIDE_KIND_PERCENT, OVERRIDE_KIND_PRICE, Plan};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    OverridePercent,
    OverridePrice,
    PlanPercent,
    PlanPrice,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::OverridePercent => "override_percent",
            PriceSource::OverridePrice => "override_price",
            PriceSource::PlanPercent => "plan_percent",
            PriceSource::PlanPrice => "plan_price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedPrice {
    /// Minor currency units.
    pub price: i64,
    pub source: PriceSource,
}

/// Half-up rounding to whole minor units. Prices are non-negative, so
/// `f64::round` (half away from zero) behaves as half-up here. A percent
/// outside 0..=100 (or NaN) is corrupt pricing data and yields no price,
/// never a negative or nonsense one.
fn percent_off(price: i64, percent: f64) -> Option<i64> {
    if !(0.0..=100.0).contains(&percent) {
        return None;
    }
    Some((price as f64 * (1.0 - percent / 100.0)).round() as i64)
}

/// Resolves the resale price of `plan` for the reseller whose (single)
/// override row is `override_row`. Pure; returns None when the plan is not
/// purchasable by this reseller at any price.
pub fn resolve_price(plan: &Plan, override_row: Option<&AllowedPlan>) -> Option<ResolvedPrice> {
    if !plan.reseller_visible {
        return None;
    }

    if let Some(row) = override_row {
        // Explicit denial always wins, even over a global discount.
        if !row.active {
            return None;
        }
        match (row.override_kind.as_deref(), row.override_value) {
            (Some(OVERRIDE_KIND_PERCENT), Some(value)) => {
                return percent_off(plan.price, value).map(|price| ResolvedPrice {
                    price,
                    source: PriceSource::OverridePercent,
                });
            }
            (Some(OVERRIDE_KIND_PRICE), Some(value)) => {
                return Some(ResolvedPrice {
                    price: value.round() as i64,
                    source: PriceSource::OverridePrice,
                });
            }
            // Kind without value (or neither): the row only grants access,
            // pricing falls through to the plan-level rungs.
            _ => {}
        }
    }

    if let Some(percent) = plan.reseller_discount_percent {
        return percent_off(plan.price, percent).map(|price| ResolvedPrice {
            price,
            source: PriceSource::PlanPercent,
        });
    }

    if let Some(price) = plan.reseller_price {
        return Some(ResolvedPrice {
            price,
            source: PriceSource::PlanPrice,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn plan(price: i64) -> Plan {
        Plan {
            id: 1,
            name: "Test 30d".to_string(),
            description: None,
            price,
            currency: "IRT".to_string(),
            volume_gb: 50,
            duration_days: 30,
            reseller_visible: true,
            reseller_discount_percent: None,
            reseller_price: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn override_row(kind: Option<&str>, value: Option<f64>, active: bool) -> AllowedPlan {
        AllowedPlan {
            id: 1,
            reseller_id: 7,
            plan_id: 1,
            override_kind: kind.map(str::to_string),
            override_value: value,
            active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn invisible_plan_never_resolves() {
        let mut p = plan(100_000);
        p.reseller_visible = false;
        p.reseller_discount_percent = Some(10.0);
        assert_eq!(resolve_price(&p, None), None);
    }

    #[test]
    fn inactive_override_denies_despite_plan_discount() {
        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(10.0);
        let row = override_row(Some("percent"), Some(50.0), false);
        assert_eq!(resolve_price(&p, Some(&row)), None);
    }

    #[test]
    fn plan_percent_discount_applies_without_override() {
        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(10.0);
        assert_eq!(
            resolve_price(&p, None),
            Some(ResolvedPrice {
                price: 90_000,
                source: PriceSource::PlanPercent,
            })
        );
    }

    #[test]
    fn fixed_override_beats_plan_percent() {
        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(10.0);
        let row = override_row(Some("price"), Some(75_000.0), true);
        assert_eq!(
            resolve_price(&p, Some(&row)),
            Some(ResolvedPrice {
                price: 75_000,
                source: PriceSource::OverridePrice,
            })
        );
    }

    #[test]
    fn percent_override_beats_plan_percent() {
        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(10.0);
        let row = override_row(Some("percent"), Some(25.0), true);
        assert_eq!(
            resolve_price(&p, Some(&row)),
            Some(ResolvedPrice {
                price: 75_000,
                source: PriceSource::OverridePercent,
            })
        );
    }

    #[test]
    fn access_only_row_falls_through_to_plan_pricing() {
        let mut p = plan(100_000);
        p.reseller_price = Some(80_000);
        let row = override_row(None, None, true);
        assert_eq!(
            resolve_price(&p, Some(&row)),
            Some(ResolvedPrice {
                price: 80_000,
                source: PriceSource::PlanPrice,
            })
        );
    }

    #[test]
    fn no_rung_matches_returns_none() {
        let p = plan(100_000);
        assert_eq!(resolve_price(&p, None), None);
    }

    #[test]
    fn percent_rounding_is_half_up() {
        // 333 * 0.5 = 166.5 -> 167
        let mut p = plan(333);
        p.reseller_discount_percent = Some(50.0);
        assert_eq!(resolve_price(&p, None).unwrap().price, 167);

        // 100000 * (1 - 33.333/100) = 66667.0 -> 66667
        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(33.333);
        assert_eq!(resolve_price(&p, None).unwrap().price, 66_667);
    }

    #[test]
    fn out_of_range_percent_yields_no_price() {
        // A discount above 100% would produce a negative price; treat the
        // plan as unresolvable instead.
        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(150.0);
        assert_eq!(resolve_price(&p, None), None);

        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(-10.0);
        assert_eq!(resolve_price(&p, None), None);

        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(f64::NAN);
        assert_eq!(resolve_price(&p, None), None);
    }

    #[test]
    fn out_of_range_override_percent_yields_no_price() {
        let p = plan(100_000);
        let row = override_row(Some("percent"), Some(250.0), true);
        assert_eq!(resolve_price(&p, Some(&row)), None);
    }

    #[test]
    fn boundary_percents_resolve() {
        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(0.0);
        assert_eq!(resolve_price(&p, None).unwrap().price, 100_000);

        let mut p = plan(100_000);
        p.reseller_discount_percent = Some(100.0);
        assert_eq!(resolve_price(&p, None).unwrap().price, 0);
    }

    #[test]
    fn fixed_prices_are_used_verbatim() {
        let mut p = plan(100_000);
        p.reseller_price = Some(99_999);
        assert_eq!(
            resolve_price(&p, None),
            Some(ResolvedPrice {
                price: 99_999,
                source: PriceSource::PlanPrice,
            })
        );
    }
}

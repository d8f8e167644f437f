use crate::pricing::{ResolvedPrice, resolve_price};
use anyhow::Result;
use revenda_db::models::catalog::Plan;
use revenda_db::repositories::catalog_repo::CatalogRepository;
use sqlx::PgPool;

/// Repository-backed wrapper around the pure resolver.
#[derive(Debug, Clone)]
pub struct PricingService {
    catalog_repo: CatalogRepository,
}

impl PricingService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog_repo: CatalogRepository::new(pool),
        }
    }

    /// None means the plan is not purchasable by this reseller at any price.
    /// Missing plan rows are an infrastructure-level absence, also None.
    pub async fn resolve(&self, reseller_id: i64, plan_id: i64) -> Result<Option<ResolvedPrice>> {
        let Some(plan) = self.catalog_repo.get_plan(plan_id).await? else {
            return Ok(None);
        };
        let override_row = self.catalog_repo.get_override(reseller_id, plan_id).await?;
        Ok(resolve_price(&plan, override_row.as_ref()))
    }

    /// The resellable catalog as one reseller sees it: each visible plan
    /// paired with its resolved price, denied plans filtered out.
    pub async fn price_list(&self, reseller_id: i64) -> Result<Vec<(Plan, ResolvedPrice)>> {
        let plans = self.catalog_repo.get_resellable_plans().await?;
        let overrides = self
            .catalog_repo
            .get_overrides_for_reseller(reseller_id)
            .await?;

        let mut out = Vec::new();
        for plan in plans {
            let row = overrides.iter().find(|o| o.plan_id == plan.id);
            if let Some(resolved) = resolve_price(&plan, row) {
                out.push((plan, resolved));
            }
        }
        Ok(out)
    }
}

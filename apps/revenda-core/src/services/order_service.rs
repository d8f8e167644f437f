use crate::provisioner::Provisioner;
use crate::services::activity_service::ActivityService;
use crate::services::pricing_service::PricingService;
use crate::services::provision_service::generate_username;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use revenda_db::models::order::{
    DELIVERY_DOWNLOAD, DELIVERY_ONSCREEN, ORDER_STATUS_FULFILLED, ORDER_STATUS_PAID, ResellerOrder,
};
use revenda_db::models::reseller::{Reseller, ResellerStatus};
use revenda_db::repositories::catalog_repo::CatalogRepository;
use revenda_db::repositories::order_repo::OrderRepository;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Why a bulk purchase was rejected. Always handled by the caller, never
/// surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDenied {
    ResellerNotActive,
    PlanNotResellable,
    InsufficientBalance,
}

#[derive(Debug)]
pub enum OrderOutcome {
    Placed(ResellerOrder),
    Denied(OrderDenied),
}

/// Bulk plan purchases for plan-kind resellers: resolve the resale price,
/// debit the wallet and record the order in one transaction.
#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    pricing: PricingService,
    catalog_repo: CatalogRepository,
    order_repo: OrderRepository,
    provisioner: Arc<dyn Provisioner>,
}

impl OrderService {
    pub fn new(pool: PgPool, provisioner: Arc<dyn Provisioner>) -> Self {
        let pricing = PricingService::new(pool.clone());
        let catalog_repo = CatalogRepository::new(pool.clone());
        let order_repo = OrderRepository::new(pool.clone());
        Self {
            pool,
            pricing,
            catalog_repo,
            order_repo,
            provisioner,
        }
    }

    pub async fn place_order(
        &self,
        reseller_id: i64,
        plan_id: i64,
        quantity: i32,
        delivery: &str,
    ) -> Result<OrderOutcome> {
        anyhow::ensure!(quantity > 0, "Order quantity must be positive");
        anyhow::ensure!(
            delivery == DELIVERY_DOWNLOAD || delivery == DELIVERY_ONSCREEN,
            "Unknown delivery mode: {}",
            delivery
        );

        let Some(resolved) = self.pricing.resolve(reseller_id, plan_id).await? else {
            return Ok(OrderOutcome::Denied(OrderDenied::PlanNotResellable));
        };
        let total = resolved
            .price
            .checked_mul(quantity as i64)
            .context("Order total overflows")?;

        let mut tx = self.pool.begin().await?;
        let reseller = sqlx::query_as::<_, Reseller>(
            "SELECT * FROM resellers WHERE id = $1 FOR UPDATE",
        )
        .bind(reseller_id)
        .fetch_optional(&mut *tx)
        .await?
        .with_context(|| format!("Reseller {} not found", reseller_id))?;

        if reseller.status != ResellerStatus::Active {
            return Ok(OrderOutcome::Denied(OrderDenied::ResellerNotActive));
        }
        // Purchases require covered funds; the negative float below zero is
        // reserved for hourly usage billing.
        if reseller.wallet_balance < total {
            return Ok(OrderOutcome::Denied(OrderDenied::InsufficientBalance));
        }

        sqlx::query(
            "UPDATE resellers SET wallet_balance = wallet_balance - $1, \
             updated_at = now() WHERE id = $2",
        )
        .bind(total)
        .bind(reseller_id)
        .execute(&mut *tx)
        .await
        .context("Failed to debit wallet")?;

        let order = sqlx::query_as::<_, ResellerOrder>(
            "INSERT INTO reseller_orders \
             (reseller_id, plan_id, quantity, unit_price, total_price, price_source, delivery, status, paid_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now()) RETURNING *",
        )
        .bind(reseller_id)
        .bind(plan_id)
        .bind(quantity)
        .bind(resolved.price)
        .bind(total)
        .bind(resolved.source.as_str())
        .bind(delivery)
        .bind(ORDER_STATUS_PAID)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create reseller order")?;

        ActivityService::log_tx(
            &mut *tx,
            Some(reseller_id),
            "order_placed",
            &format!(
                "order={} plan={} qty={} total={} source={}",
                order.id,
                plan_id,
                quantity,
                total,
                resolved.source.as_str()
            ),
        )
        .await?;
        tx.commit().await?;

        info!(
            "Reseller {} bought {}x plan {} for {} ({})",
            reseller_id,
            quantity,
            plan_id,
            total,
            resolved.source.as_str()
        );
        Ok(OrderOutcome::Placed(order))
    }

    /// Provisions the purchased accounts and stores the results on the
    /// order. Separate from `place_order` so a panel outage never leaves a
    /// half-debited wallet. Accounts already recorded on the order are kept,
    /// so a retry after a mid-batch panel failure provisions only the
    /// remainder instead of duplicating accounts.
    pub async fn fulfill_order(&self, order_id: i64, username_prefix: &str) -> Result<ResellerOrder> {
        let order = self
            .order_repo
            .get_by_id(order_id)
            .await?
            .with_context(|| format!("Order {} not found", order_id))?;
        if order.status == ORDER_STATUS_FULFILLED {
            return Ok(order);
        }
        anyhow::ensure!(
            order.status == ORDER_STATUS_PAID,
            "Order {} is not payable for fulfillment (status {})",
            order_id,
            order.status
        );
        let plan = self
            .catalog_repo
            .get_plan(order.plan_id)
            .await?
            .with_context(|| format!("Plan {} not found", order.plan_id))?;

        let traffic_limit = plan.volume_gb as i64 * 1024 * 1024 * 1024;
        let expires_at = Utc::now() + Duration::days(plan.duration_days as i64);

        let mut accounts = recorded_accounts(order.fulfillment.as_ref());
        while accounts.len() < order.quantity as usize {
            let username = generate_username(username_prefix);
            let created = self
                .provisioner
                .create_account(&username, traffic_limit, Some(expires_at))
                .await;
            let account = match created {
                Ok(account) => account,
                Err(err) => {
                    // Keep what the panel already confirmed so a retry
                    // resumes from here.
                    if !accounts.is_empty() {
                        let partial = serde_json::json!({ "accounts": accounts });
                        self.order_repo
                            .save_partial_fulfillment(order_id, &partial)
                            .await?;
                    }
                    return Err(err.context(format!(
                        "Panel provisioning failed after {} of {} accounts",
                        accounts.len(),
                        order.quantity
                    )));
                }
            };
            accounts.push(serde_json::json!({
                "username": account.username,
                "panel_id": account.id,
            }));
        }

        let fulfillment = serde_json::json!({ "accounts": accounts });
        self.order_repo.record_fulfillment(order_id, &fulfillment).await?;

        let mut fulfilled = order;
        fulfilled.status = ORDER_STATUS_FULFILLED.to_string();
        fulfilled.fulfillment = Some(fulfillment);
        Ok(fulfilled)
    }
}

/// Accounts already provisioned for an order, read back from its stored
/// fulfillment payload.
fn recorded_accounts(fulfillment: Option<&serde_json::Value>) -> Vec<serde_json::Value> {
    fulfillment
        .and_then(|f| f.get("accounts"))
        .and_then(|a| a.as_array())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_stored_fulfillment_starts_from_scratch() {
        assert!(recorded_accounts(None).is_empty());
        assert!(recorded_accounts(Some(&serde_json::json!({}))).is_empty());
    }

    #[test]
    fn partial_fulfillment_resumes_from_stored_accounts() {
        let stored = serde_json::json!({
            "accounts": [
                { "username": "rsl_a1b2c3d4", "panel_id": 11 },
                { "username": "rsl_e5f6g7h8", "panel_id": 12 },
            ]
        });
        let accounts = recorded_accounts(Some(&stored));
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0]["panel_id"], 11);
    }
}

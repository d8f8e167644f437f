pub mod activity_service;
pub mod order_service;
pub mod pricing_service;
pub mod provision_service;
pub mod quota_service;
pub mod usage_sync_service;
pub mod wallet_billing_service;

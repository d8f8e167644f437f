pub mod catalog_repo;
pub mod config_repo;
pub mod order_repo;
pub mod reseller_repo;

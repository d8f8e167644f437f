pub mod activity;
pub mod catalog;
pub mod config;
pub mod order;
pub mod reseller;

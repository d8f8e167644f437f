pub mod pricing;
pub mod provisioner;
pub mod quota;
pub mod services;
pub mod settings;

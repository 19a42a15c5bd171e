//! Port traits for external collaborators.

pub mod config_port;
pub mod market_data_port;
pub mod notifier_port;
pub mod store_port;

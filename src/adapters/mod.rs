//! Adapter implementations for the port traits.

pub mod binance_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod log_notifier;
pub mod memory_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod telegram_adapter;
#[cfg(feature = "web")]
pub mod web;

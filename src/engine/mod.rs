//! Orchestration over the domain and the ports.
//!
//! - `repository`: typed keys and values on top of the key-value store
//! - `indicator_service`: fetch, compute and cache per-symbol results
//! - `subscription_service`: subscription CRUD
//! - `monitor`: the periodic crossing check and alert fan-out
//! - `price_refresher`: periodic quote cache refresh

pub mod indicator_service;
pub mod monitor;
pub mod price_refresher;
pub mod repository;
pub mod subscription_service;

pub use indicator_service::IndicatorService;
pub use monitor::{CycleReport, IndicatorMonitor};
pub use price_refresher::PriceRefresher;
pub use repository::Repository;
pub use subscription_service::SubscriptionService;

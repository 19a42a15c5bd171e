//! Core domain types and logic.

pub mod alert;
pub mod condition;
pub mod config;
pub mod config_validation;
pub mod cooldown;
pub mod error;
pub mod indicator;
pub mod kline;
pub mod quote;
pub mod subscription;

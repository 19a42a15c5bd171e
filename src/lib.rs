//! lrcwatch: linear regression channel breakout monitor.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], and the periodic monitor and
//! services that wire them together in [`engine`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod logging;
pub mod ports;

//! Volume condition evaluation for subscriptions.
//!
//! The volume check is an opt-in filter and fails open: a disabled check or an
//! unrecognised mode never blocks a notification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::indicator::VolumeResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VolumeCheckMode {
    /// Pass when current volume >= a fixed threshold.
    Fixed,
    /// Pass when current volume >= average volume * multiplier.
    Multiplier,
    /// Any other stored value. Always passes.
    Other(String),
}

impl From<&str> for VolumeCheckMode {
    fn from(s: &str) -> Self {
        match s {
            "fixed" => VolumeCheckMode::Fixed,
            "multiplier" => VolumeCheckMode::Multiplier,
            other => VolumeCheckMode::Other(other.to_string()),
        }
    }
}

impl From<String> for VolumeCheckMode {
    fn from(s: String) -> Self {
        VolumeCheckMode::from(s.as_str())
    }
}

impl From<VolumeCheckMode> for String {
    fn from(mode: VolumeCheckMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for VolumeCheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeCheckMode::Fixed => write!(f, "fixed"),
            VolumeCheckMode::Multiplier => write!(f, "multiplier"),
            VolumeCheckMode::Other(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeCheckConfig {
    pub enabled: bool,
    pub mode: VolumeCheckMode,
    pub fixed_value: f64,
    pub multiplier: f64,
    pub avg_period: usize,
}

impl Default for VolumeCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: VolumeCheckMode::Multiplier,
            fixed_value: 0.0,
            multiplier: 2.0,
            avg_period: 20,
        }
    }
}

pub fn passes_volume_condition(result: &VolumeResult, config: &VolumeCheckConfig) -> bool {
    if !config.enabled {
        return true;
    }

    match config.mode {
        VolumeCheckMode::Fixed => result.current_volume >= config.fixed_value,
        VolumeCheckMode::Multiplier => {
            result.current_volume >= result.avg_volume * config.multiplier
        }
        VolumeCheckMode::Other(_) => true,
    }
}

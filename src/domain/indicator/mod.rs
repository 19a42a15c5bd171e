//! Indicator calculations and the per-symbol result snapshot.
//!
//! - `lrc`: linear regression channel over closing prices
//! - `volume`: current vs trailing-average bucket volume
//! - `IndicatorResult`: immutable snapshot combining both with the live price

pub mod lrc;
pub mod volume;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use lrc::{ChannelResult, compute_channel};
pub use volume::{VolumeResult, compute_volume_stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingType {
    AboveUpper,
    BelowLower,
}

impl fmt::Display for CrossingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossingType::AboveUpper => write!(f, "above_upper"),
            CrossingType::BelowLower => write!(f, "below_lower"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorResult {
    pub symbol: String,
    #[serde(flatten)]
    pub channel: ChannelResult,
    #[serde(flatten)]
    pub volume: VolumeResult,
    pub current_price: f64,
    pub is_above_upper: bool,
    pub is_below_lower: bool,
    pub calculated_at: DateTime<Utc>,
}

impl IndicatorResult {
    pub fn new(
        symbol: impl Into<String>,
        channel: ChannelResult,
        volume: VolumeResult,
        current_price: f64,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            channel,
            volume,
            current_price,
            is_above_upper: current_price > channel.upper_band,
            is_below_lower: current_price < channel.lower_band,
            calculated_at,
        }
    }

    /// The band the current price lies strictly outside of, if any.
    pub fn crossing(&self) -> Option<CrossingType> {
        if self.is_below_lower {
            Some(CrossingType::BelowLower)
        } else if self.is_above_upper {
            Some(CrossingType::AboveUpper)
        } else {
            None
        }
    }
}

//! Volume statistics over fixed-size buckets.
//!
//! current = last bucket; average = mean of up to `avg_period` buckets before
//! it (clipped at the series start); ratio = current / average, or 0 when the
//! average is not positive. An empty series yields the zero result.

use serde::{Deserialize, Serialize};

pub const DEFAULT_AVG_PERIOD: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResult {
    pub current_volume: f64,
    pub avg_volume: f64,
    #[serde(rename = "volumeRatio")]
    pub ratio: f64,
}

pub fn compute_volume_stats(volumes: &[f64], avg_period: usize) -> VolumeResult {
    let Some((&current_volume, previous)) = volumes.split_last() else {
        return VolumeResult::default();
    };

    let start = previous.len().saturating_sub(avg_period);
    let window = &previous[start..];

    let avg_volume = if window.is_empty() {
        0.0
    } else {
        window.iter().sum::<f64>() / window.len() as f64
    };

    let ratio = if avg_volume > 0.0 {
        current_volume / avg_volume
    } else {
        0.0
    };

    VolumeResult {
        current_volume,
        avg_volume,
        ratio,
    }
}

//! Linear regression channel (LRC).
//!
//! Fits ordinary least squares of price against bucket index over the last
//! `length` closes (x = 0 is the oldest point in the window):
//! - slope     = (n*Sxy - Sx*Sy) / (n*Sxx - Sx^2)
//! - intercept = (Sy - slope*Sx) / n
//! - center    = slope*(length-1) + intercept   (regression value at the newest point)
//! - deviation = sqrt(mean((y[i] - (slope*i + intercept))^2))   (population, not sample)
//! - upper/lower = center +/- multiplier * deviation
//!
//! Defaults: length=42, multiplier=2.0.

use serde::{Deserialize, Serialize};

use crate::domain::error::WatchError;

pub const DEFAULT_LENGTH: usize = 42;
pub const DEFAULT_DEV_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResult {
    pub center_line: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    pub slope: f64,
    pub deviation: f64,
}

pub fn compute_channel(
    prices: &[f64],
    length: usize,
    dev_multiplier: f64,
) -> Result<ChannelResult, WatchError> {
    if prices.len() < length {
        return Err(WatchError::InsufficientData {
            have: prices.len(),
            need: length,
        });
    }

    let window = &prices[prices.len() - length..];
    let n = length as f64;

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in window.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return Err(WatchError::DegenerateFit);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    let center_line = slope * (length - 1) as f64 + intercept;

    let sum_residuals_sq: f64 = window
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let residual = y - (slope * i as f64 + intercept);
            residual * residual
        })
        .sum();
    let deviation = (sum_residuals_sq / n).sqrt();

    Ok(ChannelResult {
        center_line,
        upper_band: center_line + dev_multiplier * deviation,
        lower_band: center_line - dev_multiplier * deviation,
        slope,
        deviation,
    })
}

//! Kline (candlestick) representation and series extraction.

use serde::{Deserialize, Serialize};

/// One time bucket of exchange market data. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

/// Closing prices, oldest first.
pub fn closes(klines: &[Kline]) -> Vec<f64> {
    klines.iter().map(|k| k.close).collect()
}

/// Bucket volumes, oldest first.
pub fn volumes(klines: &[Kline]) -> Vec<f64> {
    klines.iter().map(|k| k.volume).collect()
}

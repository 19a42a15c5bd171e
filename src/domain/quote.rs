//! Latest traded price snapshot for a symbol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    /// 24h change in percent.
    pub change_24h: f64,
    /// 24h base-asset volume.
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

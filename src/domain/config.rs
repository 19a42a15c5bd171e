//! Engine configuration: monitored symbols, channel parameters and loop timings.
//!
//! `IndicatorConfig` is persisted in the store and re-read at the start of every
//! monitor cycle. `MonitorSettings` is process-level and read once at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::error::WatchError;
use crate::domain::indicator::lrc::{DEFAULT_DEV_MULTIPLIER, DEFAULT_LENGTH};
use crate::domain::indicator::volume::DEFAULT_AVG_PERIOD;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "BNB", "SOL", "XRP", "DOGE", "ADA", "AVAX", "1000SHIB", "BCH", "DOT", "LINK",
    "TON", "UNI", "LTC", "NEAR", "ATOM", "AAVE", "RIVER",
];
pub const DEFAULT_LRC_INTERVAL: &str = "4h";
pub const VOLUME_INTERVAL: &str = "1m";

/// Extra buckets fetched beyond the strict window size.
pub const FETCH_HEADROOM: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Spot,
    #[default]
    Futures,
}

impl FromStr for MarketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spot" => Ok(MarketType::Spot),
            "futures" => Ok(MarketType::Futures),
            other => Err(format!("unknown market type '{}' (expected spot or futures)", other)),
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketType::Spot => write!(f, "spot"),
            MarketType::Futures => write!(f, "futures"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorConfig {
    pub symbols: Vec<String>,
    pub market_type: MarketType,
    pub lrc_length: usize,
    pub lrc_dev_multiplier: f64,
    pub lrc_interval: String,
    pub default_volume_avg_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            market_type: MarketType::Futures,
            lrc_length: DEFAULT_LENGTH,
            lrc_dev_multiplier: DEFAULT_DEV_MULTIPLIER,
            lrc_interval: DEFAULT_LRC_INTERVAL.to_string(),
            default_volume_avg_period: DEFAULT_AVG_PERIOD,
        }
    }
}

impl IndicatorConfig {
    /// Read the `[indicator]` section, falling back to the built-in defaults per key.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, WatchError> {
        let defaults = IndicatorConfig::default();

        let symbols = match config.get_string("indicator", "symbols") {
            Some(list) => parse_symbols(&list),
            None => defaults.symbols,
        };

        let market_type = match config.get_string("indicator", "market_type") {
            Some(raw) => raw.parse().map_err(|reason| WatchError::ConfigInvalid {
                section: "indicator".into(),
                key: "market_type".into(),
                reason,
            })?,
            None => defaults.market_type,
        };

        let lrc_length = non_negative(
            config.get_int("indicator", "lrc_length", defaults.lrc_length as i64),
            "lrc_length",
        )?;
        let default_volume_avg_period = non_negative(
            config.get_int(
                "indicator",
                "volume_avg_period",
                defaults.default_volume_avg_period as i64,
            ),
            "volume_avg_period",
        )?;

        Ok(Self {
            symbols,
            market_type,
            lrc_length,
            lrc_dev_multiplier: config.get_double(
                "indicator",
                "lrc_dev_multiplier",
                defaults.lrc_dev_multiplier,
            ),
            lrc_interval: config
                .get_string("indicator", "lrc_interval")
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.lrc_interval),
            default_volume_avg_period,
        })
    }

    /// Number of channel-interval buckets to request per symbol.
    pub fn channel_fetch_limit(&self) -> usize {
        self.lrc_length + FETCH_HEADROOM
    }

    /// Number of 1-minute buckets to request for volume statistics.
    pub fn volume_fetch_limit(&self) -> usize {
        self.default_volume_avg_period + FETCH_HEADROOM
    }
}

fn non_negative(value: i64, key: &str) -> Result<usize, WatchError> {
    usize::try_from(value).map_err(|_| WatchError::ConfigInvalid {
        section: "indicator".into(),
        key: key.into(),
        reason: format!("{} must not be negative", key),
    })
}

/// Split a comma list into upper-case symbols, dropping blanks and duplicates.
pub fn parse_symbols(input: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for token in input.split(',') {
        let symbol = token.trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub cycle_interval: Duration,
    pub price_refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub result_ttl: Duration,
    pub quote_ttl: Duration,
    pub cooldown_floor_hours: i64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(30),
            price_refresh_interval: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(10),
            result_ttl: Duration::from_secs(30),
            quote_ttl: Duration::from_secs(20),
            cooldown_floor_hours: 24,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let d = MonitorSettings::default();
        let secs = |key: &str, default: Duration| {
            let value = config.get_int("monitor", key, default.as_secs() as i64);
            if value > 0 {
                Duration::from_secs(value as u64)
            } else {
                default
            }
        };

        Self {
            cycle_interval: secs("cycle_seconds", d.cycle_interval),
            price_refresh_interval: secs("price_refresh_seconds", d.price_refresh_interval),
            fetch_timeout: secs("fetch_timeout_seconds", d.fetch_timeout),
            result_ttl: secs("result_ttl_seconds", d.result_ttl),
            quote_ttl: secs("quote_ttl_seconds", d.quote_ttl),
            cooldown_floor_hours: config.get_int(
                "monitor",
                "cooldown_ttl_hours",
                d.cooldown_floor_hours,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn defaults_match_reference_parameters() {
        let c = IndicatorConfig::default();
        assert_eq!(c.symbols.len(), 19);
        assert_eq!(c.symbols[0], "BTC");
        assert_eq!(c.market_type, MarketType::Futures);
        assert_eq!(c.lrc_length, 42);
        assert_eq!(c.lrc_dev_multiplier, 2.0);
        assert_eq!(c.lrc_interval, "4h");
        assert_eq!(c.default_volume_avg_period, 20);
        assert_eq!(c.channel_fetch_limit(), 47);
        assert_eq!(c.volume_fetch_limit(), 25);
    }

    #[test]
    fn from_config_reads_overrides() {
        let adapter = FileConfigAdapter::from_string(
            "[indicator]\nsymbols = btc, eth ,,BTC\nmarket_type = spot\nlrc_length = 30\nlrc_dev_multiplier = 1.5\nlrc_interval = 1h\nvolume_avg_period = 10\n",
        )
        .unwrap();
        let c = IndicatorConfig::from_config(&adapter).unwrap();
        assert_eq!(c.symbols, vec!["BTC", "ETH"]);
        assert_eq!(c.market_type, MarketType::Spot);
        assert_eq!(c.lrc_length, 30);
        assert_eq!(c.lrc_dev_multiplier, 1.5);
        assert_eq!(c.lrc_interval, "1h");
        assert_eq!(c.default_volume_avg_period, 10);
    }

    #[test]
    fn from_config_empty_uses_defaults() {
        let adapter = FileConfigAdapter::from_string("[indicator]\n").unwrap();
        let c = IndicatorConfig::from_config(&adapter).unwrap();
        assert_eq!(c, IndicatorConfig::default());
    }

    #[test]
    fn from_config_rejects_unknown_market() {
        let adapter = FileConfigAdapter::from_string("[indicator]\nmarket_type = margin\n").unwrap();
        let err = IndicatorConfig::from_config(&adapter).unwrap_err();
        assert!(matches!(err, WatchError::ConfigInvalid { key, .. } if key == "market_type"));
    }

    #[test]
    fn from_config_rejects_negative_length() {
        let adapter = FileConfigAdapter::from_string("[indicator]\nlrc_length = -3\n").unwrap();
        let err = IndicatorConfig::from_config(&adapter).unwrap_err();
        assert!(matches!(err, WatchError::ConfigInvalid { key, .. } if key == "lrc_length"));
    }

    #[test]
    fn market_type_parse_and_display() {
        assert_eq!("Futures".parse::<MarketType>(), Ok(MarketType::Futures));
        assert_eq!(" spot ".parse::<MarketType>(), Ok(MarketType::Spot));
        assert!("perp".parse::<MarketType>().is_err());
        assert_eq!(MarketType::Spot.to_string(), "spot");
    }

    #[test]
    fn indicator_config_json_round_trip() {
        let c = IndicatorConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"lrcLength\":42"));
        assert!(json.contains("\"marketType\":\"futures\""));
        let back: IndicatorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn monitor_settings_from_config() {
        let adapter = FileConfigAdapter::from_string(
            "[monitor]\ncycle_seconds = 15\nfetch_timeout_seconds = 0\ncooldown_ttl_hours = 48\n",
        )
        .unwrap();
        let s = MonitorSettings::from_config(&adapter);
        assert_eq!(s.cycle_interval, Duration::from_secs(15));
        assert_eq!(s.fetch_timeout, Duration::from_secs(10));
        assert_eq!(s.result_ttl, Duration::from_secs(30));
        assert_eq!(s.cooldown_floor_hours, 48);
    }
}

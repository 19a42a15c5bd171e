//! Configuration validation.
//!
//! Validates indicator parameters before they are persisted or used by the
//! monitor loop.

use crate::domain::config::IndicatorConfig;
use crate::domain::error::WatchError;
use crate::ports::config_port::ConfigPort;

pub const KLINE_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Build the indicator config from a file and validate it.
pub fn validate_config(config: &dyn ConfigPort) -> Result<IndicatorConfig, WatchError> {
    let indicator = IndicatorConfig::from_config(config)?;
    validate_indicator_config(&indicator)?;
    Ok(indicator)
}

pub fn validate_indicator_config(config: &IndicatorConfig) -> Result<(), WatchError> {
    validate_symbols(config)?;
    validate_lrc_length(config)?;
    validate_dev_multiplier(config)?;
    validate_interval(config)?;
    validate_volume_avg_period(config)?;
    Ok(())
}

fn invalid(key: &str, reason: &str) -> WatchError {
    WatchError::ConfigInvalid {
        section: "indicator".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_symbols(config: &IndicatorConfig) -> Result<(), WatchError> {
    if config.symbols.is_empty() {
        return Err(invalid("symbols", "at least one symbol is required"));
    }
    if config
        .symbols
        .iter()
        .any(|s| s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        return Err(invalid("symbols", "symbols must be alphanumeric"));
    }
    Ok(())
}

fn validate_lrc_length(config: &IndicatorConfig) -> Result<(), WatchError> {
    if config.lrc_length < 2 {
        return Err(invalid("lrc_length", "lrc_length must be at least 2"));
    }
    Ok(())
}

fn validate_dev_multiplier(config: &IndicatorConfig) -> Result<(), WatchError> {
    if !config.lrc_dev_multiplier.is_finite() || config.lrc_dev_multiplier < 0.0 {
        return Err(invalid(
            "lrc_dev_multiplier",
            "lrc_dev_multiplier must be a non-negative number",
        ));
    }
    Ok(())
}

fn validate_interval(config: &IndicatorConfig) -> Result<(), WatchError> {
    if !KLINE_INTERVALS.contains(&config.lrc_interval.as_str()) {
        return Err(invalid("lrc_interval", "unsupported kline interval"));
    }
    Ok(())
}

fn validate_volume_avg_period(config: &IndicatorConfig) -> Result<(), WatchError> {
    if config.default_volume_avg_period < 1 {
        return Err(invalid(
            "volume_avg_period",
            "volume_avg_period must be positive",
        ));
    }
    Ok(())
}

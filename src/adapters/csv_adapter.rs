//! CSV kline replay adapter for offline evaluation.
//!
//! Reads `{dir}/{SYMBOL}_{interval}.csv` with header
//! `open_time,open,high,low,close,volume,close_time`.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::WatchError;
use crate::domain::kline::Kline;
use crate::domain::quote::PriceQuote;
use crate::ports::market_data_port::MarketDataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
    quote_interval: String,
}

impl CsvAdapter {
    /// `quote_interval` selects the file whose last close serves as the current price.
    pub fn new(base_path: PathBuf, quote_interval: &str) -> Self {
        Self {
            base_path,
            quote_interval: quote_interval.to_string(),
        }
    }

    fn csv_path(&self, symbol: &str, interval: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol.to_uppercase(), interval))
    }

    fn read_klines(&self, symbol: &str, interval: &str) -> Result<Vec<Kline>, WatchError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path).map_err(|e| {
            WatchError::fetch(symbol, format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut klines = Vec::new();
        for result in rdr.deserialize::<Kline>() {
            let kline =
                result.map_err(|e| WatchError::fetch(symbol, format!("CSV parse error: {}", e)))?;
            klines.push(kline);
        }

        klines.sort_by_key(|k| k.open_time);
        Ok(klines)
    }

    /// Symbols with a file for `interval`, sorted.
    pub fn list_symbols(&self, interval: &str) -> Result<Vec<String>, WatchError> {
        let entries = fs::read_dir(&self.base_path)?;

        let suffix = format!("_{}.csv", interval);
        let mut symbols = Vec::new();

        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

/// Read the `close` column of any CSV file with a header row.
pub fn read_close_column(path: &Path) -> Result<Vec<f64>, WatchError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| WatchError::ConfigInvalid {
        section: "csv".into(),
        key: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let invalid = |reason: String| WatchError::ConfigInvalid {
        section: "csv".into(),
        key: path.display().to_string(),
        reason,
    };

    let headers = rdr
        .headers()
        .map_err(|e| invalid(e.to_string()))?
        .clone();
    let column = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("close"))
        .ok_or_else(|| invalid("missing close column".into()))?;

    let mut closes = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| invalid(e.to_string()))?;
        let value = record
            .get(column)
            .ok_or_else(|| invalid(format!("row {} has no close value", line + 1)))?;
        closes.push(
            value
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(format!("row {}: {}", line + 1, e)))?,
        );
    }
    Ok(closes)
}

#[async_trait]
impl MarketDataPort for CsvAdapter {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Kline>, WatchError> {
        let mut klines = self.read_klines(symbol, interval)?;
        if klines.len() > limit {
            klines.drain(..klines.len() - limit);
        }
        Ok(klines)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, WatchError> {
        let klines = self.read_klines(symbol, &self.quote_interval)?;
        let last = klines
            .last()
            .ok_or_else(|| WatchError::fetch(symbol, "no rows to derive a price from"))?;

        Ok(PriceQuote {
            symbol: symbol.to_uppercase(),
            price: last.close,
            change_24h: 0.0,
            volume: last.volume,
            timestamp: Utc
                .timestamp_millis_opt(last.close_time)
                .single()
                .unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "open_time,open,high,low,close,volume,close_time\n";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let rows = "120000,102.0,104.0,101.0,103.0,7.5,179999\n\
            0,100.0,101.0,99.0,100.5,10.0,59999\n\
            60000,100.5,102.5,100.0,102.0,12.0,119999\n";
        fs::write(path.join("BTC_1h.csv"), format!("{HEADER}{rows}")).unwrap();
        fs::write(path.join("ETH_1h.csv"), HEADER).unwrap();
        fs::write(path.join("SOL_1m.csv"), HEADER).unwrap();

        (dir, path)
    }

    #[tokio::test]
    async fn fetch_klines_sorted_and_limited() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "1h");

        let all = adapter.fetch_klines("btc", "1h", 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].open_time, 0);
        assert_eq!(all[2].close, 103.0);

        let last_two = adapter.fetch_klines("BTC", "1h", 2).await.unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].open_time, 60000);
    }

    #[tokio::test]
    async fn quote_is_last_close() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "1h");

        let quote = adapter.fetch_quote("BTC").await.unwrap();
        assert_eq!(quote.price, 103.0);
        assert_eq!(quote.timestamp.timestamp_millis(), 179999);
    }

    #[tokio::test]
    async fn missing_file_is_fetch_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "1h");

        let err = adapter.fetch_klines("XRP", "1h", 5).await.unwrap_err();
        assert!(err.is_fetch());
        let err = adapter.fetch_quote("ETH").await.unwrap_err();
        assert!(matches!(err, WatchError::Fetch { ref symbol, .. } if symbol == "ETH"));
    }

    #[test]
    fn list_symbols_for_interval() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path, "1h");

        assert_eq!(adapter.list_symbols("1h").unwrap(), vec!["BTC", "ETH"]);
        assert_eq!(adapter.list_symbols("1m").unwrap(), vec!["SOL"]);
    }

    #[test]
    fn close_column_by_header_name() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("prices.csv");
        fs::write(&file, "date,Close\n2024-01-01,10.5\n2024-01-02, 11\n").unwrap();
        assert_eq!(read_close_column(&file).unwrap(), vec![10.5, 11.0]);

        fs::write(&file, "date,price\n2024-01-01,10.5\n").unwrap();
        assert!(matches!(
            read_close_column(&file).unwrap_err(),
            WatchError::ConfigInvalid { .. }
        ));
    }
}

//! Per-symbol indicator computation with result caching.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::config::{IndicatorConfig, VOLUME_INTERVAL};
use crate::domain::error::WatchError;
use crate::domain::indicator::{IndicatorResult, VolumeResult, compute_channel, compute_volume_stats};
use crate::domain::kline::{closes, volumes};
use crate::engine::repository::Repository;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Clone)]
pub struct IndicatorService {
    repo: Repository,
    market: Arc<dyn MarketDataPort>,
    fetch_timeout: Duration,
    result_ttl: Duration,
}

async fn bounded<T>(
    limit: Duration,
    what: impl FnOnce() -> String,
    fut: impl Future<Output = Result<T, WatchError>>,
) -> Result<T, WatchError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| WatchError::Timeout { what: what() })?
}

impl IndicatorService {
    pub fn new(
        repo: Repository,
        market: Arc<dyn MarketDataPort>,
        fetch_timeout: Duration,
        result_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            market,
            fetch_timeout,
            result_ttl,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Reuse a live cached result, otherwise compute and cache a new one.
    ///
    /// Store failures only cost a recomputation or a missed cache write.
    pub async fn evaluate(
        &self,
        symbol: &str,
        config: &IndicatorConfig,
    ) -> Result<IndicatorResult, WatchError> {
        match self.repo.get_indicator_result(symbol) {
            Ok(Some(cached)) => {
                tracing::debug!(symbol, "using cached indicator result");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(symbol, error = %e, "result cache read failed, recomputing"),
        }

        let result = self.compute(symbol, config).await?;
        if let Err(e) = self.repo.set_indicator_result(&result, self.result_ttl) {
            tracing::warn!(symbol, error = %e, "failed to cache indicator result");
        }
        Ok(result)
    }

    /// Fetch history and price, then build a fresh result. Never reads the cache.
    pub async fn compute(
        &self,
        symbol: &str,
        config: &IndicatorConfig,
    ) -> Result<IndicatorResult, WatchError> {
        let klines = bounded(
            self.fetch_timeout,
            || format!("{} {} klines", symbol, config.lrc_interval),
            self.market
                .fetch_klines(symbol, &config.lrc_interval, config.channel_fetch_limit()),
        )
        .await?;

        let channel = compute_channel(&closes(&klines), config.lrc_length, config.lrc_dev_multiplier)?;
        let price = self.current_price(symbol).await?;
        let volume = self.volume_stats(symbol, config).await;

        Ok(IndicatorResult::new(symbol, channel, volume, price, Utc::now()))
    }

    /// Cached quote when live, otherwise a bounded live fetch.
    pub async fn current_price(&self, symbol: &str) -> Result<f64, WatchError> {
        match self.repo.get_quote(symbol) {
            Ok(Some(quote)) => return Ok(quote.price),
            Ok(None) => {}
            Err(e) => tracing::warn!(symbol, error = %e, "quote cache read failed"),
        }

        bounded(
            self.fetch_timeout,
            || format!("{} price", symbol),
            self.market.fetch_current_price(symbol),
        )
        .await
    }

    async fn volume_stats(&self, symbol: &str, config: &IndicatorConfig) -> VolumeResult {
        let fetched = bounded(
            self.fetch_timeout,
            || format!("{} volume klines", symbol),
            self.market
                .fetch_klines(symbol, VOLUME_INTERVAL, config.volume_fetch_limit()),
        )
        .await;

        match fetched {
            Ok(klines) if !klines.is_empty() => {
                compute_volume_stats(&volumes(&klines), config.default_volume_avg_period)
            }
            Ok(_) => VolumeResult::default(),
            Err(e) => {
                tracing::warn!(symbol, error = %e, "volume fetch failed, skipping volume stats");
                VolumeResult::default()
            }
        }
    }

    /// Query path for the API: cached result if live, else computed with the
    /// stored config (built-in default if the store is unavailable).
    pub async fn get_cached_or_computed(&self, symbol: &str) -> Result<IndicatorResult, WatchError> {
        let symbol = symbol.trim().to_uppercase();
        let config = self.repo.get_indicator_config().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load indicator config, using defaults");
            IndicatorConfig::default()
        });
        self.evaluate(&symbol, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;
    use crate::domain::kline::Kline;
    use crate::domain::quote::PriceQuote;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FakeMarket {
        closes: Vec<f64>,
        volumes: Option<Vec<f64>>,
        price: f64,
        quote_down: bool,
        calls: Mutex<Vec<String>>,
    }

    fn kline(i: usize, close: f64, volume: f64) -> Kline {
        Kline {
            open_time: i as i64 * 60_000,
            open: close,
            high: close,
            low: close,
            close,
            volume,
            close_time: i as i64 * 60_000 + 59_999,
        }
    }

    #[async_trait]
    impl MarketDataPort for FakeMarket {
        async fn fetch_klines(
            &self,
            symbol: &str,
            interval: &str,
            limit: usize,
        ) -> Result<Vec<Kline>, WatchError> {
            self.calls.lock().push(format!("klines {} {} {}", symbol, interval, limit));
            let series = if interval == VOLUME_INTERVAL {
                match &self.volumes {
                    Some(v) => v.iter().enumerate().map(|(i, v)| kline(i, 1.0, *v)).collect(),
                    None => return Err(WatchError::fetch(symbol, "volume down")),
                }
            } else {
                self.closes.iter().enumerate().map(|(i, c)| kline(i, *c, 0.0)).collect()
            };
            Ok(series)
        }

        async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, WatchError> {
            self.calls.lock().push(format!("quote {}", symbol));
            if self.quote_down {
                return Err(WatchError::fetch(symbol, "ticker down"));
            }
            Ok(PriceQuote {
                symbol: symbol.into(),
                price: self.price,
                change_24h: 0.0,
                volume: 0.0,
                timestamp: Utc::now(),
            })
        }
    }

    fn config(length: usize) -> IndicatorConfig {
        IndicatorConfig {
            symbols: vec!["BTC".into()],
            lrc_length: length,
            default_volume_avg_period: 4,
            ..IndicatorConfig::default()
        }
    }

    fn service(market: Arc<FakeMarket>) -> IndicatorService {
        IndicatorService::new(
            Repository::new(Arc::new(MemoryStore::new())),
            market,
            Duration::from_secs(5),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn compute_combines_channel_price_and_volume() {
        let market = Arc::new(FakeMarket {
            closes: (0..10).map(|i| 100.0 + i as f64).collect(),
            volumes: Some(vec![10.0, 10.0, 10.0, 10.0, 20.0]),
            price: 120.0,
            quote_down: false,
            calls: Mutex::new(Vec::new()),
        });
        let svc = service(market.clone());

        let result = svc.compute("BTC", &config(5)).await.unwrap();
        assert!((result.channel.center_line - 109.0).abs() < 1e-9);
        assert!(result.is_above_upper);
        assert_eq!(result.volume.ratio, 2.0);

        let calls = market.calls.lock().clone();
        assert_eq!(calls[0], "klines BTC 4h 10");
        assert!(calls.contains(&"klines BTC 1m 9".to_string()));
    }

    #[tokio::test]
    async fn volume_failure_yields_zero_stats() {
        let market = Arc::new(FakeMarket {
            closes: vec![1.0, 2.0, 3.0],
            volumes: None,
            price: 2.0,
            quote_down: false,
            calls: Mutex::new(Vec::new()),
        });
        let result = service(market).compute("BTC", &config(3)).await.unwrap();
        assert_eq!(result.volume, VolumeResult::default());
    }

    #[tokio::test]
    async fn insufficient_history_is_computation_error() {
        let market = Arc::new(FakeMarket {
            closes: vec![1.0, 2.0],
            volumes: Some(vec![]),
            price: 2.0,
            quote_down: false,
            calls: Mutex::new(Vec::new()),
        });
        let err = service(market).compute("BTC", &config(42)).await.unwrap_err();
        assert!(err.is_computation());
    }

    #[tokio::test]
    async fn cached_quote_is_preferred() {
        let market = Arc::new(FakeMarket {
            closes: vec![1.0, 2.0, 3.0],
            volumes: Some(vec![1.0]),
            price: 2.0,
            quote_down: false,
            calls: Mutex::new(Vec::new()),
        });
        let svc = service(market.clone());
        svc.repository()
            .set_quote(
                &PriceQuote {
                    symbol: "BTC".into(),
                    price: 99.0,
                    change_24h: 0.0,
                    volume: 0.0,
                    timestamp: Utc::now(),
                },
                Duration::from_secs(20),
            )
            .unwrap();

        assert_eq!(svc.current_price("BTC").await.unwrap(), 99.0);
        assert!(!market.calls.lock().iter().any(|c| c.starts_with("quote")));
    }

    #[tokio::test]
    async fn evaluate_reuses_cached_result() {
        let market = Arc::new(FakeMarket {
            closes: vec![1.0, 2.0, 3.0],
            volumes: Some(vec![1.0]),
            price: 2.0,
            quote_down: false,
            calls: Mutex::new(Vec::new()),
        });
        let svc = service(market.clone());

        let first = svc.evaluate("BTC", &config(3)).await.unwrap();
        let calls_after_first = market.calls.lock().len();
        let second = svc.get_cached_or_computed("btc").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(market.calls.lock().len(), calls_after_first);
    }

    #[tokio::test]
    async fn price_failure_skips_symbol_without_caching() {
        let market = Arc::new(FakeMarket {
            closes: vec![1.0, 2.0, 3.0],
            volumes: Some(vec![1.0]),
            price: 2.0,
            quote_down: true,
            calls: Mutex::new(Vec::new()),
        });
        let svc = service(market.clone());

        let err = svc.evaluate("BTC", &config(3)).await.unwrap_err();
        assert!(err.is_fetch());
        assert!(svc.repository().get_indicator_result("BTC").unwrap().is_none());
        assert!(market.calls.lock().iter().any(|c| c == "klines BTC 4h 8"));
    }
}

//! Periodic quote refresh into the store.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::config::{IndicatorConfig, MonitorSettings};
use crate::domain::error::WatchError;
use crate::engine::repository::Repository;
use crate::ports::market_data_port::MarketDataPort;

pub struct PriceRefresher {
    repo: Repository,
    market: Arc<dyn MarketDataPort>,
    interval: Duration,
    fetch_timeout: Duration,
    quote_ttl: Duration,
}

impl PriceRefresher {
    pub fn new(
        repo: Repository,
        market: Arc<dyn MarketDataPort>,
        settings: &MonitorSettings,
    ) -> Self {
        Self {
            repo,
            market,
            interval: settings.price_refresh_interval,
            fetch_timeout: settings.fetch_timeout,
            quote_ttl: settings.quote_ttl,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "price refresher started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("price refresher stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let config = self.repo.get_indicator_config().unwrap_or_else(|e| {
                        warn!(error = %e, "failed to load indicator config, using defaults");
                        IndicatorConfig::default()
                    });
                    let stored = self.refresh(&config.symbols).await;
                    debug!(stored, total = config.symbols.len(), "prices refreshed");
                }
            }
        }
    }

    /// Fetch and store quotes for `symbols` concurrently. Returns how many were stored.
    pub async fn refresh(&self, symbols: &[String]) -> usize {
        let tasks = symbols.iter().map(|symbol| async move {
            let quote = tokio::time::timeout(self.fetch_timeout, self.market.fetch_quote(symbol))
                .await
                .unwrap_or_else(|_| {
                    Err(WatchError::Timeout {
                        what: format!("{} quote", symbol),
                    })
                })?;
            self.repo.set_quote(&quote, self.quote_ttl)
        });

        let mut stored = 0;
        for (symbol, outcome) in symbols.iter().zip(join_all(tasks).await) {
            match outcome {
                Ok(()) => stored += 1,
                Err(e) => warn!(symbol = %symbol, error = %e, "price refresh failed"),
            }
        }
        stored
    }
}

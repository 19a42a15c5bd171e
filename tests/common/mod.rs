#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lrcwatch::adapters::memory_store::MemoryStore;
use lrcwatch::domain::alert::AlertPayload;
use lrcwatch::domain::condition::VolumeCheckConfig;
use lrcwatch::domain::config::{IndicatorConfig, MonitorSettings, VOLUME_INTERVAL};
use lrcwatch::domain::error::WatchError;
use lrcwatch::domain::kline::Kline;
use lrcwatch::domain::quote::PriceQuote;
use lrcwatch::domain::subscription::Subscription;
use lrcwatch::engine::{IndicatorMonitor, IndicatorService, Repository};
use lrcwatch::ports::market_data_port::MarketDataPort;
use lrcwatch::ports::notifier_port::NotifierPort;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub struct MockMarketData {
    pub closes: HashMap<String, Vec<f64>>,
    pub volumes: HashMap<String, Vec<f64>>,
    pub errors: HashMap<String, String>,
    pub kline_calls: Mutex<Vec<(String, String, usize)>>,
    pub quote_calls: Mutex<Vec<String>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            closes: HashMap::new(),
            volumes: HashMap::new(),
            errors: HashMap::new(),
            kline_calls: Mutex::new(Vec::new()),
            quote_calls: Mutex::new(Vec::new()),
        }
    }

    /// The last close doubles as the current price.
    pub fn with_closes(mut self, symbol: &str, closes: Vec<f64>) -> Self {
        self.closes.insert(symbol.to_string(), closes);
        self
    }

    pub fn with_volumes(mut self, symbol: &str, volumes: Vec<f64>) -> Self {
        self.volumes.insert(symbol.to_string(), volumes);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn kline_call_count(&self) -> usize {
        self.kline_calls.lock().len()
    }
}

pub fn make_kline(index: usize, close: f64, volume: f64) -> Kline {
    let open_time = index as i64 * 14_400_000;
    Kline {
        open_time,
        open: close,
        high: close,
        low: close,
        close,
        volume,
        close_time: open_time + 14_399_999,
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Kline>, WatchError> {
        self.kline_calls
            .lock()
            .push((symbol.to_string(), interval.to_string(), limit));
        if let Some(reason) = self.errors.get(symbol) {
            return Err(WatchError::fetch(symbol, reason));
        }

        let series: Vec<Kline> = if interval == VOLUME_INTERVAL {
            self.volumes
                .get(symbol)
                .map(|v| v.iter().enumerate().map(|(i, v)| make_kline(i, 1.0, *v)).collect())
                .unwrap_or_default()
        } else {
            self.closes
                .get(symbol)
                .map(|c| c.iter().enumerate().map(|(i, c)| make_kline(i, *c, 0.0)).collect())
                .unwrap_or_default()
        };

        let skip = series.len().saturating_sub(limit);
        Ok(series.into_iter().skip(skip).collect())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, WatchError> {
        self.quote_calls.lock().push(symbol.to_string());
        if let Some(reason) = self.errors.get(symbol) {
            return Err(WatchError::fetch(symbol, reason));
        }
        let price = self
            .closes
            .get(symbol)
            .and_then(|c| c.last().copied())
            .ok_or_else(|| WatchError::fetch(symbol, "no data"))?;
        Ok(PriceQuote {
            symbol: symbol.to_string(),
            price,
            change_24h: 0.0,
            volume: 0.0,
            timestamp: Utc::now(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, AlertPayload)>>,
    pub failing_targets: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, target: &str) {
        self.failing_targets.lock().insert(target.to_string());
    }

    pub fn recover(&self, target: &str) {
        self.failing_targets.lock().remove(target);
    }

    pub fn sent(&self) -> Vec<(String, AlertPayload)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl NotifierPort for RecordingNotifier {
    async fn send(&self, target: &str, alert: &AlertPayload) -> Result<(), WatchError> {
        if self.failing_targets.lock().contains(target) {
            return Err(WatchError::Dispatch {
                target: target.to_string(),
                reason: "simulated failure".into(),
            });
        }
        self.sent.lock().push((target.to_string(), alert.clone()));
        Ok(())
    }
}

/// 46 closes alternating around 100 followed by `last`.
///
/// With length 42 and multiplier 2 the bands sit near 112/94 for `last = 130`
/// and near 106/88 for `last = 70`.
pub fn closes_ending_with(last: f64) -> Vec<f64> {
    let mut closes: Vec<f64> = (0..46)
        .map(|i| if i % 2 == 0 { 99.0 } else { 101.0 })
        .collect();
    closes.push(last);
    closes
}

pub fn make_config(symbols: &[&str]) -> IndicatorConfig {
    IndicatorConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        ..IndicatorConfig::default()
    }
}

pub fn make_subscription(id: &str, symbol: &str, enabled: bool) -> Subscription {
    let now = Utc::now();
    Subscription {
        id: id.to_string(),
        user_id: format!("user-{}", id),
        symbol: symbol.to_string(),
        enabled,
        notify_target: format!("chat-{}", id),
        notify_interval_minutes: 60,
        volume_check: VolumeCheckConfig::default(),
        created_at: now,
        updated_at: now,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub repo: Repository,
    pub market: Arc<MockMarketData>,
    pub notifier: Arc<RecordingNotifier>,
    pub monitor: IndicatorMonitor,
}

pub fn make_harness(market: MockMarketData) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let repo = Repository::new(store.clone());
    let market = Arc::new(market);
    let notifier = Arc::new(RecordingNotifier::new());
    let settings = MonitorSettings {
        cycle_interval: Duration::from_millis(20),
        ..MonitorSettings::default()
    };
    let indicators = IndicatorService::new(
        repo.clone(),
        market.clone(),
        settings.fetch_timeout,
        settings.result_ttl,
    );
    let monitor = IndicatorMonitor::new(indicators, notifier.clone(), &settings);
    Harness {
        store,
        repo,
        market,
        notifier,
        monitor,
    }
}

pub fn minutes_after(t: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    t + chrono::Duration::minutes(minutes)
}

//! Periodic channel-crossing monitor.
//!
//! Each cycle loads the engine config, evaluates every symbol concurrently,
//! and fans out alerts to the enabled subscribers of symbols whose price is
//! outside the channel. Per-symbol and per-subscriber failures are contained
//! and recorded in the `CycleReport`.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::domain::alert::build_alert;
use crate::domain::condition::passes_volume_condition;
use crate::domain::config::{IndicatorConfig, MonitorSettings};
use crate::domain::cooldown::{is_in_cooldown, record_ttl};
use crate::domain::error::WatchError;
use crate::domain::indicator::{CrossingType, IndicatorResult};
use crate::domain::subscription::Subscription;
use crate::engine::indicator_service::IndicatorService;
use crate::engine::repository::Repository;
use crate::ports::notifier_port::NotifierPort;

/// What one cycle did. Counts cover all symbols.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub evaluated: Vec<String>,
    /// Symbols dropped this cycle and the error that caused it.
    pub skipped: Vec<(String, String)>,
    pub crossings: Vec<(String, CrossingType)>,
    pub dispatched: usize,
    pub failed: usize,
    pub in_cooldown: usize,
    pub filtered: usize,
    pub disabled: usize,
}

impl CycleReport {
    fn merge(&mut self, other: CycleReport) {
        self.evaluated.extend(other.evaluated);
        self.skipped.extend(other.skipped);
        self.crossings.extend(other.crossings);
        self.dispatched += other.dispatched;
        self.failed += other.failed;
        self.in_cooldown += other.in_cooldown;
        self.filtered += other.filtered;
        self.disabled += other.disabled;
    }
}

enum Delivery {
    Sent,
    Failed,
    Cooldown,
    Filtered,
    Disabled,
}

pub struct IndicatorMonitor {
    indicators: IndicatorService,
    notifier: Arc<dyn NotifierPort>,
    cycle_interval: Duration,
    dispatch_timeout: Duration,
    cooldown_floor_hours: i64,
    last_good_config: Mutex<IndicatorConfig>,
}

impl IndicatorMonitor {
    pub fn new(
        indicators: IndicatorService,
        notifier: Arc<dyn NotifierPort>,
        settings: &MonitorSettings,
    ) -> Self {
        Self {
            indicators,
            notifier,
            cycle_interval: settings.cycle_interval,
            dispatch_timeout: settings.fetch_timeout,
            cooldown_floor_hours: settings.cooldown_floor_hours,
            last_good_config: Mutex::new(IndicatorConfig::default()),
        }
    }

    fn repo(&self) -> &Repository {
        self.indicators.repository()
    }

    /// Run cycles until `shutdown` fires. The first cycle starts immediately.
    /// Expired store entries are purged after every cycle.
    ///
    /// Cancellation is only observed between cycles, so a dispatch and its
    /// cooldown write always complete together.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.cycle_interval.as_secs(),
            "indicator monitor started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("indicator monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let config = self.load_config();
                    let report = self.run_cycle(&config, Utc::now()).await;
                    info!(
                        evaluated = report.evaluated.len(),
                        skipped = report.skipped.len(),
                        crossings = report.crossings.len(),
                        dispatched = report.dispatched,
                        failed = report.failed,
                        "monitor cycle complete"
                    );
                    self.sweep_expired();
                }
            }
        }
    }

    fn sweep_expired(&self) {
        match self.repo().purge_expired() {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "expired entries purged"),
            Err(e) => warn!(error = %e, "expired entry sweep failed"),
        }
    }

    /// Stored config, or the last one that loaded successfully.
    pub fn load_config(&self) -> IndicatorConfig {
        match self.repo().get_indicator_config() {
            Ok(config) => {
                *self.last_good_config.lock() = config.clone();
                config
            }
            Err(e) => {
                error!(error = %e, "failed to load indicator config, using last known good");
                self.last_good_config.lock().clone()
            }
        }
    }

    /// One pass over every configured symbol. `now` drives cooldown checks and
    /// is the timestamp recorded for successful dispatches.
    pub async fn run_cycle(&self, config: &IndicatorConfig, now: DateTime<Utc>) -> CycleReport {
        let span = info_span!("monitor_cycle", symbols = config.symbols.len());

        async {
            let tasks = config.symbols.iter().map(|symbol| {
                self.process_symbol(symbol, config, now)
                    .instrument(info_span!("evaluate_symbol", symbol = %symbol))
            });

            let mut report = CycleReport::default();
            for partial in join_all(tasks).await {
                report.merge(partial);
            }
            report
        }
        .instrument(span)
        .await
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        config: &IndicatorConfig,
        now: DateTime<Utc>,
    ) -> CycleReport {
        let mut report = CycleReport::default();

        let result = match self.indicators.evaluate(symbol, config).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_computation() {
                    warn!(error = %e, "channel computation failed, skipping symbol");
                } else if e.is_fetch() {
                    warn!(error = %e, "market data unavailable, skipping symbol");
                } else {
                    error!(error = %e, "indicator evaluation failed, skipping symbol");
                }
                report.skipped.push((symbol.to_string(), e.to_string()));
                return report;
            }
        };
        report.evaluated.push(symbol.to_string());

        let Some(crossing) = result.crossing() else {
            return report;
        };
        report.crossings.push((symbol.to_string(), crossing));

        let subscriptions = match self.repo().subscriptions_by_symbol(symbol) {
            Ok(subs) => subs,
            Err(e) => {
                error!(error = %e, "failed to load subscriptions");
                return report;
            }
        };

        for sub in &subscriptions {
            match self.deliver(sub, &result, now).await {
                Delivery::Sent => report.dispatched += 1,
                Delivery::Failed => report.failed += 1,
                Delivery::Cooldown => report.in_cooldown += 1,
                Delivery::Filtered => report.filtered += 1,
                Delivery::Disabled => report.disabled += 1,
            }
        }
        report
    }

    async fn deliver(
        &self,
        sub: &Subscription,
        result: &IndicatorResult,
        now: DateTime<Utc>,
    ) -> Delivery {
        if !sub.enabled {
            return Delivery::Disabled;
        }

        let last = self.repo().get_last_notify_time(&sub.id).unwrap_or_else(|e| {
            warn!(subscription_id = %sub.id, error = %e, "cooldown read failed, treating as never notified");
            None
        });
        if is_in_cooldown(last, sub.notify_interval_minutes, now) {
            return Delivery::Cooldown;
        }

        if !passes_volume_condition(&result.volume, &sub.volume_check) {
            return Delivery::Filtered;
        }

        let Some(alert) = build_alert(sub, result) else {
            return Delivery::Filtered;
        };

        let sent = tokio::time::timeout(
            self.dispatch_timeout,
            self.notifier.send(&sub.notify_target, &alert),
        )
        .await
        .unwrap_or_else(|_| {
            Err(WatchError::Timeout {
                what: format!("dispatch to {}", sub.notify_target),
            })
        });

        match sent {
            Ok(()) => {
                let ttl = record_ttl(sub.notify_interval_minutes, self.cooldown_floor_hours);
                if let Err(e) = self.repo().set_last_notify_time(&sub.id, now, ttl) {
                    error!(subscription_id = %sub.id, error = %e, "failed to record notification time");
                }
                info!(
                    subscription_id = %sub.id,
                    user_id = %sub.user_id,
                    crossing = %alert.crossing_type,
                    price = result.current_price,
                    "alert sent"
                );
                Delivery::Sent
            }
            Err(e) => {
                error!(subscription_id = %sub.id, error = %e, "alert dispatch failed");
                Delivery::Failed
            }
        }
    }
}

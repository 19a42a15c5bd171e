//! Per-user channel-crossing subscriptions.
//!
//! `NewSubscription` is the create request (defaults applied for unset or
//! non-positive values); `SubscriptionPatch` is a partial update where every
//! `None` field is left untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::condition::{VolumeCheckConfig, VolumeCheckMode};
use crate::domain::error::WatchError;

pub const DEFAULT_NOTIFY_INTERVAL_MINUTES: u32 = 60;
pub const DEFAULT_VOLUME_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_VOLUME_AVG_PERIOD: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub enabled: bool,
    /// Opaque notification channel identifier (a chat id for Telegram).
    pub notify_target: String,
    pub notify_interval_minutes: u32,
    pub volume_check: VolumeCheckConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSubscription {
    pub user_id: String,
    pub symbol: String,
    pub notify_target: String,
    pub notify_interval_minutes: i64,
    pub enable_volume_check: bool,
    pub volume_check_mode: String,
    pub volume_fixed_value: f64,
    pub volume_multiplier: f64,
    pub volume_avg_period: i64,
}

impl NewSubscription {
    /// Fill unset or non-positive fields with their defaults.
    pub fn apply_defaults(&mut self) {
        if self.notify_interval_minutes <= 0 {
            self.notify_interval_minutes = DEFAULT_NOTIFY_INTERVAL_MINUTES as i64;
        }
        if self.volume_check_mode.trim().is_empty() {
            self.volume_check_mode = VolumeCheckMode::Multiplier.to_string();
        }
        if self.volume_multiplier <= 0.0 {
            self.volume_multiplier = DEFAULT_VOLUME_MULTIPLIER;
        }
        if self.volume_avg_period <= 0 {
            self.volume_avg_period = DEFAULT_VOLUME_AVG_PERIOD as i64;
        }
    }

    /// Validate, apply defaults and build an enabled subscription.
    pub fn into_subscription(
        mut self,
        id: String,
        now: DateTime<Utc>,
    ) -> Result<Subscription, WatchError> {
        for (name, value) in [
            ("userId", &self.user_id),
            ("symbol", &self.symbol),
            ("notifyTarget", &self.notify_target),
        ] {
            if value.trim().is_empty() {
                return Err(WatchError::InvalidSubscription {
                    reason: format!("{} is required", name),
                });
            }
        }

        self.apply_defaults();

        let notify_interval_minutes = u32::try_from(self.notify_interval_minutes).map_err(|_| {
            WatchError::InvalidSubscription {
                reason: "notifyIntervalMinutes is out of range".into(),
            }
        })?;

        Ok(Subscription {
            id,
            user_id: self.user_id.trim().to_string(),
            symbol: self.symbol.trim().to_uppercase(),
            enabled: true,
            notify_target: self.notify_target.trim().to_string(),
            notify_interval_minutes,
            volume_check: VolumeCheckConfig {
                enabled: self.enable_volume_check,
                mode: VolumeCheckMode::from(self.volume_check_mode.trim()),
                fixed_value: self.volume_fixed_value,
                multiplier: self.volume_multiplier,
                avg_period: self.volume_avg_period as usize,
            },
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionPatch {
    pub enabled: Option<bool>,
    pub notify_target: Option<String>,
    pub notify_interval_minutes: Option<u32>,
    pub enable_volume_check: Option<bool>,
    pub volume_check_mode: Option<VolumeCheckMode>,
    pub volume_fixed_value: Option<f64>,
    pub volume_multiplier: Option<f64>,
    pub volume_avg_period: Option<usize>,
}

impl SubscriptionPatch {
    pub fn is_empty(&self) -> bool {
        *self == SubscriptionPatch::default()
    }

    /// Overwrite every field present in the patch and bump `updated_at`.
    ///
    /// Rejects values that would break the interval/avg-period invariants;
    /// on error the subscription is left unchanged.
    pub fn apply(&self, sub: &mut Subscription, now: DateTime<Utc>) -> Result<(), WatchError> {
        if self.notify_interval_minutes == Some(0) {
            return Err(WatchError::InvalidSubscription {
                reason: "notifyIntervalMinutes must be positive".into(),
            });
        }
        if self.volume_avg_period == Some(0) {
            return Err(WatchError::InvalidSubscription {
                reason: "volumeAvgPeriod must be positive".into(),
            });
        }

        if let Some(enabled) = self.enabled {
            sub.enabled = enabled;
        }
        if let Some(target) = &self.notify_target {
            sub.notify_target = target.clone();
        }
        if let Some(minutes) = self.notify_interval_minutes {
            sub.notify_interval_minutes = minutes;
        }
        if let Some(enabled) = self.enable_volume_check {
            sub.volume_check.enabled = enabled;
        }
        if let Some(mode) = &self.volume_check_mode {
            sub.volume_check.mode = mode.clone();
        }
        if let Some(value) = self.volume_fixed_value {
            sub.volume_check.fixed_value = value;
        }
        if let Some(mult) = self.volume_multiplier {
            sub.volume_check.multiplier = mult;
        }
        if let Some(period) = self.volume_avg_period {
            sub.volume_check.avg_period = period;
        }

        sub.updated_at = now;
        Ok(())
    }
}

//! Minimum interval between two notifications for the same subscription.

use chrono::{DateTime, Duration, Utc};

/// Floor for how long a last-notified record is kept. Records are keyed by
/// subscription id and outlive the subscription; they age out after this.
pub const DEFAULT_RECORD_TTL_HOURS: i64 = 24;

/// `true` while `now - last_notified < interval`. A missing record is never in cooldown.
pub fn is_in_cooldown(
    last_notified: Option<DateTime<Utc>>,
    interval_minutes: u32,
    now: DateTime<Utc>,
) -> bool {
    match last_notified {
        Some(last) => now.signed_duration_since(last) < Duration::minutes(interval_minutes as i64),
        None => false,
    }
}

/// TTL for a cooldown record: at least the interval itself, never below `floor_hours`.
pub fn record_ttl(interval_minutes: u32, floor_hours: i64) -> std::time::Duration {
    let interval = Duration::minutes(interval_minutes as i64);
    let floor = Duration::hours(floor_hours.max(0));
    interval
        .max(floor)
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(3600 * DEFAULT_RECORD_TTL_HOURS as u64))
}

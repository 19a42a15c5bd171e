//! Notification delivery port trait.

use async_trait::async_trait;

use crate::domain::alert::AlertPayload;
use crate::domain::error::WatchError;

#[async_trait]
pub trait NotifierPort: Send + Sync {
    /// Deliver one alert to `target`. Callers do not retry on failure.
    async fn send(&self, target: &str, alert: &AlertPayload) -> Result<(), WatchError>;
}

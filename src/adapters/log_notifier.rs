//! Notifier that only writes alerts to the log.

use async_trait::async_trait;

use crate::domain::alert::AlertPayload;
use crate::domain::error::WatchError;
use crate::ports::notifier_port::NotifierPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotifierPort for LogNotifier {
    async fn send(&self, target: &str, alert: &AlertPayload) -> Result<(), WatchError> {
        tracing::info!(
            target_id = %target,
            symbol = %alert.symbol,
            crossing = %alert.crossing_type,
            title = %alert.title,
            body = %alert.body,
            "alert"
        );
        Ok(())
    }
}

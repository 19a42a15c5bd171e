//! Telegram Bot API notifier.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::alert::AlertPayload;
use crate::domain::error::WatchError;
use crate::ports::config_port::ConfigPort;
use crate::ports::notifier_port::NotifierPort;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: String,
}

pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    test_mode: bool,
}

impl TelegramNotifier {
    /// An empty token forces test mode: messages are logged, never sent.
    pub fn new(
        api_url: &str,
        bot_token: &str,
        test_mode: bool,
        timeout: Duration,
    ) -> Result<Self, WatchError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            WatchError::Dispatch {
                target: "telegram".into(),
                reason: format!("failed to build HTTP client: {}", e),
            }
        })?;

        let bot_token = bot_token.trim().to_string();
        let test_mode = if test_mode {
            tracing::info!("telegram notifier running in test mode (log only)");
            true
        } else if bot_token.is_empty() {
            tracing::warn!("no telegram bot token configured, notifications will be logged only");
            true
        } else {
            false
        };

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token,
            test_mode,
        })
    }

    pub fn from_config(config: &dyn ConfigPort, timeout: Duration) -> Result<Self, WatchError> {
        let api_url = config
            .get_non_empty("telegram", "api_url")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let bot_token = config.get_non_empty("telegram", "bot_token").unwrap_or_default();
        let test_mode = config.get_bool("telegram", "test_mode", false);
        Self::new(&api_url, &bot_token, test_mode, timeout)
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), WatchError> {
        if self.test_mode {
            tracing::info!(
                chat_id = %preview(chat_id),
                message = %text,
                "[test mode] would send telegram message"
            );
            return Ok(());
        }

        let dispatch_err = |reason: String| WatchError::Dispatch {
            target: chat_id.to_string(),
            reason,
        };

        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await
            .map_err(|e| dispatch_err(format!("request failed: {}", e.without_url())))?;

        let body = response
            .text()
            .await
            .map_err(|e| dispatch_err(format!("failed to read response: {}", e)))?;
        let api: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| dispatch_err(format!("failed to parse response: {}", e)))?;

        if !api.ok {
            tracing::error!(chat_id, error = %api.description, "telegram API error");
            return Err(dispatch_err(format!("telegram API error: {}", api.description)));
        }

        tracing::info!(chat_id = %preview(chat_id), "telegram message sent");
        Ok(())
    }
}

fn preview(chat_id: &str) -> String {
    match chat_id.char_indices().nth(10) {
        Some((idx, _)) => format!("{}...", &chat_id[..idx]),
        None => chat_id.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render an alert as Telegram HTML: bold title, body, then a details block.
pub fn format_message(alert: &AlertPayload) -> String {
    let mut text = format!(
        "<b>{}</b>\n\n{}\n\n📊 <b>Details</b>\n├ Symbol: <code>{}</code>\n├ Price: <code>{:.2}</code>\n├ Upper: <code>{:.2}</code>\n",
        escape_html(&alert.title),
        escape_html(&alert.body),
        escape_html(&alert.symbol),
        alert.current_price,
        alert.upper_band,
    );
    match &alert.volume {
        Some(v) => text.push_str(&format!(
            "├ Lower: <code>{:.2}</code>\n└ Volume: <code>{:.2}</code> ({:.1}x avg)",
            alert.lower_band, v.current_volume, v.ratio
        )),
        None => text.push_str(&format!("└ Lower: <code>{:.2}</code>", alert.lower_band)),
    }
    text
}

#[async_trait]
impl NotifierPort for TelegramNotifier {
    async fn send(&self, target: &str, alert: &AlertPayload) -> Result<(), WatchError> {
        self.send_text(target, &format_message(alert)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::alert::VolumeSummary;
    use crate::domain::indicator::CrossingType;
    use mockito::Matcher;
    use serde_json::json;

    fn alert() -> AlertPayload {
        AlertPayload {
            title: "🚨 BTC broke above upper band 📈".into(),
            body: "price 115.00 | upper 110.00 | lower 90.00".into(),
            symbol: "BTC".into(),
            crossing_type: CrossingType::AboveUpper,
            current_price: 115.0,
            upper_band: 110.0,
            lower_band: 90.0,
            volume: None,
        }
    }

    fn notifier(url: &str) -> TelegramNotifier {
        TelegramNotifier::new(url, "123:abc", false, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn empty_token_forces_test_mode() {
        let config = FileConfigAdapter::from_string("[telegram]\ntest_mode = false\n").unwrap();
        let n = TelegramNotifier::from_config(&config, Duration::from_secs(1)).unwrap();
        assert!(n.is_test_mode());
    }

    #[test]
    fn message_has_bold_title_and_details() {
        let text = format_message(&alert());
        assert!(text.starts_with("<b>🚨 BTC broke above upper band 📈</b>\n\n"));
        assert!(text.contains("Symbol: <code>BTC</code>"));
        assert!(text.contains("Upper: <code>110.00</code>"));
        assert!(text.ends_with("└ Lower: <code>90.00</code>"));
    }

    #[test]
    fn message_includes_volume_when_present() {
        let mut a = alert();
        a.volume = Some(VolumeSummary {
            current_volume: 250.0,
            avg_volume: 100.0,
            ratio: 2.5,
        });
        let text = format_message(&a);
        assert!(text.ends_with("└ Volume: <code>250.00</code> (2.5x avg)"));
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn chat_id_preview_truncates() {
        assert_eq!(preview("12345"), "12345");
        assert_eq!(preview("-1001234567890"), "-100123456...");
    }

    #[tokio::test]
    async fn test_mode_never_calls_api() {
        let n = TelegramNotifier::new("http://127.0.0.1:9", "", false, Duration::from_secs(1))
            .unwrap();
        n.send("42", &alert()).await.unwrap();
    }

    #[tokio::test]
    async fn posts_html_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(json!({
                "chat_id": "42",
                "parse_mode": "HTML"
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create_async()
            .await;

        notifier(&server.url()).send("42", &alert()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_rejection_is_dispatch_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(400)
            .with_body(r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
            .create_async()
            .await;

        let err = notifier(&server.url()).send("42", &alert()).await.unwrap_err();
        match err {
            WatchError::Dispatch { target, reason } => {
                assert_eq!(target, "42");
                assert!(reason.contains("chat not found"));
            }
            other => panic!("expected Dispatch, got: {other}"),
        }
    }
}

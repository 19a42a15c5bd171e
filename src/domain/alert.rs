//! Alert payloads sent to subscribers when the price leaves the channel.

use serde::{Deserialize, Serialize};

use crate::domain::indicator::{CrossingType, IndicatorResult};
use crate::domain::subscription::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSummary {
    pub current_volume: f64,
    pub avg_volume: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub title: String,
    pub body: String,
    pub symbol: String,
    pub crossing_type: CrossingType,
    pub current_price: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeSummary>,
}

fn direction_text(crossing: CrossingType) -> &'static str {
    match crossing {
        CrossingType::AboveUpper => "broke above upper band 📈",
        CrossingType::BelowLower => "broke below lower band 📉",
    }
}

/// Build the payload for one subscriber. Returns `None` when the result has no crossing.
///
/// The volume clause is only appended when the subscriber has the volume check
/// enabled and a non-zero current volume was measured.
pub fn build_alert(sub: &Subscription, result: &IndicatorResult) -> Option<AlertPayload> {
    let crossing = result.crossing()?;

    let mut body = format!(
        "price {:.2} | upper {:.2} | lower {:.2}",
        result.current_price, result.channel.upper_band, result.channel.lower_band
    );

    let volume = if sub.volume_check.enabled && result.volume.current_volume > 0.0 {
        body.push_str(&format!(
            " | volume {:.2} ({:.1}x)",
            result.volume.current_volume, result.volume.ratio
        ));
        Some(VolumeSummary {
            current_volume: result.volume.current_volume,
            avg_volume: result.volume.avg_volume,
            ratio: result.volume.ratio,
        })
    } else {
        None
    };

    Some(AlertPayload {
        title: format!("🚨 {} {}", result.symbol, direction_text(crossing)),
        body,
        symbol: result.symbol.clone(),
        crossing_type: crossing,
        current_price: result.current_price,
        upper_band: result.channel.upper_band,
        lower_band: result.channel.lower_band,
        volume,
    })
}

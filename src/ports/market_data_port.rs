//! Market data access port trait.

use async_trait::async_trait;

use crate::domain::error::WatchError;
use crate::domain::kline::Kline;
use crate::domain::quote::PriceQuote;

/// Source of klines and live quotes for bare symbols (e.g. "BTC").
///
/// Implementations map the symbol to their own pair naming and surface every
/// network, payload or upstream failure as a `WatchError`.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Most recent `limit` klines for `interval`, oldest first.
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Kline>, WatchError>;

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, WatchError>;

    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, WatchError> {
        Ok(self.fetch_quote(symbol).await?.price)
    }
}

//! Domain error types.

/// Top-level error type for lrcwatch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("fetch failed for {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },

    #[error("upstream error {code}: {message}")]
    UpstreamApi { code: i64, message: String },

    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error("insufficient data: have {have} points, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("degenerate regression fit (zero denominator)")]
    DegenerateFit,

    #[error("persistence error: {reason}")]
    Persistence { reason: String },

    #[error("dispatch to {target} failed: {reason}")]
    Dispatch { target: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("subscription not found: {id}")]
    SubscriptionNotFound { id: String },

    #[error("invalid subscription: {reason}")]
    InvalidSubscription { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WatchError {
    pub fn fetch(symbol: &str, reason: impl ToString) -> Self {
        WatchError::Fetch {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(reason: impl ToString) -> Self {
        WatchError::Persistence {
            reason: reason.to_string(),
        }
    }

    /// Network, upstream or timeout failures talking to the market-data source.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            WatchError::Fetch { .. } | WatchError::UpstreamApi { .. } | WatchError::Timeout { .. }
        )
    }

    /// Channel computation failures.
    pub fn is_computation(&self) -> bool {
        matches!(
            self,
            WatchError::InsufficientData { .. } | WatchError::DegenerateFit
        )
    }
}

impl From<&WatchError> for std::process::ExitCode {
    fn from(err: &WatchError) -> Self {
        let code: u8 = match err {
            WatchError::Io(_) => 1,
            WatchError::ConfigParse { .. }
            | WatchError::ConfigMissing { .. }
            | WatchError::ConfigInvalid { .. } => 2,
            WatchError::Persistence { .. } => 3,
            WatchError::SubscriptionNotFound { .. } | WatchError::InvalidSubscription { .. } => 4,
            WatchError::Fetch { .. }
            | WatchError::UpstreamApi { .. }
            | WatchError::Timeout { .. }
            | WatchError::InsufficientData { .. }
            | WatchError::DegenerateFit => 5,
            WatchError::Dispatch { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

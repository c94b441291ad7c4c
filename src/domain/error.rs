//! Domain error types.

/// Top-level error type for momotrader.
#[derive(Debug, thiserror::Error)]
pub enum MomotraderError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no 1m data for {symbol}")]
    NoData { symbol: String },

    #[error("bar/signal misalignment for {symbol}: {bars} bars, {signals} signals")]
    SignalMismatch {
        symbol: String,
        bars: usize,
        signals: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MomotraderError> for std::process::ExitCode {
    fn from(err: &MomotraderError) -> Self {
        let code: u8 = match err {
            MomotraderError::Io(_) => 1,
            MomotraderError::ConfigParse { .. }
            | MomotraderError::ConfigMissing { .. }
            | MomotraderError::ConfigInvalid { .. } => 2,
            MomotraderError::Data { .. } => 3,
            MomotraderError::NoData { .. } => 4,
            MomotraderError::SignalMismatch { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

//! 1-minute OHLCV bar representation.

use chrono::{DateTime, Utc};

/// One minute of market data. `time` is the bar's open timestamp in UTC;
/// a well-formed series has strictly increasing, unique timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct MinuteBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl MinuteBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

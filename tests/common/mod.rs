//! Shared helpers for integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;

use momotrader::domain::bar::MinuteBar;
use momotrader::domain::error::MomotraderError;
use momotrader::domain::signal::StrategyParams;
use momotrader::ports::data_port::DataPort;

pub fn minute(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(i)
}

pub fn make_bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> MinuteBar {
    MinuteBar {
        time: minute(i),
        open,
        high,
        low,
        close,
        volume: 1.0,
    }
}

pub fn flat_bars(n: i64, price: f64) -> Vec<MinuteBar> {
    (0..n).map(|i| make_bar(i, price, price, price, price)).collect()
}

/// Parameters with spans short enough for a five-bar setup.
pub fn short_span_params() -> StrategyParams {
    StrategyParams {
        ema_fast_1m: 2,
        ema_slow_1m: 4,
        mid_minutes: 3,
        ema_fast_mid: 1,
        ema_slow_mid: 3,
        atr_period_mid: 3,
        trend_minutes: [15, 30, 60],
        ema_trend_long: 50,
        atr_mult_stop: 1.0,
        tp_rr: 1.0,
        ..StrategyParams::default()
    }
}

/// Five 1-minute bars engineered so the fast/slow EMA pair crosses upward
/// on bar index 3 with the trend vote, medium EMA order, and both quality
/// gates satisfied, and the take level is touched on bar index 4.
pub fn engineered_upcross_bars() -> Vec<MinuteBar> {
    vec![
        make_bar(0, 100.0, 100.0, 100.0, 100.0),
        make_bar(1, 100.0, 100.0, 100.0, 100.0),
        make_bar(2, 100.0, 100.0, 100.0, 100.0),
        make_bar(3, 100.0, 105.5, 100.0, 105.0),
        make_bar(4, 105.0, 112.0, 100.0, 104.0),
    ]
}

/// In-memory data port serving canned bar series.
pub struct MockDataPort {
    bars: HashMap<String, Vec<MinuteBar>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        MockDataPort {
            bars: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<MinuteBar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MinuteBar>, MomotraderError> {
        let bars = self.bars.get(symbol).ok_or_else(|| MomotraderError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.time >= start && b.time <= end)
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, MomotraderError> {
        let mut symbols: Vec<String> = self.bars.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

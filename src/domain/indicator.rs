//! Indicator primitives: EMA, true range, ATR, OHLCV resampling.
//!
//! EMA is the unadjusted recursive form: k = 2/(span+1), the first output
//! equals the first input, then out[t] = x[t]*k + out[t-1]*(1-k). No warmup
//! window is discarded. ATR is the EMA of the true-range series.

use chrono::Duration;

use super::bar::MinuteBar;

/// Streaming exponential moving average accumulator.
///
/// `span` must be >= 1 (enforced by config validation upstream).
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    state: Option<f64>,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        Ema {
            alpha: 2.0 / (span as f64 + 1.0),
            state: None,
        }
    }

    /// Feed one value and return the smoothed output.
    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.state {
            None => x,
            Some(prev) => x * self.alpha + prev * (1.0 - self.alpha),
        };
        self.state = Some(next);
        next
    }
}

/// EMA over a whole series. Output length equals input length.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut acc = Ema::new(span);
    values.iter().map(|&x| acc.update(x)).collect()
}

/// Streaming average-true-range accumulator: EMA(period) of the true range.
/// The first bar has no previous close, so its true range is high - low.
#[derive(Debug, Clone)]
pub struct Atr {
    ema: Ema,
    prev_close: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Atr {
            ema: Ema::new(period),
            prev_close: None,
        }
    }

    pub fn update(&mut self, bar: &MinuteBar) -> f64 {
        let tr = match self.prev_close {
            None => bar.high - bar.low,
            Some(pc) => bar.true_range(pc),
        };
        self.prev_close = Some(bar.close);
        self.ema.update(tr)
    }
}

/// ATR over a whole bar series. Output length equals input length.
pub fn atr(bars: &[MinuteBar], period: usize) -> Vec<f64> {
    let mut acc = Atr::new(period);
    bars.iter().map(|bar| acc.update(bar)).collect()
}

/// Aggregate 1-minute bars into fixed-width, right-open buckets aligned to
/// the Unix epoch. open = first open, high = max, low = min, close = last
/// close, volume = sum. Buckets containing no input bars are dropped, so
/// the output may have gaps. Input must be sorted by time.
pub fn resample_ohlcv(bars: &[MinuteBar], bucket_minutes: u32) -> Vec<MinuteBar> {
    let width = i64::from(bucket_minutes) * 60;
    let mut out: Vec<MinuteBar> = Vec::new();

    for bar in bars {
        let rem = bar.time.timestamp().rem_euclid(width);
        let bucket_start = bar.time - Duration::seconds(rem);

        match out.last_mut() {
            Some(current) if current.time == bucket_start => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => out.push(MinuteBar {
                time: bucket_start,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            }),
        }
    }

    out
}

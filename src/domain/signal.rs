//! Multi-timeframe momentum signal generation.
//!
//! Derived timeframes are built with [`resample_ohlcv`] and broadcast back
//! onto the 1-minute grid with [`carry_forward`]. A nonzero signal needs
//! four conditions on the same bar: a majority trend vote across the three
//! long timeframes, agreeing fast/slow EMA order on the medium timeframe,
//! a strict fast/slow crossover on the 1-minute EMAs, and both quality
//! gates (ATR% floor, EMA-gap% floor).

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::align::carry_forward;
use super::bar::MinuteBar;
use super::indicator::{atr, ema, resample_ohlcv};

/// Strategy parameters. Spans are in bars of the respective timeframe,
/// timeframe widths in minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyParams {
    pub ema_fast_1m: usize,
    pub ema_slow_1m: usize,
    pub mid_minutes: u32,
    pub ema_fast_mid: usize,
    pub ema_slow_mid: usize,
    pub atr_period_mid: usize,
    pub trend_minutes: [u32; 3],
    pub ema_trend_long: usize,
    pub atr_mult_stop: f64,
    pub tp_rr: f64,
    pub min_atr_pct: f64,
    pub min_ema_gap_pct: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            ema_fast_1m: 9,
            ema_slow_1m: 21,
            mid_minutes: 3,
            ema_fast_mid: 21,
            ema_slow_mid: 55,
            atr_period_mid: 14,
            trend_minutes: [15, 30, 60],
            ema_trend_long: 200,
            atr_mult_stop: 2.0,
            tp_rr: 1.5,
            min_atr_pct: 0.0012,
            min_ema_gap_pct: 0.0004,
        }
    }
}

/// One decision per 1-minute bar. `stop`/`take` are set exactly when
/// `signal` is nonzero.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub time: DateTime<Utc>,
    pub signal: i8,
    pub stop: Option<f64>,
    pub take: Option<f64>,
}

/// Aligned per-timeframe indicator columns on the 1-minute grid.
struct AlignedColumns {
    fast_1m: Vec<f64>,
    slow_1m: Vec<f64>,
    fast_mid: Vec<f64>,
    slow_mid: Vec<f64>,
    atr_mid: Vec<f64>,
    trend: [Vec<f64>; 3],
}

fn align_columns(bars: &[MinuteBar], params: &StrategyParams) -> AlignedColumns {
    let grid: Vec<DateTime<Utc>> = bars.iter().map(|b| b.time).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let mid = resample_ohlcv(bars, params.mid_minutes);
    let mid_times: Vec<DateTime<Utc>> = mid.iter().map(|b| b.time).collect();
    let mid_closes: Vec<f64> = mid.iter().map(|b| b.close).collect();

    let trend = params.trend_minutes.map(|width| {
        let frame = resample_ohlcv(bars, width);
        let times: Vec<DateTime<Utc>> = frame.iter().map(|b| b.time).collect();
        let closes: Vec<f64> = frame.iter().map(|b| b.close).collect();
        carry_forward(&grid, &times, &ema(&closes, params.ema_trend_long))
    });

    AlignedColumns {
        fast_1m: ema(&closes, params.ema_fast_1m),
        slow_1m: ema(&closes, params.ema_slow_1m),
        fast_mid: carry_forward(&grid, &mid_times, &ema(&mid_closes, params.ema_fast_mid)),
        slow_mid: carry_forward(&grid, &mid_times, &ema(&mid_closes, params.ema_slow_mid)),
        atr_mid: carry_forward(&grid, &mid_times, &atr(&mid, params.atr_period_mid)),
        trend,
    }
}

/// Generate one [`SignalRow`] per input bar. Output length always equals
/// input length; an empty input yields an empty signal stream.
pub fn generate_signals(bars: &[MinuteBar], params: &StrategyParams) -> Vec<SignalRow> {
    let cols = align_columns(bars, params);
    let mut out = Vec::with_capacity(bars.len());

    for (t, bar) in bars.iter().enumerate() {
        let close = bar.close;

        // NaN columns (grid points before the first derived bucket) fail
        // every comparison, so those bars stay flat.
        let votes_long = cols
            .trend
            .iter()
            .filter(|line| close > line[t])
            .count();
        let votes_short = cols
            .trend
            .iter()
            .filter(|line| close < line[t])
            .count();

        let long_trend = cols.fast_mid[t] > cols.slow_mid[t] && votes_long >= 2;
        let short_trend = cols.fast_mid[t] < cols.slow_mid[t] && votes_short >= 2;

        let cross_up = t > 0
            && cols.fast_1m[t] > cols.slow_1m[t]
            && cols.fast_1m[t - 1] <= cols.slow_1m[t - 1];
        let cross_down = t > 0
            && cols.fast_1m[t] < cols.slow_1m[t]
            && cols.fast_1m[t - 1] >= cols.slow_1m[t - 1];

        let atr_mid = cols.atr_mid[t];
        let vol_ok = atr_mid / close >= params.min_atr_pct;
        let gap_ok = (cols.fast_1m[t] - cols.slow_1m[t]).abs() / close >= params.min_ema_gap_pct;

        let signal: i8 = if long_trend && cross_up && vol_ok && gap_ok {
            1
        } else if short_trend && cross_down && vol_ok && gap_ok {
            -1
        } else {
            0
        };

        let (stop, take) = if signal != 0 {
            let stop_dist = params.atr_mult_stop * atr_mid;
            let take_dist = params.tp_rr * stop_dist;
            let dir = f64::from(signal);
            (
                Some(close - dir * stop_dist),
                Some(close + dir * take_dist),
            )
        } else {
            (None, None)
        };

        out.push(SignalRow {
            time: bar.time,
            signal,
            stop,
            take,
        });
    }

    out
}

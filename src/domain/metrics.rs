//! Performance statistics over an equity curve and trade count.
//!
//! Sharpe and CAGR are computed on a calendar-day resample of the curve
//! (last value per day, gap days forward-filled); max drawdown uses the
//! full minute-resolution curve. Everything is recomputed from scratch on
//! each call, no incremental state.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

const DAYS_PER_YEAR: f64 = 365.0;
const MIN_DAILY_OBSERVATIONS: usize = 3;

/// One equity sample per input bar.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub time: DateTime<Utc>,
    pub equity: f64,
}

/// Scalar performance report for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub final_equity: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub n_trades: usize,
}

impl MetricsRecord {
    /// The degenerate record for an empty run.
    pub fn zeroed(initial_equity: f64) -> Self {
        MetricsRecord {
            final_equity: initial_equity,
            total_return: 0.0,
            cagr: 0.0,
            sharpe: 0.0,
            max_drawdown: 0.0,
            n_trades: 0,
        }
    }
}

/// Reduce an equity curve and trade count to a [`MetricsRecord`].
pub fn compute_metrics(
    equity_curve: &[EquityPoint],
    n_trades: usize,
    initial_equity: f64,
) -> MetricsRecord {
    if equity_curve.is_empty() {
        return MetricsRecord::zeroed(initial_equity);
    }

    let first = equity_curve[0].equity;
    let final_equity = equity_curve[equity_curve.len() - 1].equity;
    let total_return = if first > 0.0 {
        final_equity / first - 1.0
    } else {
        0.0
    };

    let daily = resample_daily(equity_curve);
    let elapsed_days = daily.len().max(1) as f64;
    let cagr = (1.0 + total_return).powf(DAYS_PER_YEAR / elapsed_days) - 1.0;

    MetricsRecord {
        final_equity,
        total_return,
        cagr,
        sharpe: sharpe_ratio(&daily),
        max_drawdown: max_drawdown(equity_curve),
        n_trades,
    }
}

/// Last equity value of each calendar day, with days that saw no bar
/// activity forward-filled, covering every day from first to last point.
fn resample_daily(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut closes: Vec<(NaiveDate, f64)> = Vec::new();
    for point in equity_curve {
        let day = point.time.date_naive();
        match closes.last_mut() {
            Some((last_day, value)) if *last_day == day => *value = point.equity,
            _ => closes.push((day, point.equity)),
        }
    }

    let mut out = Vec::new();
    let mut iter = closes.iter().peekable();
    let mut current = match iter.next() {
        Some(&(day, value)) => {
            out.push(value);
            (day, value)
        }
        None => return out,
    };
    let last_day = closes[closes.len() - 1].0;

    let mut day = current.0;
    while day < last_day {
        day = day + Duration::days(1);
        if let Some(&&(next_day, value)) = iter.peek() {
            if next_day == day {
                current = (next_day, value);
                iter.next();
            }
        }
        out.push(current.1);
    }

    out
}

/// Annualized mean/stdev of day-over-day returns. Zero when fewer than
/// three daily observations exist or the (sample) stdev is zero.
fn sharpe_ratio(daily: &[f64]) -> f64 {
    if daily.len() < MIN_DAILY_OBSERVATIONS {
        return 0.0;
    }

    let returns: Vec<f64> = daily
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        (mean / stddev) * DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// Minimum of equity / running-peak - 1 over the curve; always <= 0.
fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for point in equity_curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            worst = worst.min(point.equity / peak - 1.0);
        }
    }
    worst
}

//! Random parameter search with an in-sample/out-of-sample split.
//!
//! Each trial draws a parameter set from a fixed grid, backtests every
//! symbol on both windows, and is scored by in-sample Sharpe plus half the
//! out-of-sample Sharpe, penalized for deep drawdowns and thin trade
//! counts. Draws come from a seeded RNG so a search is reproducible.

use rand::rngs::StdRng;
use rand::Rng;

use super::bar::MinuteBar;
use super::error::MomotraderError;
use super::metrics::MetricsRecord;
use super::signal::StrategyParams;
use super::simulation::{run_symbol, SimConfig};

const NO_RESULT_SCORE: f64 = -1e9;
const MIN_TRADES: f64 = 120.0;

/// One symbol's bars split into the two evaluation windows.
#[derive(Debug, Clone)]
pub struct SearchData {
    pub symbol: String,
    pub is_bars: Vec<MinuteBar>,
    pub oos_bars: Vec<MinuteBar>,
}

/// One scored parameter draw.
#[derive(Debug, Clone)]
pub struct Trial {
    pub index: usize,
    pub score: f64,
    pub params: StrategyParams,
    pub is_metrics: Vec<MetricsRecord>,
    pub oos_metrics: Vec<MetricsRecord>,
}

/// All trials in draw order plus the best one (highest score, earliest
/// wins ties). `best` is None when no trial produced usable metrics.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub trials: Vec<Trial>,
    pub best: Option<Trial>,
}

fn pick<T: Copy>(rng: &mut StdRng, options: &[T]) -> T {
    options[rng.gen_range(0..options.len())]
}

/// Draw a parameter set from the search grid. Timeframe widths are not
/// searched; they stay at their configured defaults.
pub fn sample_params(rng: &mut StdRng) -> StrategyParams {
    StrategyParams {
        ema_fast_1m: pick(rng, &[7, 9, 12]),
        ema_slow_1m: pick(rng, &[20, 21, 26, 30]),
        ema_fast_mid: pick(rng, &[13, 21, 34]),
        ema_slow_mid: pick(rng, &[34, 55, 89]),
        ema_trend_long: pick(rng, &[150, 200, 233]),
        atr_period_mid: pick(rng, &[10, 14, 20]),
        atr_mult_stop: pick(rng, &[1.5, 2.0, 2.5]),
        tp_rr: pick(rng, &[1.2, 1.5, 2.0]),
        min_atr_pct: pick(rng, &[0.0008, 0.0012, 0.0018]),
        min_ema_gap_pct: pick(rng, &[0.0002, 0.0004, 0.0008]),
        ..StrategyParams::default()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Score a trial from its per-symbol metrics. Higher is better.
pub fn score(is_metrics: &[MetricsRecord], oos_metrics: &[MetricsRecord]) -> f64 {
    if is_metrics.is_empty() || oos_metrics.is_empty() {
        return NO_RESULT_SCORE;
    }

    let sr_is = mean(is_metrics.iter().map(|m| m.sharpe));
    let sr_oos = mean(oos_metrics.iter().map(|m| m.sharpe));
    let mdd_is = mean(is_metrics.iter().map(|m| m.max_drawdown));
    let mdd_oos = mean(oos_metrics.iter().map(|m| m.max_drawdown));
    let n_trades: f64 = is_metrics.iter().map(|m| m.n_trades as f64).sum();

    let mut penalty = 0.0;
    penalty += (mdd_is.abs() - 0.25).max(0.0) * 2.0;
    penalty += (mdd_oos.abs() - 0.30).max(0.0) * 3.0;
    if n_trades < MIN_TRADES {
        penalty += (MIN_TRADES - n_trades) / 60.0;
    }

    sr_is + 0.5 * sr_oos - penalty
}

/// Run `n_trials` random draws over the split data.
pub fn run_search(
    data: &[SearchData],
    config: &SimConfig,
    n_trials: usize,
    seed: u64,
) -> Result<SearchOutcome, MomotraderError> {
    use rand::SeedableRng;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut trials = Vec::with_capacity(n_trials);
    let mut best: Option<Trial> = None;

    for index in 1..=n_trials {
        let params = sample_params(&mut rng);

        let mut is_metrics = Vec::new();
        let mut oos_metrics = Vec::new();
        for sym in data {
            if sym.is_bars.is_empty() || sym.oos_bars.is_empty() {
                continue;
            }
            let is_run = run_symbol(&sym.symbol, &sym.is_bars, &params, config)?;
            let oos_run = run_symbol(&sym.symbol, &sym.oos_bars, &params, config)?;
            is_metrics.push(is_run.metrics);
            oos_metrics.push(oos_run.metrics);
        }

        let trial = Trial {
            index,
            score: score(&is_metrics, &oos_metrics),
            params,
            is_metrics,
            oos_metrics,
        };

        let improved = match &best {
            Some(b) => trial.score > b.score,
            None => trial.score > NO_RESULT_SCORE,
        };
        if improved {
            best = Some(trial.clone());
        }
        trials.push(trial);
    }

    Ok(SearchOutcome { trials, best })
}

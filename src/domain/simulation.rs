//! Bar-by-bar position simulation.
//!
//! One symbol per run, bars and signal rows index-aligned 1:1, processed
//! strictly in timestamp order. Per bar: mark-to-market, then exit test,
//! then entry gating, then entry. The exit test is conservative: when a
//! bar touches both levels the stop is assumed to fill first. Identical
//! inputs produce bit-identical outputs.

use std::collections::BTreeSet;

use chrono::Timelike;

use super::bar::MinuteBar;
use super::error::MomotraderError;
use super::metrics::{compute_metrics, EquityPoint, MetricsRecord};
use super::position::{Position, Trade};
use super::signal::{generate_signals, SignalRow, StrategyParams};

/// Per-side fee rates as fractions of filled notional. All simulated
/// fills are market orders, so only the taker rate is charged.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeConfig {
    pub taker: f64,
    pub maker: f64,
}

/// Execution parameters for a simulation run. Passed by value into each
/// run; nothing is shared or mutated across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub initial_equity: f64,
    pub fees: FeeConfig,
    pub slippage_ticks: u32,
    pub tick_size: f64,
    pub risk_per_trade: f64,
    pub max_leverage: f64,
    pub cooldown_bars: u32,
    /// Hours of day (UTC) during which entries may open; empty means
    /// unrestricted. Exits are never gated.
    pub allowed_hours: BTreeSet<u32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            initial_equity: 10_000.0,
            fees: FeeConfig {
                taker: 0.0004,
                maker: 0.0002,
            },
            slippage_ticks: 1,
            tick_size: 0.1,
            risk_per_trade: 0.005,
            max_leverage: 5.0,
            cooldown_bars: 0,
            allowed_hours: BTreeSet::new(),
        }
    }
}

/// Worsen a decision price by the configured tick slippage: buys fill
/// higher, sells fill lower.
pub fn apply_slippage(price: f64, buying: bool, config: &SimConfig) -> f64 {
    let adj = f64::from(config.slippage_ticks) * config.tick_size;
    if buying { price + adj } else { price - adj }
}

/// Output triple of one symbol run.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRun {
    pub symbol: String,
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub metrics: MetricsRecord,
}

/// Run the state machine over index-aligned bars and signals.
///
/// Returns one [`EquityPoint`] per bar and zero or more [`Trade`]s with
/// non-overlapping intervals. Empty input yields the degenerate result.
pub fn simulate(
    symbol: &str,
    bars: &[MinuteBar],
    signals: &[SignalRow],
    config: &SimConfig,
) -> Result<SymbolRun, MomotraderError> {
    if bars.len() != signals.len() {
        return Err(MomotraderError::SignalMismatch {
            symbol: symbol.to_string(),
            bars: bars.len(),
            signals: signals.len(),
        });
    }

    let mut equity = config.initial_equity;
    let mut curve: Vec<EquityPoint> = Vec::with_capacity(bars.len());
    let mut trades: Vec<Trade> = Vec::new();
    let mut position: Option<Position> = None;
    let mut entry_fee = 0.0_f64;
    let mut cooldown_until: Option<usize> = None;

    for (idx, bar) in bars.iter().enumerate() {
        // 1. mark-to-market at the close
        let marked = match &position {
            Some(pos) => equity + pos.unrealized_pnl(bar.close),
            None => equity,
        };
        curve.push(EquityPoint {
            time: bar.time,
            equity: marked,
        });

        // 2. exit test against the bar's range, stop first
        if let Some(pos) = &position {
            let exit_px = if pos.is_long() {
                if bar.low <= pos.stop {
                    Some(pos.stop)
                } else if bar.high >= pos.take {
                    Some(pos.take)
                } else {
                    None
                }
            } else if bar.high >= pos.stop {
                Some(pos.stop)
            } else if bar.low <= pos.take {
                Some(pos.take)
            } else {
                None
            };

            if let Some(px) = exit_px {
                let filled = apply_slippage(px, !pos.is_long(), config);
                let exit_fee = (filled * pos.qty).abs() * config.fees.taker;
                let pnl = (filled - pos.entry_price) * pos.qty - exit_fee;
                equity += pnl;
                trades.push(Trade {
                    open_time: pos.entry_time,
                    close_time: bar.time,
                    side: pos.side(),
                    entry: pos.entry_price,
                    exit: filled,
                    qty: pos.qty.abs(),
                    pnl,
                    fee: entry_fee + exit_fee,
                    symbol: symbol.to_string(),
                    stop: pos.stop,
                    take: pos.take,
                });
                position = None;
                entry_fee = 0.0;
                if config.cooldown_bars > 0 {
                    cooldown_until = Some(idx + config.cooldown_bars as usize);
                }
                // no new entry on the exit bar
                continue;
            }
        }

        if position.is_some() {
            continue;
        }

        // 3. entry gating
        if let Some(until) = cooldown_until {
            if idx <= until {
                continue;
            }
            cooldown_until = None;
        }
        if !config.allowed_hours.is_empty() && !config.allowed_hours.contains(&bar.time.hour()) {
            continue;
        }

        // 4. entry
        let row = &signals[idx];
        if row.signal == 0 {
            continue;
        }
        let (Some(stop), Some(take)) = (row.stop, row.take) else {
            continue;
        };
        if !stop.is_finite() || !take.is_finite() {
            continue;
        }
        let stop_dist = (bar.close - stop).abs();
        if stop_dist <= 0.0 || !stop_dist.is_finite() {
            continue;
        }

        let mut qty = config.risk_per_trade * equity / stop_dist;
        let cap = equity * config.max_leverage;
        if qty * bar.close > cap {
            qty = cap / bar.close;
        }

        let buying = row.signal > 0;
        let filled = apply_slippage(bar.close, buying, config);
        let fee = (filled * qty).abs() * config.fees.taker;
        equity -= fee;
        entry_fee = fee;
        position = Some(Position {
            symbol: symbol.to_string(),
            direction: row.signal,
            entry_price: filled,
            qty: if buying { qty } else { -qty },
            stop,
            take,
            entry_time: bar.time,
        });
    }

    let metrics = compute_metrics(&curve, trades.len(), config.initial_equity);
    Ok(SymbolRun {
        symbol: symbol.to_string(),
        equity: curve,
        trades,
        metrics,
    })
}

/// Generate the signal stream for `bars` and simulate it in one step.
pub fn run_symbol(
    symbol: &str,
    bars: &[MinuteBar],
    params: &StrategyParams,
    config: &SimConfig,
) -> Result<SymbolRun, MomotraderError> {
    let signals = generate_signals(bars, params);
    simulate(symbol, bars, &signals, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn minute(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + Duration::minutes(i)
    }

    fn bar(i: i64, high: f64, low: f64, close: f64) -> MinuteBar {
        MinuteBar {
            time: minute(i),
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    fn flat_row(i: i64) -> SignalRow {
        SignalRow {
            time: minute(i),
            signal: 0,
            stop: None,
            take: None,
        }
    }

    fn entry_row(i: i64, signal: i8, stop: f64, take: f64) -> SignalRow {
        SignalRow {
            time: minute(i),
            signal,
            stop: Some(stop),
            take: Some(take),
        }
    }

    fn frictionless() -> SimConfig {
        SimConfig {
            fees: FeeConfig {
                taker: 0.0,
                maker: 0.0,
            },
            slippage_ticks: 0,
            risk_per_trade: 0.01,
            ..SimConfig::default()
        }
    }

    #[test]
    fn empty_input_degenerate_result() {
        let run = simulate("BTCUSDT", &[], &[], &SimConfig::default()).unwrap();
        assert!(run.equity.is_empty());
        assert!(run.trades.is_empty());
        assert!((run.metrics.final_equity - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(run.metrics.n_trades, 0);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let bars = vec![bar(0, 100.0, 100.0, 100.0)];
        let result = simulate("BTCUSDT", &bars, &[], &SimConfig::default());
        assert!(matches!(
            result,
            Err(MomotraderError::SignalMismatch { bars: 1, signals: 0, .. })
        ));
    }

    #[test]
    fn no_signals_keeps_equity_flat() {
        let bars: Vec<MinuteBar> = (0..10).map(|i| bar(i, 101.0, 99.0, 100.0)).collect();
        let signals: Vec<SignalRow> = (0..10).map(flat_row).collect();
        let run = simulate("BTCUSDT", &bars, &signals, &SimConfig::default()).unwrap();

        assert_eq!(run.equity.len(), 10);
        assert!(run.trades.is_empty());
        for point in &run.equity {
            assert!((point.equity - 10_000.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn long_entry_sizing_and_fee() {
        let config = SimConfig {
            risk_per_trade: 0.01,
            ..SimConfig::default()
        };
        let bars = vec![bar(0, 100.0, 100.0, 100.0), bar(1, 100.1, 99.0, 100.1)];
        let signals = vec![entry_row(0, 1, 98.0, 103.0), flat_row(1)];
        let run = simulate("BTCUSDT", &bars, &signals, &config).unwrap();

        // stop distance 2 → qty = 0.01*10000/2 = 50; fill 100.1 with one
        // 0.1 tick; entry fee = 100.1*50*0.0004
        let fill = 100.1;
        let qty = 50.0;
        let fee = fill * qty * 0.0004;
        // bar 1 marks to market at its close
        let expected = 10_000.0 - fee + (100.1 - fill) * qty;
        assert!((run.equity[1].equity - expected).abs() < 1e-9);
        assert!(run.trades.is_empty());
    }

    #[test]
    fn leverage_cap_binds_position_size() {
        let config = SimConfig {
            risk_per_trade: 0.5,
            max_leverage: 2.0,
            ..frictionless()
        };
        // stop distance 0.5 → uncapped qty would be 10000, notional 1e6
        let bars = vec![bar(0, 100.0, 100.0, 100.0), bar(1, 100.0, 99.5, 100.0)];
        let signals = vec![entry_row(0, 1, 99.5, 101.0), flat_row(1)];
        let run = simulate("BTCUSDT", &bars, &signals, &config).unwrap();

        // capped qty = 2*10000/100 = 200, stopped out at 99.5 on bar 1
        assert_eq!(run.trades.len(), 1);
        assert!((run.trades[0].qty - 200.0).abs() < 1e-9);
        assert!((run.trades[0].pnl - (99.5 - 100.0) * 200.0).abs() < 1e-9);
    }

    #[test]
    fn long_stop_wins_over_take_same_bar() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0),
            // touches both 95 and 105
            bar(1, 106.0, 94.0, 100.0),
        ];
        let signals = vec![entry_row(0, 1, 95.0, 105.0), flat_row(1)];
        let run = simulate("BTCUSDT", &bars, &signals, &frictionless()).unwrap();

        assert_eq!(run.trades.len(), 1);
        let trade = &run.trades[0];
        assert!((trade.exit - trade.stop).abs() < f64::EPSILON);
        assert!(trade.pnl < 0.0);
    }

    #[test]
    fn short_stop_wins_over_take_same_bar() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0),
            bar(1, 106.0, 94.0, 100.0),
        ];
        let signals = vec![entry_row(0, -1, 105.0, 95.0), flat_row(1)];
        let run = simulate("ETHUSDT", &bars, &signals, &frictionless()).unwrap();

        assert_eq!(run.trades.len(), 1);
        let trade = &run.trades[0];
        assert!((trade.exit - 105.0).abs() < f64::EPSILON);
        assert!(trade.pnl < 0.0);
    }

    #[test]
    fn take_fills_when_stop_untouched() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0),
            bar(1, 105.5, 99.0, 105.0),
        ];
        let signals = vec![entry_row(0, 1, 95.0, 105.0), flat_row(1)];
        let run = simulate("BTCUSDT", &bars, &signals, &frictionless()).unwrap();

        assert_eq!(run.trades.len(), 1);
        let trade = &run.trades[0];
        assert!((trade.exit - trade.take).abs() < f64::EPSILON);
        assert!(trade.pnl > 0.0);
    }

    #[test]
    fn exit_slippage_works_against_closer() {
        let config = SimConfig {
            fees: FeeConfig { taker: 0.0, maker: 0.0 },
            slippage_ticks: 2,
            tick_size: 0.5,
            risk_per_trade: 0.01,
            ..SimConfig::default()
        };
        let bars = vec![bar(0, 100.0, 100.0, 100.0), bar(1, 110.0, 99.0, 106.0)];
        let signals = vec![entry_row(0, 1, 90.0, 105.0), flat_row(1)];
        let run = simulate("BTCUSDT", &bars, &signals, &config).unwrap();

        // long exit sells: take 105 worsens down by 1.0; entry bought at
        // close 100 worsened up by 1.0
        let trade = &run.trades[0];
        assert!((trade.entry - 101.0).abs() < f64::EPSILON);
        assert!((trade.exit - 104.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_stop_distance_skips_entry() {
        let bars = vec![bar(0, 100.0, 100.0, 100.0), bar(1, 100.0, 100.0, 100.0)];
        let signals = vec![entry_row(0, 1, 100.0, 105.0), flat_row(1)];
        let run = simulate("BTCUSDT", &bars, &signals, &frictionless()).unwrap();

        assert!(run.trades.is_empty());
        assert!((run.equity[1].equity - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trade_fee_sums_entry_and_exit() {
        let config = SimConfig {
            slippage_ticks: 0,
            risk_per_trade: 0.01,
            ..SimConfig::default()
        };
        let bars = vec![bar(0, 100.0, 100.0, 100.0), bar(1, 106.0, 100.0, 105.0)];
        let signals = vec![entry_row(0, 1, 98.0, 105.0), flat_row(1)];
        let run = simulate("BTCUSDT", &bars, &signals, &config).unwrap();

        let trade = &run.trades[0];
        let qty = 0.01 * 10_000.0 / 2.0;
        let entry_fee = 100.0 * qty * 0.0004;
        let exit_fee = 105.0 * qty * 0.0004;
        assert!((trade.fee - (entry_fee + exit_fee)).abs() < 1e-9);
        // realized pnl nets only the exit fee; the entry fee was taken
        // from equity when the position opened
        assert!((trade.pnl - ((105.0 - 100.0) * qty - exit_fee)).abs() < 1e-9);
        let final_equity = run.equity.last().unwrap().equity;
        // curve marks bar 1 before the exit settles
        assert!((final_equity - (10_000.0 - entry_fee + (105.0 - 100.0) * qty)).abs() < 1e-9);
    }

    #[test]
    fn cooldown_suppresses_reentry() {
        let config = SimConfig {
            cooldown_bars: 2,
            ..frictionless()
        };
        let bars: Vec<MinuteBar> = vec![
            bar(0, 100.0, 100.0, 100.0), // entry
            bar(1, 100.0, 94.0, 100.0),  // stop exit
            bar(2, 100.0, 100.0, 100.0), // cooldown
            bar(3, 100.0, 100.0, 100.0), // cooldown
            bar(4, 100.0, 100.0, 100.0), // eligible again
            bar(5, 100.0, 94.0, 100.0),  // stop exit
        ];
        let signals = vec![
            entry_row(0, 1, 95.0, 110.0),
            flat_row(1),
            entry_row(2, 1, 95.0, 110.0),
            entry_row(3, 1, 95.0, 110.0),
            entry_row(4, 1, 95.0, 110.0),
            flat_row(5),
        ];
        let run = simulate("BTCUSDT", &bars, &signals, &config).unwrap();

        assert_eq!(run.trades.len(), 2);
        assert_eq!(run.trades[1].open_time, minute(4));
    }

    #[test]
    fn allowed_hours_gate_entries() {
        let config = SimConfig {
            allowed_hours: BTreeSet::from([14, 15]),
            ..frictionless()
        };
        // bars run at 10:00 UTC
        let bars = vec![bar(0, 100.0, 100.0, 100.0), bar(1, 100.0, 94.0, 100.0)];
        let signals = vec![entry_row(0, 1, 95.0, 110.0), flat_row(1)];
        let run = simulate("BTCUSDT", &bars, &signals, &config).unwrap();

        assert!(run.trades.is_empty());
        assert!((run.equity[1].equity - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn one_equity_point_per_bar_with_open_position() {
        let bars: Vec<MinuteBar> = (0..6).map(|i| bar(i, 101.0, 99.5, 100.0)).collect();
        let mut signals: Vec<SignalRow> = (0..6).map(flat_row).collect();
        signals[1] = entry_row(1, 1, 90.0, 120.0); // never exits
        let run = simulate("BTCUSDT", &bars, &signals, &frictionless()).unwrap();

        assert_eq!(run.equity.len(), 6);
        assert!(run.trades.is_empty());
    }

    #[test]
    fn trade_intervals_never_overlap() {
        // alternating entry/exit pattern produces several trades
        let mut bars = Vec::new();
        let mut signals = Vec::new();
        for cycle in 0..4_i64 {
            let base = cycle * 3;
            bars.push(bar(base, 100.0, 100.0, 100.0));
            signals.push(entry_row(base, 1, 95.0, 104.0));
            bars.push(bar(base + 1, 100.0, 100.0, 100.0));
            signals.push(flat_row(base + 1));
            bars.push(bar(base + 2, 105.0, 100.0, 104.0));
            signals.push(flat_row(base + 2));
        }
        let run = simulate("BTCUSDT", &bars, &signals, &frictionless()).unwrap();

        assert_eq!(run.trades.len(), 4);
        for pair in run.trades.windows(2) {
            assert!(pair[0].close_time <= pair[1].open_time);
        }
        for trade in &run.trades {
            assert!(trade.open_time < trade.close_time);
        }
    }
}

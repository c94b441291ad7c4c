//! Configuration validation.
//!
//! Checks every field before a run so the simulation core can assume
//! well-formed parameters. Missing keys fall back to documented defaults
//! and are valid; present-but-nonsensical values are rejected.

use std::collections::BTreeSet;

use crate::domain::error::MomotraderError;
use crate::ports::config_port::ConfigPort;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> MomotraderError {
    MomotraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parse a comma-separated hour list ("13,14,15"); empty means
/// unrestricted trading hours.
pub fn parse_allowed_hours(value: &str) -> Result<BTreeSet<u32>, String> {
    let mut hours = BTreeSet::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let hour: u32 = part
            .parse()
            .map_err(|_| format!("'{part}' is not an hour"))?;
        if hour > 23 {
            return Err(format!("hour {hour} out of range 0-23"));
        }
        hours.insert(hour);
    }
    Ok(hours)
}

/// Parse the three long-trend timeframe widths ("15,30,60"), minutes.
pub fn parse_trend_minutes(value: &str) -> Result<[u32; 3], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 timeframes, got {}", parts.len()));
    }
    let mut out = [0u32; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        let minutes: u32 = part
            .parse()
            .map_err(|_| format!("'{part}' is not a minute count"))?;
        if minutes == 0 {
            return Err("timeframe width must be positive".to_string());
        }
        *slot = minutes;
    }
    Ok(out)
}

pub fn validate_sim_config(config: &dyn ConfigPort) -> Result<(), MomotraderError> {
    let initial = config.get_double("backtest", "initial_equity", 10_000.0);
    if initial <= 0.0 || !initial.is_finite() {
        return Err(invalid("backtest", "initial_equity", "must be positive"));
    }

    for key in ["taker", "maker"] {
        let rate = config.get_double("fees", key, 0.0);
        if rate < 0.0 || !rate.is_finite() {
            return Err(invalid("fees", key, "fee rate must be non-negative"));
        }
    }

    let risk = config.get_double("risk", "risk_per_trade", 0.005);
    if risk <= 0.0 || risk > 1.0 {
        return Err(invalid("risk", "risk_per_trade", "must be in (0, 1]"));
    }
    let leverage = config.get_double("risk", "max_leverage", 5.0);
    if leverage <= 0.0 || !leverage.is_finite() {
        return Err(invalid("risk", "max_leverage", "must be positive"));
    }

    let ticks = config.get_int("execution", "slippage_ticks", 1);
    if ticks < 0 {
        return Err(invalid("execution", "slippage_ticks", "must be non-negative"));
    }
    let tick_size = config.get_double("execution", "tick_size", 0.1);
    if tick_size <= 0.0 || !tick_size.is_finite() {
        return Err(invalid("execution", "tick_size", "must be positive"));
    }
    let cooldown = config.get_int("execution", "cooldown_bars", 0);
    if cooldown < 0 {
        return Err(invalid("execution", "cooldown_bars", "must be non-negative"));
    }
    if let Some(hours) = config.get_string("execution", "allowed_hours") {
        parse_allowed_hours(&hours).map_err(|reason| invalid("execution", "allowed_hours", reason))?;
    }

    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), MomotraderError> {
    let spans = [
        ("ema_fast_1m", 9),
        ("ema_slow_1m", 21),
        ("ema_fast_mid", 21),
        ("ema_slow_mid", 55),
        ("atr_period_mid", 14),
        ("ema_trend_long", 200),
    ];
    for (key, default) in spans {
        if config.get_int("strategy", key, default) < 1 {
            return Err(invalid("strategy", key, "span must be at least 1"));
        }
    }

    let fast_1m = config.get_int("strategy", "ema_fast_1m", 9);
    let slow_1m = config.get_int("strategy", "ema_slow_1m", 21);
    if fast_1m >= slow_1m {
        return Err(invalid(
            "strategy",
            "ema_fast_1m",
            "fast span must be below the slow span",
        ));
    }
    let fast_mid = config.get_int("strategy", "ema_fast_mid", 21);
    let slow_mid = config.get_int("strategy", "ema_slow_mid", 55);
    if fast_mid >= slow_mid {
        return Err(invalid(
            "strategy",
            "ema_fast_mid",
            "fast span must be below the slow span",
        ));
    }

    if config.get_int("strategy", "mid_minutes", 3) < 1 {
        return Err(invalid("strategy", "mid_minutes", "must be positive"));
    }
    if let Some(trend) = config.get_string("strategy", "trend_minutes") {
        parse_trend_minutes(&trend).map_err(|reason| invalid("strategy", "trend_minutes", reason))?;
    }

    for (key, default) in [("atr_mult_stop", 2.0), ("tp_rr", 1.5)] {
        let value = config.get_double("strategy", key, default);
        if value <= 0.0 || !value.is_finite() {
            return Err(invalid("strategy", key, "must be positive"));
        }
    }
    for (key, default) in [("min_atr_pct", 0.0012), ("min_ema_gap_pct", 0.0004)] {
        let value = config.get_double("strategy", key, default);
        if value < 0.0 || !value.is_finite() {
            return Err(invalid("strategy", key, "must be non-negative"));
        }
    }

    Ok(())
}

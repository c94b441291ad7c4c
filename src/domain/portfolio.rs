//! Equal-weight portfolio aggregation across per-symbol equity curves.
//!
//! Each curve is normalized to NAV = 1 at its first point, the NAV series
//! are merged on the union of their timestamps with forward fill, and the
//! blended NAV is the unweighted mean across the symbols observed so far,
//! rescaled by the portfolio's initial capital.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::metrics::{compute_metrics, EquityPoint, MetricsRecord};

pub const EQUAL_WEIGHTING: &str = "equal";

/// Blended curve plus portfolio-level statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReport {
    pub equity: Vec<EquityPoint>,
    pub metrics: MetricsRecord,
    pub n_symbols: usize,
    pub weighting: &'static str,
}

/// Blend per-symbol equity curves into one equal-weight portfolio curve.
///
/// Curves whose first equity is zero or non-finite are skipped. A symbol
/// with no observation yet at a merged timestamp is left out of that
/// timestamp's mean; once observed it contributes its last known NAV.
pub fn blend_equal_weight(curves: &[Vec<EquityPoint>], initial_capital: f64) -> PortfolioReport {
    let navs: Vec<(Vec<DateTime<Utc>>, Vec<f64>)> = curves
        .iter()
        .filter(|curve| {
            curve
                .first()
                .is_some_and(|p| p.equity.is_finite() && p.equity != 0.0)
        })
        .map(|curve| {
            let base = curve[0].equity;
            (
                curve.iter().map(|p| p.time).collect(),
                curve.iter().map(|p| p.equity / base).collect(),
            )
        })
        .collect();

    if navs.is_empty() {
        return PortfolioReport {
            equity: Vec::new(),
            metrics: MetricsRecord::zeroed(initial_capital),
            n_symbols: 0,
            weighting: EQUAL_WEIGHTING,
        };
    }

    let union: BTreeSet<DateTime<Utc>> = navs
        .iter()
        .flat_map(|(times, _)| times.iter().copied())
        .collect();

    let mut cursors = vec![0usize; navs.len()];
    let mut equity = Vec::with_capacity(union.len());

    for ts in union {
        let mut sum = 0.0;
        let mut available = 0usize;
        for (k, (times, values)) in navs.iter().enumerate() {
            while cursors[k] < times.len() && times[cursors[k]] <= ts {
                cursors[k] += 1;
            }
            if cursors[k] > 0 {
                sum += values[cursors[k] - 1];
                available += 1;
            }
        }
        equity.push(EquityPoint {
            time: ts,
            equity: sum / available as f64 * initial_capital,
        });
    }

    let metrics = compute_metrics(&equity, 0, initial_capital);
    PortfolioReport {
        equity,
        metrics,
        n_symbols: navs.len(),
        weighting: EQUAL_WEIGHTING,
    }
}

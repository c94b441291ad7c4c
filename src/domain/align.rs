//! Timestamp alignment: broadcast a derived-resolution series onto the
//! 1-minute grid by carrying the last observed value forward.

use chrono::{DateTime, Utc};

/// Merge a sorted `(times, values)` series onto a sorted grid of
/// timestamps, last-observation-carried-forward. Grid points before the
/// first observation get NaN. Gaps in the source series propagate the
/// stale value until the next observation.
///
/// A source point is visible from its own timestamp onward, so a bucket
/// labeled at its start is broadcast to every grid minute inside it.
pub fn carry_forward(grid: &[DateTime<Utc>], times: &[DateTime<Utc>], values: &[f64]) -> Vec<f64> {
    debug_assert_eq!(times.len(), values.len());

    let mut out = Vec::with_capacity(grid.len());
    let mut j = 0usize;

    for &ts in grid {
        while j < times.len() && times[j] <= ts {
            j += 1;
        }
        out.push(if j == 0 { f64::NAN } else { values[j - 1] });
    }

    out
}

//! Open-position and closed-trade value types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Trade direction, rendered as "long"/"short" in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// The single open position of a symbol run. `qty` is signed and its sign
/// matches `direction` (+1 long, -1 short).
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub direction: i8,
    pub entry_price: f64,
    pub qty: f64,
    pub stop: f64,
    pub take: f64,
    pub entry_time: DateTime<Utc>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction > 0
    }

    pub fn side(&self) -> Side {
        if self.is_long() { Side::Long } else { Side::Short }
    }

    /// Unrealized profit at `price` against the entry fill.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.qty
    }
}

/// A closed round trip, immutable once recorded. `qty` is unsigned;
/// `fee` is the sum of the entry and exit taker fees.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub side: Side,
    pub entry: f64,
    pub exit: f64,
    pub qty: f64,
    pub pnl: f64,
    pub fee: f64,
    pub symbol: String,
    pub stop: f64,
    pub take: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_long() -> Position {
        Position {
            symbol: "BTCUSDT".into(),
            direction: 1,
            entry_price: 50.0,
            qty: 2.0,
            stop: 45.0,
            take: 60.0,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    fn sample_short() -> Position {
        Position {
            symbol: "ETHUSDT".into(),
            direction: -1,
            entry_price: 100.0,
            qty: -3.0,
            stop: 110.0,
            take: 80.0,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn side_matches_direction() {
        assert_eq!(sample_long().side(), Side::Long);
        assert_eq!(sample_short().side(), Side::Short);
    }

    #[test]
    fn side_display() {
        assert_eq!(Side::Long.to_string(), "long");
        assert_eq!(Side::Short.to_string(), "short");
    }

    #[test]
    fn unrealized_pnl_long() {
        let pos = sample_long();
        assert!((pos.unrealized_pnl(55.0) - 10.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(45.0) - (-10.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_short() {
        let pos = sample_short();
        assert!((pos.unrealized_pnl(90.0) - 30.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(110.0) - (-30.0)).abs() < f64::EPSILON);
    }
}

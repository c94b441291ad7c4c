//! Market data access port trait.

use chrono::{DateTime, Utc};

use crate::domain::bar::MinuteBar;
use crate::domain::error::MomotraderError;

pub trait DataPort {
    /// Fetch a symbol's 1-minute bars inside `[start, end]`, sorted by
    /// time ascending.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MinuteBar>, MomotraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, MomotraderError>;
}

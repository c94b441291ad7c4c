//! CSV file data adapter.
//!
//! Reads 1-minute bars from `<base>/<SYMBOL>/1m.csv` with columns
//! `open_time,open,high,low,close,volume`. `open_time` may be epoch
//! milliseconds or RFC 3339; both are normalized to UTC.

use chrono::{DateTime, Utc};
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;

use crate::domain::bar::MinuteBar;
use crate::domain::error::MomotraderError;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(symbol).join("1m.csv")
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| format!("epoch millis out of range: {raw}"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid open_time '{raw}': {e}"))
}

fn field<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record.get(idx).ok_or_else(|| format!("missing {name} column"))
}

fn numeric(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = field(record, idx, name)?;
    raw.parse()
        .map_err(|e| format!("invalid {name} value '{raw}': {e}"))
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MinuteBar>, MomotraderError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(MomotraderError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| MomotraderError::Data {
            reason: format!("failed to open {}: {e}", path.display()),
        })?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| MomotraderError::Data {
                reason: format!("CSV parse error in {}: {e}", path.display()),
            })?;

            let row = || -> Result<MinuteBar, String> {
                Ok(MinuteBar {
                    time: parse_time(field(&record, 0, "open_time")?)?,
                    open: numeric(&record, 1, "open")?,
                    high: numeric(&record, 2, "high")?,
                    low: numeric(&record, 3, "low")?,
                    close: numeric(&record, 4, "close")?,
                    volume: numeric(&record, 5, "volume")?,
                })
            };
            let bar = row().map_err(|reason| MomotraderError::Data {
                reason: format!("{}: {reason}", path.display()),
            })?;

            if bar.time >= start && bar.time <= end {
                bars.push(bar);
            }
        }

        bars.sort_by_key(|b| b.time);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, MomotraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| MomotraderError::Data {
            reason: format!("failed to read {}: {e}", self.base_path.display()),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MomotraderError::Data {
                reason: format!("directory entry error: {e}"),
            })?;
            if entry.path().join("1m.csv").is_file() {
                symbols.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

//! CSV/JSON report adapter.
//!
//! Writes the output files consumed by external reporting and
//! visualization: `equity.csv`, `trades.csv`, and `metrics.json` per
//! backtest invocation, `portfolio_equity.csv` and
//! `portfolio_metrics.json` for the blended portfolio.

use serde::Serialize;
use std::fs;
use std::fs::File;
use std::path::Path;

use crate::domain::error::MomotraderError;
use crate::domain::metrics::MetricsRecord;
use crate::domain::portfolio::PortfolioReport;
use crate::domain::simulation::SymbolRun;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

#[derive(Serialize)]
struct SymbolMetricsRow<'a> {
    symbol: &'a str,
    #[serde(flatten)]
    metrics: &'a MetricsRecord,
}

#[derive(Serialize)]
struct PortfolioMetricsDoc<'a> {
    #[serde(flatten)]
    metrics: &'a MetricsRecord,
    n_symbols: usize,
    weighting: &'a str,
}

fn data_error(path: &Path, e: impl std::fmt::Display) -> MomotraderError {
    MomotraderError::Data {
        reason: format!("failed to write {}: {e}", path.display()),
    }
}

impl CsvReportAdapter {
    fn write_equity_csv(runs: &[SymbolRun], path: &Path) -> Result<(), MomotraderError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| data_error(path, e))?;
        wtr.write_record(["time", "equity", "symbol"])
            .map_err(|e| data_error(path, e))?;
        for run in runs {
            for point in &run.equity {
                wtr.write_record([
                    point.time.to_rfc3339(),
                    point.equity.to_string(),
                    run.symbol.clone(),
                ])
                .map_err(|e| data_error(path, e))?;
            }
        }
        wtr.flush().map_err(|e| data_error(path, e))?;
        Ok(())
    }

    fn write_trades_csv(runs: &[SymbolRun], path: &Path) -> Result<(), MomotraderError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| data_error(path, e))?;
        wtr.write_record([
            "open_time",
            "close_time",
            "side",
            "entry",
            "exit",
            "qty",
            "pnl",
            "fee",
            "symbol",
            "stop",
            "take",
        ])
        .map_err(|e| data_error(path, e))?;
        for run in runs {
            for trade in &run.trades {
                wtr.write_record([
                    trade.open_time.to_rfc3339(),
                    trade.close_time.to_rfc3339(),
                    trade.side.to_string(),
                    trade.entry.to_string(),
                    trade.exit.to_string(),
                    trade.qty.to_string(),
                    trade.pnl.to_string(),
                    trade.fee.to_string(),
                    trade.symbol.clone(),
                    trade.stop.to_string(),
                    trade.take.to_string(),
                ])
                .map_err(|e| data_error(path, e))?;
            }
        }
        wtr.flush().map_err(|e| data_error(path, e))?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_runs(&self, runs: &[SymbolRun], out_dir: &Path) -> Result<(), MomotraderError> {
        fs::create_dir_all(out_dir)?;

        Self::write_equity_csv(runs, &out_dir.join("equity.csv"))?;
        Self::write_trades_csv(runs, &out_dir.join("trades.csv"))?;

        let metrics_path = out_dir.join("metrics.json");
        let rows: Vec<SymbolMetricsRow> = runs
            .iter()
            .map(|run| SymbolMetricsRow {
                symbol: &run.symbol,
                metrics: &run.metrics,
            })
            .collect();
        let file = File::create(&metrics_path).map_err(|e| data_error(&metrics_path, e))?;
        serde_json::to_writer_pretty(file, &rows).map_err(|e| data_error(&metrics_path, e))?;
        Ok(())
    }

    fn write_portfolio(
        &self,
        report: &PortfolioReport,
        out_dir: &Path,
    ) -> Result<(), MomotraderError> {
        fs::create_dir_all(out_dir)?;

        let equity_path = out_dir.join("portfolio_equity.csv");
        let mut wtr =
            csv::Writer::from_path(&equity_path).map_err(|e| data_error(&equity_path, e))?;
        wtr.write_record(["time", "equity"])
            .map_err(|e| data_error(&equity_path, e))?;
        for point in &report.equity {
            wtr.write_record([point.time.to_rfc3339(), point.equity.to_string()])
                .map_err(|e| data_error(&equity_path, e))?;
        }
        wtr.flush().map_err(|e| data_error(&equity_path, e))?;

        let metrics_path = out_dir.join("portfolio_metrics.json");
        let doc = PortfolioMetricsDoc {
            metrics: &report.metrics,
            n_symbols: report.n_symbols,
            weighting: report.weighting,
        };
        let file = File::create(&metrics_path).map_err(|e| data_error(&metrics_path, e))?;
        serde_json::to_writer_pretty(file, &doc).map_err(|e| data_error(&metrics_path, e))?;
        Ok(())
    }
}

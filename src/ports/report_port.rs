//! Report output port trait.

use std::path::Path;

use crate::domain::error::MomotraderError;
use crate::domain::portfolio::PortfolioReport;
use crate::domain::simulation::SymbolRun;

/// Port for persisting run outputs for external reporting/visualization.
pub trait ReportPort {
    /// Write the per-symbol equity curves, trade ledger, and metrics for
    /// one backtest invocation into `out_dir`.
    fn write_runs(&self, runs: &[SymbolRun], out_dir: &Path) -> Result<(), MomotraderError>;

    /// Write the blended portfolio curve and its metrics into `out_dir`.
    fn write_portfolio(
        &self,
        report: &PortfolioReport,
        out_dir: &Path,
    ) -> Result<(), MomotraderError>;
}

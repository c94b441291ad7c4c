//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    parse_allowed_hours, parse_trend_minutes, validate_sim_config, validate_strategy_config,
};
use crate::domain::error::MomotraderError;
use crate::domain::portfolio::blend_equal_weight;
use crate::domain::search::{run_search, SearchData, SearchOutcome};
use crate::domain::signal::StrategyParams;
use crate::domain::simulation::{run_symbol, FeeConfig, SimConfig, SymbolRun};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_REPORT_DIR: &str = "reports/latest";
const DEFAULT_OPT_DIR: &str = "reports/opt";
const DEFAULT_DATA_DIR: &str = "data/1m";

#[derive(Parser, Debug)]
#[command(name = "momotrader", about = "Multi-timeframe intraday strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one or more symbols over a time window
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, required = true, num_args = 1..)]
        symbols: Vec<String>,
        /// Window start, YYYY-MM-DD or RFC 3339 (UTC)
        #[arg(long)]
        start: String,
        /// Window end, YYYY-MM-DD or RFC 3339 (UTC)
        #[arg(long)]
        end: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest several symbols and blend them into an equal-weight portfolio
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, required = true, num_args = 1..)]
        symbols: Vec<String>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Random parameter search with an in-sample/out-of-sample split
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, required = true, num_args = 1..)]
        symbols: Vec<String>,
        /// In-sample start (UTC)
        #[arg(long)]
        start: String,
        /// Out-of-sample start; splits the two windows
        #[arg(long)]
        split: String,
        /// Out-of-sample end (UTC)
        #[arg(long)]
        end: String,
        #[arg(long, default_value_t = 150)]
        n_trials: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbols,
            start,
            end,
            output,
        } => run_backtest(&config, &symbols, &start, &end, output),
        Command::Portfolio {
            config,
            symbols,
            start,
            end,
            output,
        } => run_portfolio(&config, &symbols, &start, &end, output),
        Command::Optimize {
            config,
            symbols,
            start,
            split,
            end,
            n_trials,
            seed,
            output,
        } => run_optimize(&config, &symbols, &start, &split, &end, n_trials, seed, output),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

fn fail(err: &MomotraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = MomotraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        fail(&err)
    })
}

/// Parse a CLI time argument: a plain date means midnight UTC.
fn parse_time_arg(name: &str, value: &str) -> Result<DateTime<Utc>, MomotraderError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| MomotraderError::Data {
            reason: format!("invalid {name} '{value}', expected YYYY-MM-DD or RFC 3339"),
        })
}

/// Build the execution config from a validated config source.
pub fn build_sim_config(config: &dyn ConfigPort) -> SimConfig {
    let allowed_hours = config
        .get_string("execution", "allowed_hours")
        .and_then(|s| parse_allowed_hours(&s).ok())
        .unwrap_or_default();

    SimConfig {
        initial_equity: config.get_double("backtest", "initial_equity", 10_000.0),
        fees: FeeConfig {
            taker: config.get_double("fees", "taker", 0.0004),
            maker: config.get_double("fees", "maker", 0.0002),
        },
        slippage_ticks: config.get_int("execution", "slippage_ticks", 1) as u32,
        tick_size: config.get_double("execution", "tick_size", 0.1),
        risk_per_trade: config.get_double("risk", "risk_per_trade", 0.005),
        max_leverage: config.get_double("risk", "max_leverage", 5.0),
        cooldown_bars: config.get_int("execution", "cooldown_bars", 0) as u32,
        allowed_hours,
    }
}

/// Build the strategy parameters from a validated config source.
pub fn build_strategy_params(config: &dyn ConfigPort) -> StrategyParams {
    let defaults = StrategyParams::default();
    let trend_minutes = config
        .get_string("strategy", "trend_minutes")
        .and_then(|s| parse_trend_minutes(&s).ok())
        .unwrap_or(defaults.trend_minutes);

    StrategyParams {
        ema_fast_1m: config.get_int("strategy", "ema_fast_1m", 9) as usize,
        ema_slow_1m: config.get_int("strategy", "ema_slow_1m", 21) as usize,
        mid_minutes: config.get_int("strategy", "mid_minutes", 3) as u32,
        ema_fast_mid: config.get_int("strategy", "ema_fast_mid", 21) as usize,
        ema_slow_mid: config.get_int("strategy", "ema_slow_mid", 55) as usize,
        atr_period_mid: config.get_int("strategy", "atr_period_mid", 14) as usize,
        trend_minutes,
        ema_trend_long: config.get_int("strategy", "ema_trend_long", 200) as usize,
        atr_mult_stop: config.get_double("strategy", "atr_mult_stop", 2.0),
        tp_rr: config.get_double("strategy", "tp_rr", 1.5),
        min_atr_pct: config.get_double("strategy", "min_atr_pct", 0.0012),
        min_ema_gap_pct: config.get_double("strategy", "min_ema_gap_pct", 0.0004),
    }
}

struct RunContext {
    sim: SimConfig,
    params: StrategyParams,
    data: CsvAdapter,
}

fn prepare(config_path: &PathBuf) -> Result<RunContext, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;

    if let Err(e) = validate_sim_config(&adapter) {
        return Err(fail(&e));
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        return Err(fail(&e));
    }

    let base_dir = adapter
        .get_string("data", "base_dir")
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

    Ok(RunContext {
        sim: build_sim_config(&adapter),
        params: build_strategy_params(&adapter),
        data: CsvAdapter::new(PathBuf::from(base_dir)),
    })
}

fn collect_runs(
    ctx: &RunContext,
    symbols: &[String],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<SymbolRun>, MomotraderError> {
    let mut runs = Vec::new();
    for symbol in symbols {
        let bars = ctx.data.fetch_bars(symbol, start, end)?;
        if bars.is_empty() {
            eprintln!("No data for {symbol} in selected window.");
            continue;
        }
        eprintln!("Running {symbol} over {} bars", bars.len());
        runs.push(run_symbol(symbol, &bars, &ctx.params, &ctx.sim)?);
    }
    Ok(runs)
}

fn print_run_summary(run: &SymbolRun) {
    let m = &run.metrics;
    println!(
        "{}: final_equity={:.2} total_return={:.4} cagr={:.4} sharpe={:.2} max_drawdown={:.4} trades={}",
        run.symbol, m.final_equity, m.total_return, m.cagr, m.sharpe, m.max_drawdown, m.n_trades
    );
}

fn run_backtest(
    config_path: &PathBuf,
    symbols: &[String],
    start: &str,
    end: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let ctx = match prepare(config_path) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let (start, end) = match (parse_time_arg("start", start), parse_time_arg("end", end)) {
        (Ok(s), Ok(e)) => (s, e),
        (Err(e), _) | (_, Err(e)) => return fail(&e),
    };

    let runs = match collect_runs(&ctx, symbols, start, end) {
        Ok(runs) => runs,
        Err(e) => return fail(&e),
    };
    if runs.is_empty() {
        eprintln!("No results.");
        return ExitCode::SUCCESS;
    }

    let out_dir = output.unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR));
    if let Err(e) = CsvReportAdapter.write_runs(&runs, &out_dir) {
        return fail(&e);
    }

    for run in &runs {
        print_run_summary(run);
    }
    eprintln!("Saved reports to {}", out_dir.display());
    ExitCode::SUCCESS
}

fn run_portfolio(
    config_path: &PathBuf,
    symbols: &[String],
    start: &str,
    end: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let ctx = match prepare(config_path) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let (start, end) = match (parse_time_arg("start", start), parse_time_arg("end", end)) {
        (Ok(s), Ok(e)) => (s, e),
        (Err(e), _) | (_, Err(e)) => return fail(&e),
    };

    let runs = match collect_runs(&ctx, symbols, start, end) {
        Ok(runs) => runs,
        Err(e) => return fail(&e),
    };
    if runs.is_empty() {
        eprintln!("No results.");
        return ExitCode::SUCCESS;
    }

    let curves: Vec<_> = runs.iter().map(|r| r.equity.clone()).collect();
    let report = blend_equal_weight(&curves, ctx.sim.initial_equity);

    let out_dir = output.unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR));
    if let Err(e) = CsvReportAdapter.write_runs(&runs, &out_dir) {
        return fail(&e);
    }
    if let Err(e) = CsvReportAdapter.write_portfolio(&report, &out_dir) {
        return fail(&e);
    }

    let m = &report.metrics;
    println!(
        "portfolio[{} {}]: final_equity={:.2} total_return={:.4} sharpe={:.2} max_drawdown={:.4}",
        report.n_symbols, report.weighting, m.final_equity, m.total_return, m.sharpe, m.max_drawdown
    );
    eprintln!("Saved portfolio reports to {}", out_dir.display());
    ExitCode::SUCCESS
}

#[allow(clippy::too_many_arguments)]
fn run_optimize(
    config_path: &PathBuf,
    symbols: &[String],
    start: &str,
    split: &str,
    end: &str,
    n_trials: usize,
    seed: u64,
    output: Option<PathBuf>,
) -> ExitCode {
    let ctx = match prepare(config_path) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    let parsed = (
        parse_time_arg("start", start),
        parse_time_arg("split", split),
        parse_time_arg("end", end),
    );
    let (start, split, end) = match parsed {
        (Ok(s), Ok(m), Ok(e)) => (s, m, e),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return fail(&e),
    };

    let mut data = Vec::new();
    for symbol in symbols {
        let is_bars = match ctx.data.fetch_bars(symbol, start, split) {
            Ok(bars) => bars,
            Err(e) => return fail(&e),
        };
        let oos_bars = match ctx.data.fetch_bars(symbol, split, end) {
            Ok(bars) => bars,
            Err(e) => return fail(&e),
        };
        data.push(SearchData {
            symbol: symbol.clone(),
            is_bars,
            oos_bars,
        });
    }

    eprintln!("Searching {n_trials} trials over {} symbols (seed {seed})", data.len());
    let outcome = match run_search(&data, &ctx.sim, n_trials, seed) {
        Ok(outcome) => outcome,
        Err(e) => return fail(&e),
    };

    let out_dir = output.unwrap_or_else(|| PathBuf::from(DEFAULT_OPT_DIR));
    if let Err(e) = write_search_outcome(&outcome, &out_dir) {
        return fail(&e);
    }

    match &outcome.best {
        Some(best) => {
            println!("best trial {} score {:.3}", best.index, best.score);
            eprintln!("Saved search results to {}", out_dir.display());
        }
        None => eprintln!("No usable trials."),
    }
    ExitCode::SUCCESS
}

fn write_search_outcome(
    outcome: &SearchOutcome,
    out_dir: &std::path::Path,
) -> Result<(), MomotraderError> {
    std::fs::create_dir_all(out_dir)?;

    let results_path = out_dir.join("results.csv");
    let mut wtr = csv::Writer::from_path(&results_path).map_err(|e| MomotraderError::Data {
        reason: format!("failed to write {}: {e}", results_path.display()),
    })?;
    wtr.write_record([
        "trial",
        "score",
        "ema_fast_1m",
        "ema_slow_1m",
        "ema_fast_mid",
        "ema_slow_mid",
        "ema_trend_long",
        "atr_period_mid",
        "atr_mult_stop",
        "tp_rr",
        "min_atr_pct",
        "min_ema_gap_pct",
    ])
    .map_err(|e| MomotraderError::Data {
        reason: e.to_string(),
    })?;
    for trial in &outcome.trials {
        let p = &trial.params;
        wtr.write_record([
            trial.index.to_string(),
            trial.score.to_string(),
            p.ema_fast_1m.to_string(),
            p.ema_slow_1m.to_string(),
            p.ema_fast_mid.to_string(),
            p.ema_slow_mid.to_string(),
            p.ema_trend_long.to_string(),
            p.atr_period_mid.to_string(),
            p.atr_mult_stop.to_string(),
            p.tp_rr.to_string(),
            p.min_atr_pct.to_string(),
            p.min_ema_gap_pct.to_string(),
        ])
        .map_err(|e| MomotraderError::Data {
            reason: e.to_string(),
        })?;
    }
    wtr.flush().map_err(|e| MomotraderError::Data {
        reason: e.to_string(),
    })?;

    if let Some(best) = &outcome.best {
        let best_path = out_dir.join("best_params.json");
        let file = File::create(&best_path)?;
        serde_json::to_writer_pretty(file, &best.params).map_err(|e| MomotraderError::Data {
            reason: format!("failed to write {}: {e}", best_path.display()),
        })?;
    }
    Ok(())
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let ctx = match prepare(config_path) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    match ctx.data.list_symbols() {
        Ok(symbols) => {
            for symbol in symbols {
                println!("{symbol}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

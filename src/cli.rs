//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_data_adapter::CsvSignalAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::index_gate_adapter::{IndexBar, IndexTrendGate, TrendMode};
use crate::domain::account::FeeSchedule;
use crate::domain::config::{ExitConfig, ExitMode, SimulatorConfig, StopMode};
use crate::domain::config_validation::{parse_thresholds, validate_config};
use crate::domain::error::QqetraderError;
use crate::domain::metrics::Summary;
use crate::domain::signal::{InstrumentSeries, MarketData, MIN_SIGNAL_BARS};
use crate::domain::simulator::run_quality_sweep;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::SignalDataPort;
use crate::ports::gate_port::EntryGatePort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "qqetrader", about = "QQE trend-strategy portfolio backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest sweep over the configured quality thresholds
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of per-instrument signal CSV files
        #[arg(short, long)]
        data: PathBuf,
        /// Directory for trade/equity CSV reports
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured thresholds, e.g. "50,60,70"
        #[arg(long)]
        thresholds: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in a data directory
    ListInstruments {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            thresholds,
        } => run_backtest(&config, &data, output.as_deref(), thresholds.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListInstruments { data } => run_list_instruments(&data),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = QqetraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(
    config_path: &Path,
    data_path: &Path,
    output_path: Option<&Path>,
    thresholds_override: Option<&str>,
) -> ExitCode {
    // Stage 1: load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: build simulation parameters and threshold list
    let config = build_simulator_config(&adapter);
    let thresholds = match resolve_thresholds(&adapter, thresholds_override) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: load pre-materialized signal data
    let data_port = CsvSignalAdapter::new(data_path.to_path_buf());
    let gate_index = gate_index_code(&adapter);
    let market = match load_market(&data_port, gate_index.as_deref()) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!(
        "Loaded {} instruments over {} trading days",
        market.instrument_count(),
        market.day_count()
    );

    // Stage 4: optional index trend gate
    let gate = match build_gate(&adapter, &data_port) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: one run per threshold
    let outcomes = run_quality_sweep(
        &market,
        &thresholds,
        &config,
        gate.as_ref().map(|g| g as &dyn EntryGatePort),
    );

    for outcome in &outcomes {
        println!();
        println!(">>> quality threshold {:.0}", outcome.threshold);
        println!(
            "final equity {:.0} (return {:+.2}%), max drawdown {:.2}%, {} trades",
            outcome.final_equity,
            outcome.total_return_pct,
            outcome.max_drawdown_pct,
            outcome.trade_count
        );

        let state = &outcome.result.state;
        let summary = Summary::compute(&state.trades, &state.equity_curve, config.initial_capital);
        if summary.sell_count > 0 {
            println!(
                "closed sells {}: win rate {:.1}%, avg profit {:+.2}%, profit factor {:.2}, avg hold {:.1}d",
                summary.sell_count,
                summary.win_rate * 100.0,
                summary.avg_profit_pct,
                summary.profit_factor,
                summary.avg_hold_days
            );
            println!(
                "exits: {} stop-loss, {} signal",
                summary.stop_loss_count, summary.signal_exit_count
            );
        }

        let stats = outcome.result.gate_stats;
        if gate.is_some() && stats.total_signals > 0 {
            println!(
                "gate: {} signals, {} blocked, {} passed",
                stats.total_signals, stats.blocked, stats.passed
            );
        }

        if let Some(dir) = output_path {
            if let Err(e) = write_reports(dir, outcome.threshold, state) {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    // Stage 6: comparison table
    println!();
    println!(
        "{:<12} | {:>12} | {:>12} | {:>8}",
        "threshold", "return %", "max dd %", "trades"
    );
    println!("{}", "-".repeat(54));
    for outcome in &outcomes {
        println!(
            "{:<12.0} | {:>12.2} | {:>12.2} | {:>8}",
            outcome.threshold,
            outcome.total_return_pct,
            outcome.max_drawdown_pct,
            outcome.trade_count
        );
    }

    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match validate_config(&adapter) {
        Ok(()) => {
            println!("{} is valid", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_list_instruments(data_path: &Path) -> ExitCode {
    let data_port = CsvSignalAdapter::new(data_path.to_path_buf());
    match data_port.list_instruments() {
        Ok(instruments) => {
            for info in instruments {
                println!("{}\t{}", info.code, info.name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Assemble a [`SimulatorConfig`] from a validated config source.
pub fn build_simulator_config(adapter: &dyn ConfigPort) -> SimulatorConfig {
    let exit_mode = if adapter.get_bool("exits", "layered_tp", false) {
        ExitMode::LayeredTp
    } else if adapter.get_float("exits", "trailing_stop", 0.0) > 0.0 {
        ExitMode::Trailing {
            pullback: adapter.get_float("exits", "trailing_stop", 0.0),
        }
    } else if adapter.get_bool("exits", "drawdown_exit", false) {
        ExitMode::Drawdown {
            threshold: adapter.get_float("exits", "drawdown_threshold", 0.08),
            min_profit: adapter.get_float("exits", "min_profit_for_drawdown", 0.05),
        }
    } else {
        ExitMode::FixedTp
    };

    let stop_mode = if adapter.get_bool("exits", "atr_stop", false) {
        StopMode::Atr {
            multiplier: adapter.get_float("exits", "atr_multiplier", 2.0),
        }
    } else {
        StopMode::Progressive
    };

    SimulatorConfig {
        initial_capital: adapter.get_float("backtest", "initial_capital", 100_000.0),
        max_positions: adapter.get_int("backtest", "max_positions", 5) as usize,
        fees: FeeSchedule {
            commission_rate: adapter.get_float("backtest", "commission_rate", 0.0003),
            min_commission: adapter.get_float("backtest", "min_commission", 5.0),
            slippage_rate: adapter.get_float("backtest", "slippage_rate", 0.001),
        },
        exits: ExitConfig {
            stop_loss: adapter.get_float("exits", "stop_loss", 0.10),
            take_profit: adapter.get_float("exits", "take_profit", 0.20),
            exit_mode,
            stop_mode,
        },
        pyramid_enabled: adapter.get_bool("exits", "pyramid", false),
        min_quality: 60.0,
        min_gate_strength: adapter.get_float("gate", "min_strength", 60.0),
    }
}

fn resolve_thresholds(
    adapter: &dyn ConfigPort,
    thresholds_override: Option<&str>,
) -> Result<Vec<f64>, QqetraderError> {
    if let Some(raw) = thresholds_override {
        return parse_thresholds(raw);
    }
    match adapter.get_str("backtest", "quality_thresholds") {
        Some(raw) => parse_thresholds(&raw),
        None => Ok(vec![60.0]),
    }
}

fn gate_index_code(adapter: &dyn ConfigPort) -> Option<String> {
    if adapter.get_bool("gate", "enabled", false) {
        adapter.get_str("gate", "index")
    } else {
        None
    }
}

/// Load every instrument the data port knows about, skipping those with too
/// little history. The gate's index series is not a tradable instrument.
pub fn load_market(
    data_port: &dyn SignalDataPort,
    exclude: Option<&str>,
) -> Result<MarketData, QqetraderError> {
    let instruments = data_port.list_instruments()?;
    let mut series = Vec::new();

    for info in instruments {
        if Some(info.code.as_str()) == exclude {
            continue;
        }
        let bars = match data_port.fetch_signals(&info.code) {
            Ok(bars) => bars,
            Err(e) => {
                eprintln!("warning: skipping {} ({e})", info.code);
                continue;
            }
        };
        if bars.len() < MIN_SIGNAL_BARS {
            eprintln!(
                "warning: skipping {} (only {} bars, minimum {} required)",
                info.code,
                bars.len(),
                MIN_SIGNAL_BARS
            );
            continue;
        }
        series.push(InstrumentSeries::new(info.code, info.name, bars));
    }

    if series.is_empty() {
        return Err(QqetraderError::InsufficientData {
            code: "all".to_string(),
            bars: 0,
            minimum: MIN_SIGNAL_BARS,
        });
    }

    Ok(MarketData::from_series(series))
}

fn build_gate(
    adapter: &dyn ConfigPort,
    data_port: &dyn SignalDataPort,
) -> Result<Option<IndexTrendGate>, QqetraderError> {
    let Some(index_code) = gate_index_code(adapter) else {
        return Ok(None);
    };

    let mode = match adapter.get_str("gate", "mode").as_deref() {
        Some("simple") => TrendMode::Simple,
        _ => TrendMode::Moderate,
    };

    let bars: Vec<IndexBar> = data_port
        .fetch_signals(&index_code)?
        .into_iter()
        .map(|b| IndexBar {
            date: b.date,
            high: b.high,
            low: b.low,
            close: b.close,
        })
        .collect();

    Ok(Some(
        IndexTrendGate::new(mode)
            .with_series(&index_code, bars)
            .with_default_index(&index_code),
    ))
}

fn write_reports(
    dir: &Path,
    threshold: f64,
    state: &crate::domain::portfolio::SimulatorState,
) -> Result<(), QqetraderError> {
    std::fs::create_dir_all(dir)?;
    let trades_path = dir.join(format!("trades_q{threshold:.0}.csv"));
    let equity_path = dir.join(format!("equity_q{threshold:.0}.csv"));

    CsvReportAdapter.write_trades(&state.trades, &trades_path)?;
    CsvReportAdapter.write_equity(&state.equity_curve, &equity_path)?;
    eprintln!(
        "wrote {} and {}",
        trades_path.display(),
        equity_path.display()
    );
    Ok(())
}

//! The day-stepped portfolio simulator.
//!
//! Within a day the order is fixed: exits, then pyramid adds, then new
//! entries, then the equity snapshot. Capital freed by an exit is available
//! to the same day's admissions.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::admission::{self, GateStats};
use super::config::SimulatorConfig;
use super::execution;
use super::exit_rules::{self, PendingClose};
use super::metrics;
use super::portfolio::SimulatorState;
use super::position::{lot_floor, LOT, PYRAMID_LEVELS};
use super::signal::{MarketData, SignalBar};
use crate::ports::gate_port::EntryGatePort;

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub state: SimulatorState,
    pub gate_stats: GateStats,
}

/// Replay the whole market, one trading day at a time.
pub fn run_simulation(
    market: &MarketData,
    config: &SimulatorConfig,
    gate: Option<&dyn EntryGatePort>,
) -> SimulationResult {
    let mut state = SimulatorState::new(config.initial_capital, config.fees);
    let mut gate_stats = GateStats::default();

    for date in market.dates() {
        if let Some(day) = market.day(date) {
            process_day(&mut state, market, day, date, config, gate, &mut gate_stats);
        }
    }

    SimulationResult { state, gate_stats }
}

fn process_day(
    state: &mut SimulatorState,
    market: &MarketData,
    day: &BTreeMap<String, SignalBar>,
    date: NaiveDate,
    config: &SimulatorConfig,
    gate: Option<&dyn EntryGatePort>,
    gate_stats: &mut GateStats,
) {
    // 1. Exit checks. Positions with no bar today keep their last mark and
    // are skipped. Full closes queue up and settle after the scan.
    let mut pending: Vec<PendingClose> = Vec::new();
    let mut emptied: Vec<String> = Vec::new();
    {
        let SimulatorState {
            account,
            positions,
            trades,
            ..
        } = state;
        for (code, pos) in positions.iter_mut() {
            let Some(bar) = day.get(code) else { continue };
            pos.last_close = bar.close;

            match exit_rules::evaluate(pos, bar, date, &config.exits, account, trades) {
                Some(close) => pending.push(close),
                // Layered tranches can sell a position down to nothing
                // without a queued close.
                None if pos.shares == 0 => emptied.push(code.clone()),
                None => {}
            }
        }
    }
    for code in emptied {
        state.positions.remove(&code);
    }
    for close in pending {
        execution::close_position(state, date, &close.code, close.price, close.reason);
    }

    // 2. Pyramid adds on surviving positions.
    if config.pyramid_enabled {
        pyramid_pass(state, day, date);
    }

    // 3. New entries.
    if state.position_count() < config.max_positions {
        let mut candidates =
            admission::collect_candidates(market, date, state, config, gate, gate_stats);
        admission::rank(&mut candidates);
        admission::admit_entries(state, &candidates, config, date);
    }

    // 4. End-of-day snapshot.
    state.record_equity(date);
}

/// Each profit level adds 20% of the opening size, once, when affordable.
fn pyramid_pass(state: &mut SimulatorState, day: &BTreeMap<String, SignalBar>, date: NaiveDate) {
    let SimulatorState {
        account,
        positions,
        trades,
        ..
    } = state;

    for (code, pos) in positions.iter_mut() {
        let Some(bar) = day.get(code) else { continue };
        let profit = pos.profit_pct(bar.close);

        for (i, level) in PYRAMID_LEVELS.iter().enumerate() {
            if pos.pyramid.filled[i] || profit < *level {
                continue;
            }
            let added = lot_floor((pos.initial_shares as f64 * 0.20) as i64);
            if added < LOT {
                continue;
            }
            let notional = added as f64 * bar.close;
            if !account.can_afford(notional) {
                // Level stays open; it can fill on a later day.
                continue;
            }
            execution::add_to_position(
                pos,
                account,
                trades,
                date,
                bar.close,
                added,
                (level * 100.0).round() as u32,
            );
            pos.pyramid.filled[i] = true;
        }
    }
}

/// One line of the threshold comparison table.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub threshold: f64,
    pub final_equity: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub trade_count: usize,
    pub result: SimulationResult,
}

/// Run one simulation per quality threshold over the same market data.
pub fn run_quality_sweep(
    market: &MarketData,
    thresholds: &[f64],
    base: &SimulatorConfig,
    gate: Option<&dyn EntryGatePort>,
) -> Vec<SweepOutcome> {
    thresholds
        .iter()
        .map(|&threshold| {
            let config = SimulatorConfig {
                min_quality: threshold,
                ..base.clone()
            };
            let result = run_simulation(market, &config, gate);

            let final_equity = result
                .state
                .equity_curve
                .last()
                .map(|s| s.equity)
                .unwrap_or(config.initial_capital);
            let total_return_pct =
                (final_equity - config.initial_capital) / config.initial_capital * 100.0;
            let (max_dd, _) = metrics::compute_drawdown(&result.state.equity_curve);

            SweepOutcome {
                threshold,
                final_equity,
                total_return_pct,
                max_drawdown_pct: max_dd * 100.0,
                trade_count: result.state.trades.len(),
                result,
            }
        })
        .collect()
}

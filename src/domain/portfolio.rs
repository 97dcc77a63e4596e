//! Owned simulator state: account, open positions, trade log, equity curve.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::account::{CapitalAccount, FeeSchedule};
use super::position::Position;
use super::trade::{EquitySnapshot, TradeRecord};

/// All mutable state of one simulation run. Explicitly owned and passed
/// around; nothing here is global or shared.
///
/// Positions live in a BTreeMap so the daily exit scan walks instruments in
/// a stable order — a requirement for byte-identical replays, not a
/// performance choice.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorState {
    pub account: CapitalAccount,
    pub positions: BTreeMap<String, Position>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquitySnapshot>,
}

impl SimulatorState {
    pub fn new(initial_capital: f64, fees: FeeSchedule) -> Self {
        SimulatorState {
            account: CapitalAccount::new(initial_capital, fees),
            positions: BTreeMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn has_position(&self, code: &str) -> bool {
        self.positions.contains_key(code)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Sum of open positions marked at their last known close.
    pub fn market_value(&self) -> f64 {
        self.positions.values().map(Position::market_value).sum()
    }

    pub fn total_equity(&self) -> f64 {
        self.account.cash + self.market_value()
    }

    pub fn record_equity(&mut self, date: NaiveDate) {
        let market_value = self.market_value();
        self.equity_curve.push(EquitySnapshot {
            date,
            cash: self.account.cash,
            market_value,
            equity: self.account.cash + market_value,
            position_count: self.positions.len(),
        });
    }
}

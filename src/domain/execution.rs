//! Fill application: the only code that moves cash and shares together.
//!
//! Every function here settles the account, mutates the position ledger and
//! appends the trade record in one step, so a half-applied fill cannot exist.

use chrono::NaiveDate;

use super::account::CapitalAccount;
use super::portfolio::SimulatorState;
use super::position::{ExitStrategyState, Position, PyramidState};
use super::trade::{EntryReason, ExitReason, TradeAction, TradeRecord, TradeReason};

/// Open a new position with an admitted buy. The caller has already sized
/// `shares` to whole lots and checked affordability.
#[allow(clippy::too_many_arguments)]
pub fn open_position(
    state: &mut SimulatorState,
    date: NaiveDate,
    code: &str,
    name: &str,
    price: f64,
    shares: i64,
    quality: f64,
    atr: f64,
    exit_state: ExitStrategyState,
) {
    let notional = shares as f64 * price;
    let fee = state.account.settle_buy(notional);

    state.positions.insert(
        code.to_string(),
        Position {
            code: code.to_string(),
            name: name.to_string(),
            shares,
            initial_shares: shares,
            cost_price: price,
            entry_date: date,
            entry_quality: quality,
            entry_atr: atr,
            last_close: price,
            exit_state,
            pyramid: PyramidState::default(),
        },
    );

    state.trades.push(TradeRecord {
        date,
        code: code.to_string(),
        name: name.to_string(),
        action: TradeAction::Buy,
        price,
        shares,
        fee,
        amount: -(notional + fee),
        quality,
        reason: TradeReason::Entry(EntryReason::Signal),
        cash_after: state.account.cash,
        profit: None,
        profit_pct: None,
        hold_days: None,
    });
}

/// Pyramid add: grow an open position and fold the fill into its weighted
/// cost basis.
pub fn add_to_position(
    pos: &mut Position,
    account: &mut CapitalAccount,
    trades: &mut Vec<TradeRecord>,
    date: NaiveDate,
    price: f64,
    shares: i64,
    level_pct: u32,
) {
    let notional = shares as f64 * price;
    let fee = account.settle_buy(notional);
    pos.add_shares(shares, price);

    trades.push(TradeRecord {
        date,
        code: pos.code.clone(),
        name: pos.name.clone(),
        action: TradeAction::BuyAdd,
        price,
        shares,
        fee,
        amount: -(notional + fee),
        quality: pos.entry_quality,
        reason: TradeReason::Entry(EntryReason::PyramidAdd(level_pct)),
        cash_after: account.cash,
        profit: None,
        profit_pct: None,
        hold_days: None,
    });
}

/// Sell `shares` out of a position, possibly down to zero. The caller
/// removes the position from the ledger when it empties.
pub fn apply_sell(
    pos: &mut Position,
    account: &mut CapitalAccount,
    trades: &mut Vec<TradeRecord>,
    date: NaiveDate,
    price: f64,
    shares: i64,
    reason: ExitReason,
) {
    let notional = shares as f64 * price;
    let fee = account.settle_sell(notional);
    pos.shares -= shares;

    let buy_cost = pos.cost_price * shares as f64;
    let profit = (notional - fee) - buy_cost;
    let profit_pct = profit / buy_cost * 100.0;

    trades.push(TradeRecord {
        date,
        code: pos.code.clone(),
        name: pos.name.clone(),
        action: TradeAction::Sell,
        price,
        shares,
        fee,
        amount: notional - fee,
        quality: pos.entry_quality,
        reason: TradeReason::Exit(reason),
        cash_after: account.cash,
        profit: Some(profit),
        profit_pct: Some(profit_pct),
        hold_days: Some(pos.hold_days(date)),
    });
}

/// Remove a position from the ledger and sell everything it still holds.
pub fn close_position(
    state: &mut SimulatorState,
    date: NaiveDate,
    code: &str,
    price: f64,
    reason: ExitReason,
) {
    let Some(mut pos) = state.positions.remove(code) else {
        return;
    };
    let shares = pos.shares;
    apply_sell(
        &mut pos,
        &mut state.account,
        &mut state.trades,
        date,
        price,
        shares,
        reason,
    );
}

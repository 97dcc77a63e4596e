//! Append-only trade and equity records.

use chrono::NaiveDate;
use std::fmt;

/// Side of a recorded fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    BuyAdd,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::BuyAdd => write!(f, "BUY_ADD"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// Why a buy fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryReason {
    /// Admitted on a quality-ranked oracle buy signal.
    Signal,
    /// Pyramid add at the given unrealized-profit level (percent).
    PyramidAdd(u32),
}

/// Why a sell fired. Enumerated so tests and reports are stable
/// independent of display wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Layered take-profit at the given threshold (percent of cost).
    LayeredTakeProfit(u32),
    /// Final-tranche trailing close after four layered levels sold.
    LayeredTrailing,
    /// Retracement-from-peak exit once minimum profit was reached.
    DrawdownExit,
    /// Trailing-stop close after the take-profit gate was crossed.
    TrailingStop,
    /// First-touch take-profit sell of half the current shares.
    TakeProfitHalf,
    StopLoss,
    /// Stop raised to just above cost after a partial profit-take.
    BreakevenExit,
    /// Oracle sell signal past the minimum holding period.
    SellSignal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::LayeredTakeProfit(level) => write!(f, "layered_tp_{level}"),
            ExitReason::LayeredTrailing => write!(f, "layered_trailing"),
            ExitReason::DrawdownExit => write!(f, "drawdown_exit"),
            ExitReason::TrailingStop => write!(f, "trailing_stop"),
            ExitReason::TakeProfitHalf => write!(f, "take_profit_half"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::BreakevenExit => write!(f, "breakeven_exit"),
            ExitReason::SellSignal => write!(f, "sell_signal"),
        }
    }
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryReason::Signal => write!(f, "signal"),
            EntryReason::PyramidAdd(level) => write!(f, "pyramid_add_{level}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeReason {
    Entry(EntryReason),
    Exit(ExitReason),
}

impl fmt::Display for TradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeReason::Entry(r) => r.fmt(f),
            TradeReason::Exit(r) => r.fmt(f),
        }
    }
}

/// One executed fill. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub code: String,
    pub name: String,
    pub action: TradeAction,
    pub price: f64,
    pub shares: i64,
    pub fee: f64,
    /// Signed net cash delta: negative for buys, positive for sells.
    pub amount: f64,
    pub quality: f64,
    pub reason: TradeReason,
    pub cash_after: f64,
    /// Realized profit net of fees; sells only.
    pub profit: Option<f64>,
    pub profit_pct: Option<f64>,
    pub hold_days: Option<i64>,
}

/// End-of-day portfolio snapshot. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub market_value: f64,
    pub equity: f64,
    pub position_count: usize,
}

//! Per-position daily exit evaluation.
//!
//! Fixed step order: the configured mode-specific take-profit machinery runs
//! first, then the protective stop, then the oracle's sell signal. A full
//! close from the mode step skips the later steps; partial sells do not.
//! Partial sells settle immediately, full closes are returned to the caller
//! so capital freed by them is queued until the whole scan finishes.

use chrono::NaiveDate;

use super::account::CapitalAccount;
use super::config::{ExitConfig, ExitMode, StopMode};
use super::execution;
use super::position::{lot_floor, ExitStrategyState, Position, LAYERED_TP_LEVELS};
use super::signal::SignalBar;
use super::trade::{ExitReason, TradeRecord};

/// Sell signals inside this holding window are treated as noise.
pub const SIGNAL_EXIT_MIN_HOLD_DAYS: i64 = 5;

/// The final layered tranche trails at 15% below its peak.
const LAYERED_TRAILING_RATIO: f64 = 0.85;

/// A full close queued by [`evaluate`], applied after the day's scan.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingClose {
    pub code: String,
    pub price: f64,
    pub reason: ExitReason,
}

/// Run all exit steps for one position against today's bar.
///
/// Partial sells (layered tranches, the fixed-TP half) are applied to the
/// account and position in place; a returned [`PendingClose`] means the
/// position should be fully closed at the given price.
pub fn evaluate(
    pos: &mut Position,
    bar: &SignalBar,
    date: NaiveDate,
    cfg: &ExitConfig,
    account: &mut CapitalAccount,
    trades: &mut Vec<TradeRecord>,
) -> Option<PendingClose> {
    let hold_days = pos.hold_days(date);

    if let Some(close) = mode_specific_step(pos, bar, date, cfg, account, trades) {
        return Some(close);
    }

    let stop = stop_price(pos, cfg, hold_days);
    if bar.low <= stop {
        // Gap through the stop overnight fills at the open, not the stop.
        let price = if bar.open < stop { bar.open } else { stop };
        let reason = if pos.exit_state.breakeven_active() {
            ExitReason::BreakevenExit
        } else {
            ExitReason::StopLoss
        };
        return Some(PendingClose {
            code: pos.code.clone(),
            price,
            reason,
        });
    }

    if bar.sell_signal && hold_days >= SIGNAL_EXIT_MIN_HOLD_DAYS {
        return Some(PendingClose {
            code: pos.code.clone(),
            price: bar.close,
            reason: ExitReason::SellSignal,
        });
    }

    None
}

/// Today's protective stop for this position.
pub fn stop_price(pos: &Position, cfg: &ExitConfig, hold_days: i64) -> f64 {
    if pos.exit_state.breakeven_active() {
        return pos.cost_price * 1.01;
    }

    if let StopMode::Atr { multiplier } = cfg.stop_mode {
        if pos.entry_atr > 0.0 {
            return pos.cost_price - multiplier * pos.entry_atr;
        }
        // No ATR on the entry bar: fall through to the percentage stop.
    }

    let pct = if hold_days < 5 {
        (cfg.stop_loss * 1.2).min(0.12)
    } else if hold_days < 15 {
        cfg.stop_loss
    } else {
        cfg.stop_loss * 0.8
    };
    pos.cost_price * (1.0 - pct)
}

fn mode_specific_step(
    pos: &mut Position,
    bar: &SignalBar,
    date: NaiveDate,
    cfg: &ExitConfig,
    account: &mut CapitalAccount,
    trades: &mut Vec<TradeRecord>,
) -> Option<PendingClose> {
    match cfg.exit_mode {
        ExitMode::LayeredTp => layered_step(pos, bar, date, account, trades),
        ExitMode::Drawdown {
            threshold,
            min_profit,
        } => {
            let peak = match &mut pos.exit_state {
                ExitStrategyState::Drawdown { peak } => {
                    *peak = peak.max(bar.high);
                    *peak
                }
                _ => return None,
            };
            let profit = pos.profit_pct(bar.close);
            if profit >= min_profit && (peak - bar.close) / peak >= threshold {
                return Some(PendingClose {
                    code: pos.code.clone(),
                    price: bar.close,
                    reason: ExitReason::DrawdownExit,
                });
            }
            None
        }
        ExitMode::Trailing { pullback } => {
            let peak = match &mut pos.exit_state {
                ExitStrategyState::Trailing { peak } => {
                    *peak = peak.max(bar.high);
                    *peak
                }
                _ => return None,
            };
            let profit = pos.profit_pct(bar.close);
            if profit > cfg.take_profit && bar.close < peak * (1.0 - pullback) {
                return Some(PendingClose {
                    code: pos.code.clone(),
                    price: bar.close,
                    reason: ExitReason::TrailingStop,
                });
            }
            None
        }
        ExitMode::FixedTp => {
            let taken = match pos.exit_state {
                ExitStrategyState::FixedTp { taken, .. } => taken,
                _ => return None,
            };
            if !taken && cfg.take_profit > 0.0 {
                let tp_price = pos.cost_price * (1.0 + cfg.take_profit);
                if bar.high >= tp_price {
                    // Gapped above the target: the open is the best fill.
                    let exec_price = bar.open.max(tp_price);
                    let shares = lot_floor(pos.shares / 2);
                    if shares > 0 {
                        execution::apply_sell(
                            pos,
                            account,
                            trades,
                            date,
                            exec_price,
                            shares,
                            ExitReason::TakeProfitHalf,
                        );
                        pos.exit_state = ExitStrategyState::FixedTp {
                            taken: true,
                            breakeven: true,
                        };
                    }
                }
            }
            None
        }
    }
}

fn layered_step(
    pos: &mut Position,
    bar: &SignalBar,
    date: NaiveDate,
    account: &mut CapitalAccount,
    trades: &mut Vec<TradeRecord>,
) -> Option<PendingClose> {
    let profit = pos.profit_pct(bar.close);

    for (i, level) in LAYERED_TP_LEVELS.iter().enumerate() {
        let already_sold = match &pos.exit_state {
            ExitStrategyState::LayeredTp { levels_sold, .. } => levels_sold[i],
            _ => return None,
        };
        if already_sold || profit < *level {
            continue;
        }

        let shares = lot_floor((pos.initial_shares as f64 * 0.20) as i64);
        if shares == 0 || shares > pos.shares {
            // Cannot cut a tranche out of this position; leave the level
            // unconsumed so a later, larger position state can retry.
            continue;
        }

        execution::apply_sell(
            pos,
            account,
            trades,
            date,
            bar.close,
            shares,
            ExitReason::LayeredTakeProfit((level * 100.0).round() as u32),
        );

        if let ExitStrategyState::LayeredTp {
            levels_sold,
            trailing_peak,
        } = &mut pos.exit_state
        {
            levels_sold[i] = true;
            let sold_count = levels_sold.iter().filter(|s| **s).count();
            if sold_count >= 4 && trailing_peak.is_none() {
                *trailing_peak = Some(bar.high);
            }
        }
    }

    if let ExitStrategyState::LayeredTp {
        trailing_peak: Some(peak),
        ..
    } = &mut pos.exit_state
    {
        *peak = peak.max(bar.high);
        let peak = *peak;
        if bar.close < peak * LAYERED_TRAILING_RATIO && pos.shares > 0 {
            return Some(PendingClose {
                code: pos.code.clone(),
                price: bar.close,
                reason: ExitReason::LayeredTrailing,
            });
        }
    }

    None
}

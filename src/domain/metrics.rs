//! Performance summary over a finished run.

use super::trade::{EquitySnapshot, ExitReason, TradeAction, TradeRecord, TradeReason};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate statistics computed from the trade log and equity curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub sell_count: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_profit_pct: f64,
    pub avg_hold_days: f64,
    pub stop_loss_count: usize,
    pub signal_exit_count: usize,
}

impl Summary {
    pub fn compute(
        trades: &[TradeRecord],
        equity_curve: &[EquitySnapshot],
        initial_capital: f64,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let trading_days = equity_curve.len() as f64;
        let years = trading_days / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let sharpe_ratio = compute_sharpe(equity_curve);

        let mut sell_count = 0usize;
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut total_profit_pct = 0.0_f64;
        let mut total_hold_days = 0i64;
        let mut stop_loss_count = 0usize;
        let mut signal_exit_count = 0usize;

        for trade in trades {
            if trade.action != TradeAction::Sell {
                continue;
            }
            sell_count += 1;

            if let Some(profit) = trade.profit {
                if profit > 0.0 {
                    trades_won += 1;
                    total_wins += profit;
                } else if profit < 0.0 {
                    trades_lost += 1;
                    total_losses += profit.abs();
                }
            }
            total_profit_pct += trade.profit_pct.unwrap_or(0.0);
            total_hold_days += trade.hold_days.unwrap_or(0);

            match trade.reason {
                TradeReason::Exit(ExitReason::StopLoss)
                | TradeReason::Exit(ExitReason::BreakevenExit) => stop_loss_count += 1,
                TradeReason::Exit(ExitReason::SellSignal) => signal_exit_count += 1,
                _ => {}
            }
        }

        let win_rate = if sell_count > 0 {
            trades_won as f64 / sell_count as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };
        let avg_profit_pct = if sell_count > 0 {
            total_profit_pct / sell_count as f64
        } else {
            0.0
        };
        let avg_hold_days = if sell_count > 0 {
            total_hold_days as f64 / sell_count as f64
        } else {
            0.0
        };

        Summary {
            total_return,
            annualized_return,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_duration,
            sell_count,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            avg_profit_pct,
            avg_hold_days,
            stop_loss_count,
            signal_exit_count,
        }
    }
}

/// Deepest peak-to-trough loss (as a positive fraction) and the longest
/// run of snapshots spent under water.
pub fn compute_drawdown(equity_curve: &[EquitySnapshot]) -> (f64, i64) {
    if equity_curve.is_empty() {
        return (0.0, 0);
    }

    let mut peak = equity_curve[0].equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

/// Annualized Sharpe over daily equity returns, zero risk-free rate.
fn compute_sharpe(equity_curve: &[EquitySnapshot]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        (mean / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

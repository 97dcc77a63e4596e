//! Simulation parameters.
//!
//! One exit mode and one stop-loss style are selected per run; the enums make
//! the mutual exclusivity a construction-time fact rather than a set of flags
//! to cross-check at runtime.

use crate::domain::account::FeeSchedule;
use crate::domain::position::ExitStrategyState;

/// Which take-profit machinery a position runs. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitMode {
    /// Sell half on the first touch of cost * (1 + take_profit), then hold
    /// the rest behind a breakeven stop.
    FixedTp,
    /// Scale out 20% of the opening size at each of +20/40/60/80/100%.
    LayeredTp,
    /// Full exit when price retraces `pullback` from the peak, armed once
    /// profit exceeds the take-profit gate.
    Trailing { pullback: f64 },
    /// Full exit when the retracement from peak reaches `threshold`, armed
    /// once profit reaches `min_profit`.
    Drawdown { threshold: f64, min_profit: f64 },
}

impl ExitMode {
    /// Seed the per-position exit state at open. Peaks start at cost basis.
    pub fn initial_state(&self, cost: f64) -> ExitStrategyState {
        match self {
            ExitMode::FixedTp => ExitStrategyState::FixedTp {
                taken: false,
                breakeven: false,
            },
            ExitMode::LayeredTp => ExitStrategyState::LayeredTp {
                levels_sold: [false; 5],
                trailing_peak: None,
            },
            ExitMode::Trailing { .. } => ExitStrategyState::Trailing { peak: cost },
            ExitMode::Drawdown { .. } => ExitStrategyState::Drawdown { peak: cost },
        }
    }
}

/// How the protective stop price is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopMode {
    /// Percentage of cost, loosened 20% under 5 holding days (capped at 12%)
    /// and tightened 20% past 15 days.
    Progressive,
    /// entry_cost - multiplier * entry_atr, falling back to [`StopMode::Progressive`]
    /// when the entry bar carried no ATR.
    Atr { multiplier: f64 },
}

/// Exit-side parameters consumed by the exit rule engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitConfig {
    pub stop_loss: f64,
    pub take_profit: f64,
    pub exit_mode: ExitMode,
    pub stop_mode: StopMode,
}

impl Default for ExitConfig {
    fn default() -> Self {
        ExitConfig {
            stop_loss: 0.10,
            take_profit: 0.20,
            exit_mode: ExitMode::FixedTp,
            stop_mode: StopMode::Progressive,
        }
    }
}

/// Full parameter set for one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub initial_capital: f64,
    pub max_positions: usize,
    pub fees: FeeSchedule,
    pub exits: ExitConfig,
    /// Initial buys commit 20% of the slot and adds follow at +5%/+10%.
    pub pyramid_enabled: bool,
    /// Candidates below this quality score never enter ranking.
    pub min_quality: f64,
    /// Minimum gate strength when an entry gate is configured.
    pub min_gate_strength: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            initial_capital: 100_000.0,
            max_positions: 5,
            fees: FeeSchedule::default(),
            exits: ExitConfig::default(),
            pyramid_enabled: false,
            min_quality: 60.0,
            min_gate_strength: 60.0,
        }
    }
}

impl SimulatorConfig {
    /// Fixed-fraction slot size: starting capital over slots, never current
    /// equity, so winners do not compound into larger future entries.
    pub fn target_allocation(&self) -> f64 {
        self.initial_capital / self.max_positions as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_allocation_uses_starting_capital() {
        let config = SimulatorConfig {
            initial_capital: 100_000.0,
            max_positions: 5,
            ..SimulatorConfig::default()
        };
        assert!((config.target_allocation() - 20_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn initial_state_matches_mode() {
        assert_eq!(
            ExitMode::FixedTp.initial_state(100.0),
            ExitStrategyState::FixedTp {
                taken: false,
                breakeven: false
            }
        );
        assert_eq!(
            ExitMode::Drawdown {
                threshold: 0.08,
                min_profit: 0.05
            }
            .initial_state(50.0),
            ExitStrategyState::Drawdown { peak: 50.0 }
        );
        assert_eq!(
            ExitMode::Trailing { pullback: 0.15 }.initial_state(80.0),
            ExitStrategyState::Trailing { peak: 80.0 }
        );
        match ExitMode::LayeredTp.initial_state(100.0) {
            ExitStrategyState::LayeredTp {
                levels_sold,
                trailing_peak,
            } => {
                assert_eq!(levels_sold, [false; 5]);
                assert!(trailing_peak.is_none());
            }
            other => panic!("unexpected state {other:?}"),
        }
    }
}

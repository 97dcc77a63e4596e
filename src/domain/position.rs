//! Open position state.

use chrono::NaiveDate;

/// Minimum tradable unit; every fill rounds down to a multiple of this.
pub const LOT: i64 = 100;

/// Unrealized-profit levels that trigger pyramid adds, each once.
pub const PYRAMID_LEVELS: [f64; 2] = [0.05, 0.10];

/// Layered take-profit thresholds measured against cost basis.
pub const LAYERED_TP_LEVELS: [f64; 5] = [0.20, 0.40, 0.60, 0.80, 1.00];

/// Round a share count down to a whole number of lots.
pub fn lot_floor(shares: i64) -> i64 {
    shares / LOT * LOT
}

/// Mode-specific mutable exit state, fixed at position open from the
/// configured exit mode. A tagged variant instead of optional fields so a
/// position can never carry state for a mode that is not running.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitStrategyState {
    /// Layered take-profit: which of [`LAYERED_TP_LEVELS`] are consumed, and
    /// the trailing peak once the final tranche has switched to trailing.
    LayeredTp {
        levels_sold: [bool; 5],
        trailing_peak: Option<f64>,
    },
    /// Retracement-from-peak exit.
    Drawdown { peak: f64 },
    /// Trailing stop armed after the take-profit gate.
    Trailing { peak: f64 },
    /// Classic half-out take-profit with breakeven stop afterwards.
    FixedTp { taken: bool, breakeven: bool },
}

impl ExitStrategyState {
    pub fn breakeven_active(&self) -> bool {
        matches!(self, ExitStrategyState::FixedTp { breakeven: true, .. })
    }
}

/// Pyramid-add bookkeeping; `filled[i]` marks [`PYRAMID_LEVELS`]`[i]` consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PyramidState {
    pub filled: [bool; 2],
}

/// One open holding. Created by an admitted buy, mutated by partial sells,
/// pyramid adds and peak updates, removed when fully closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub code: String,
    pub name: String,
    pub shares: i64,
    /// Share count of the opening fill; ratio-based partial exits and pyramid
    /// adds are sized against this, not the current count.
    pub initial_shares: i64,
    /// Volume-weighted cost basis across the opening fill and any adds.
    pub cost_price: f64,
    pub entry_date: NaiveDate,
    pub entry_quality: f64,
    pub entry_atr: f64,
    /// Mark price carried forward across days with no bar.
    pub last_close: f64,
    pub exit_state: ExitStrategyState,
    pub pyramid: PyramidState,
}

impl Position {
    pub fn market_value(&self) -> f64 {
        self.shares as f64 * self.last_close
    }

    /// Unrealized return of `price` against the weighted cost basis.
    pub fn profit_pct(&self, price: f64) -> f64 {
        (price - self.cost_price) / self.cost_price
    }

    /// Calendar days held as of `date`.
    pub fn hold_days(&self, date: NaiveDate) -> i64 {
        (date - self.entry_date).num_days()
    }

    /// Fold an additional fill into the volume-weighted cost basis.
    pub fn add_shares(&mut self, added: i64, price: f64) {
        let old_shares = self.shares;
        self.shares += added;
        let total_cost = self.cost_price * old_shares as f64 + price * added as f64;
        self.cost_price = total_cost / self.shares as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position() -> Position {
        Position {
            code: "SZ300750".into(),
            name: "CATL".into(),
            shares: 1000,
            initial_shares: 1000,
            cost_price: 100.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            entry_quality: 75.0,
            entry_atr: 2.5,
            last_close: 100.0,
            exit_state: ExitStrategyState::FixedTp {
                taken: false,
                breakeven: false,
            },
            pyramid: PyramidState::default(),
        }
    }

    #[test]
    fn lot_floor_rounds_down() {
        assert_eq!(lot_floor(0), 0);
        assert_eq!(lot_floor(99), 0);
        assert_eq!(lot_floor(100), 100);
        assert_eq!(lot_floor(1999), 1900);
    }

    #[test]
    fn profit_pct_against_cost() {
        let pos = sample_position();
        assert!((pos.profit_pct(110.0) - 0.10).abs() < 1e-12);
        assert!((pos.profit_pct(90.0) - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn hold_days_are_calendar_days() {
        let pos = sample_position();
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(pos.hold_days(date), 7);
        assert_eq!(pos.hold_days(pos.entry_date), 0);
    }

    #[test]
    fn add_shares_recomputes_weighted_cost() {
        let mut pos = sample_position();
        pos.add_shares(200, 110.0);

        assert_eq!(pos.shares, 1200);
        // (100 * 1000 + 110 * 200) / 1200
        let expected = 122_000.0 / 1200.0;
        assert!((pos.cost_price - expected).abs() < 1e-9);
        // initial_shares is immutable through adds
        assert_eq!(pos.initial_shares, 1000);
    }

    #[test]
    fn market_value_uses_last_close() {
        let mut pos = sample_position();
        pos.last_close = 104.5;
        assert!((pos.market_value() - 104_500.0).abs() < 1e-9);
    }

    #[test]
    fn breakeven_only_in_fixed_tp_mode() {
        let mut pos = sample_position();
        assert!(!pos.exit_state.breakeven_active());

        pos.exit_state = ExitStrategyState::FixedTp {
            taken: true,
            breakeven: true,
        };
        assert!(pos.exit_state.breakeven_active());

        pos.exit_state = ExitStrategyState::Drawdown { peak: 120.0 };
        assert!(!pos.exit_state.breakeven_active());
    }
}

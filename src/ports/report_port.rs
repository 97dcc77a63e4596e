//! Report output port trait.

use std::path::Path;

use crate::domain::error::QqetraderError;
use crate::domain::trade::{EquitySnapshot, TradeRecord};

/// Port for persisting a run's trade log and equity curve.
pub trait ReportPort {
    fn write_trades(&self, trades: &[TradeRecord], path: &Path) -> Result<(), QqetraderError>;

    fn write_equity(&self, curve: &[EquitySnapshot], path: &Path) -> Result<(), QqetraderError>;
}

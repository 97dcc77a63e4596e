//! CSV report adapter: trade log and equity curve files.

use std::path::Path;

use crate::domain::error::QqetraderError;
use crate::domain::trade::{EquitySnapshot, TradeRecord};
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

fn report_err(e: impl std::fmt::Display) -> QqetraderError {
    QqetraderError::Report {
        reason: e.to_string(),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_trades(&self, trades: &[TradeRecord], path: &Path) -> Result<(), QqetraderError> {
        let mut writer = csv::Writer::from_path(path).map_err(report_err)?;

        writer
            .write_record([
                "date",
                "code",
                "name",
                "action",
                "price",
                "shares",
                "fee",
                "amount",
                "quality",
                "reason",
                "cash_after",
                "profit",
                "profit_pct",
                "hold_days",
            ])
            .map_err(report_err)?;

        for trade in trades {
            writer
                .write_record([
                    trade.date.format("%Y-%m-%d").to_string(),
                    trade.code.clone(),
                    trade.name.clone(),
                    trade.action.to_string(),
                    format!("{:.3}", trade.price),
                    trade.shares.to_string(),
                    format!("{:.2}", trade.fee),
                    format!("{:.2}", trade.amount),
                    format!("{:.1}", trade.quality),
                    trade.reason.to_string(),
                    format!("{:.2}", trade.cash_after),
                    trade
                        .profit
                        .map(|p| format!("{p:.2}"))
                        .unwrap_or_default(),
                    trade
                        .profit_pct
                        .map(|p| format!("{p:.2}"))
                        .unwrap_or_default(),
                    trade
                        .hold_days
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                ])
                .map_err(report_err)?;
        }

        writer.flush().map_err(report_err)?;
        Ok(())
    }

    fn write_equity(&self, curve: &[EquitySnapshot], path: &Path) -> Result<(), QqetraderError> {
        let mut writer = csv::Writer::from_path(path).map_err(report_err)?;

        writer
            .write_record(["date", "cash", "market_value", "equity", "position_count"])
            .map_err(report_err)?;

        for snap in curve {
            writer
                .write_record([
                    snap.date.format("%Y-%m-%d").to_string(),
                    format!("{:.2}", snap.cash),
                    format!("{:.2}", snap.market_value),
                    format!("{:.2}", snap.equity),
                    snap.position_count.to_string(),
                ])
                .map_err(report_err)?;
        }

        writer.flush().map_err(report_err)?;
        Ok(())
    }
}

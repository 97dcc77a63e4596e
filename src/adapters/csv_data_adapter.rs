//! CSV signal-file data adapter.
//!
//! Reads one `{code}.csv` per instrument from a base directory, with the
//! oracle's output already materialized per row:
//! `date,open,high,low,close,buy_signal,sell_signal,quality,atr`.
//! Columns are matched by header name; `quality` and `atr` are optional and
//! default to 0. An optional `names.csv` (`code,name`) supplies display names.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::QqetraderError;
use crate::domain::signal::{InstrumentInfo, SignalBar};
use crate::ports::data_port::SignalDataPort;

const NAMES_FILE: &str = "names.csv";

pub struct CsvSignalAdapter {
    base_path: PathBuf,
}

impl CsvSignalAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }

    fn load_names(&self) -> BTreeMap<String, String> {
        let mut names = BTreeMap::new();
        let path = self.base_path.join(NAMES_FILE);
        let Ok(mut rdr) = csv::Reader::from_path(&path) else {
            return names;
        };
        for record in rdr.records().flatten() {
            if let (Some(code), Some(name)) = (record.get(0), record.get(1)) {
                names.insert(code.trim().to_string(), name.trim().to_string());
            }
        }
        names
    }
}

fn data_err(reason: String) -> QqetraderError {
    QqetraderError::Data { reason }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "1.0"
    )
}

impl SignalDataPort for CsvSignalAdapter {
    fn fetch_signals(&self, code: &str) -> Result<Vec<SignalBar>, QqetraderError> {
        let path = self.csv_path(code);
        if !path.exists() {
            return Err(QqetraderError::NoData {
                code: code.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path)
            .map_err(|e| data_err(format!("failed to open {}: {e}", path.display())))?;

        let headers = rdr
            .headers()
            .map_err(|e| data_err(format!("CSV header error in {}: {e}", path.display())))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let required = |name: &str| {
            column(name).ok_or_else(|| {
                data_err(format!("missing {name} column in {}", path.display()))
            })
        };
        let date_col = required("date")?;
        let open_col = required("open")?;
        let high_col = required("high")?;
        let low_col = required("low")?;
        let close_col = required("close")?;
        let buy_col = column("buy_signal");
        let sell_col = column("sell_signal");
        let quality_col = column("quality");
        let atr_col = column("atr");

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| data_err(format!("CSV parse error in {code}: {e}")))?;

            let field = |i: usize, name: &str| {
                record
                    .get(i)
                    .ok_or_else(|| data_err(format!("short row in {code}: missing {name}")))
            };
            let number = |i: usize, name: &str| -> Result<f64, QqetraderError> {
                field(i, name)?
                    .trim()
                    .parse()
                    .map_err(|e| data_err(format!("invalid {name} value in {code}: {e}")))
            };
            // Missing optional columns degrade to 0 / no-signal.
            let optional_number = |col: Option<usize>| -> f64 {
                col.and_then(|i| record.get(i))
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0.0)
            };
            let optional_flag = |col: Option<usize>| -> bool {
                col.and_then(|i| record.get(i)).is_some_and(parse_flag)
            };

            let date = NaiveDate::parse_from_str(field(date_col, "date")?.trim(), "%Y-%m-%d")
                .map_err(|e| data_err(format!("invalid date in {code}: {e}")))?;

            bars.push(SignalBar {
                date,
                open: number(open_col, "open")?,
                high: number(high_col, "high")?,
                low: number(low_col, "low")?,
                close: number(close_col, "close")?,
                buy_signal: optional_flag(buy_col),
                sell_signal: optional_flag(sell_col),
                quality: optional_number(quality_col),
                atr: optional_number(atr_col),
            });
        }

        Ok(bars)
    }

    fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, QqetraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_err(format!(
                "failed to read directory {}: {e}",
                self.base_path.display()
            ))
        })?;

        let names = self.load_names();
        let mut instruments = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| data_err(format!("directory entry error: {e}")))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();

            if file_name == NAMES_FILE {
                continue;
            }
            if let Some(code) = file_name.strip_suffix(".csv") {
                instruments.push(InstrumentInfo {
                    code: code.to_string(),
                    name: names.get(code).cloned().unwrap_or_else(|| code.to_string()),
                });
            }
        }

        instruments.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(instruments)
    }
}

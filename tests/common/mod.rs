#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;

use qqetrader::domain::config::SimulatorConfig;
use qqetrader::domain::error::QqetraderError;
use qqetrader::domain::signal::{InstrumentInfo, InstrumentSeries, MarketData, SignalBar};
use qqetrader::ports::data_port::SignalDataPort;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

pub fn bar(d: u32, open: f64, high: f64, low: f64, close: f64) -> SignalBar {
    SignalBar {
        date: day(d),
        open,
        high,
        low,
        close,
        buy_signal: false,
        sell_signal: false,
        quality: 0.0,
        atr: 0.0,
    }
}

pub fn flat_bar(d: u32, close: f64) -> SignalBar {
    bar(d, close, close, close, close)
}

pub fn buy_bar(d: u32, close: f64, quality: f64) -> SignalBar {
    SignalBar {
        buy_signal: true,
        quality,
        ..flat_bar(d, close)
    }
}

pub fn sell_bar(d: u32, close: f64) -> SignalBar {
    SignalBar {
        sell_signal: true,
        ..flat_bar(d, close)
    }
}

pub fn series(code: &str, bars: Vec<SignalBar>) -> InstrumentSeries {
    InstrumentSeries::new(code.to_string(), code.to_string(), bars)
}

pub fn market_of(all: Vec<InstrumentSeries>) -> MarketData {
    MarketData::from_series(all)
}

pub fn default_config() -> SimulatorConfig {
    SimulatorConfig::default()
}

/// In-memory data port for pipeline tests.
pub struct MockSignalPort {
    pub data: HashMap<String, Vec<SignalBar>>,
}

impl MockSignalPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<SignalBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }
}

impl SignalDataPort for MockSignalPort {
    fn fetch_signals(&self, code: &str) -> Result<Vec<SignalBar>, QqetraderError> {
        self.data
            .get(code)
            .cloned()
            .ok_or_else(|| QqetraderError::NoData {
                code: code.to_string(),
            })
    }

    fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, QqetraderError> {
        let mut codes: Vec<&String> = self.data.keys().collect();
        codes.sort();
        Ok(codes
            .into_iter()
            .map(|code| InstrumentInfo {
                code: code.clone(),
                name: code.clone(),
            })
            .collect())
    }
}

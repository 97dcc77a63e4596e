//! Index-trend entry gate.
//!
//! Judges whether the broad index an instrument belongs to is trending up,
//! from caller-supplied daily index bars. Verdicts are computed on the bars
//! up to and including the requested date, so the same adapter serves every
//! day of a replay without peeking ahead.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::ports::gate_port::{EntryGatePort, GateDecision};

/// Daily bar of an index series; no signals attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexBar {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// How strictly the trend is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMode {
    /// Close above the 20- and 60-day means, short mean above long.
    Simple,
    /// Aligned short means, rising 20-day mean, price off the 60-day floor.
    Moderate,
}

/// History below this many bars is treated as no-trend: entry denied,
/// neutral strength.
const MIN_INDEX_BARS: usize = 60;
const NEUTRAL_STRENGTH: f64 = 50.0;

pub struct IndexTrendGate {
    mode: TrendMode,
    series: BTreeMap<String, Vec<IndexBar>>,
    assignments: BTreeMap<String, String>,
    default_index: Option<String>,
}

impl IndexTrendGate {
    pub fn new(mode: TrendMode) -> Self {
        Self {
            mode,
            series: BTreeMap::new(),
            assignments: BTreeMap::new(),
            default_index: None,
        }
    }

    pub fn with_series(mut self, index_code: &str, mut bars: Vec<IndexBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        self.series.insert(index_code.to_string(), bars);
        self
    }

    /// Route one instrument to a specific index.
    pub fn assign(mut self, instrument: &str, index_code: &str) -> Self {
        self.assignments
            .insert(instrument.to_string(), index_code.to_string());
        self
    }

    /// Index used for instruments with no explicit assignment.
    pub fn with_default_index(mut self, index_code: &str) -> Self {
        self.default_index = Some(index_code.to_string());
        self
    }

    fn index_for(&self, instrument: &str) -> Option<&str> {
        self.assignments
            .get(instrument)
            .map(String::as_str)
            .or(self.default_index.as_deref())
    }

    /// Bars up to and including `date`.
    fn window<'a>(&'a self, index_code: &str, date: NaiveDate) -> &'a [IndexBar] {
        let Some(bars) = self.series.get(index_code) else {
            return &[];
        };
        let end = bars.partition_point(|b| b.date <= date);
        &bars[..end]
    }

    fn is_bullish(&self, bars: &[IndexBar]) -> bool {
        if bars.len() < MIN_INDEX_BARS {
            return false;
        }
        let close = bars[bars.len() - 1].close;

        match self.mode {
            TrendMode::Simple => {
                let ma20 = close_mean(bars, 20);
                let ma60 = close_mean(bars, 60);
                close > ma20 && close > ma60 && ma20 > ma60
            }
            TrendMode::Moderate => {
                let ma5 = close_mean(bars, 5);
                let ma10 = close_mean(bars, 10);
                let ma20 = close_mean(bars, 20);

                let aligned = close > ma5 && ma5 > ma10 && ma10 > ma20;
                let ma20_rising = ma20 > close_mean(&bars[..bars.len() - 5], 20);

                let (high, low) = close_range(bars, 60);
                let position = if high > low {
                    (close - low) / (high - low)
                } else {
                    0.5
                };

                aligned && ma20_rising && position > 0.3
            }
        }
    }

    /// 0-100 composite: mean placement, position in the 60-day range, 20-day
    /// mean slope, and 5-day momentum, 25 points each.
    fn trend_strength(&self, bars: &[IndexBar]) -> f64 {
        if bars.len() < MIN_INDEX_BARS {
            return NEUTRAL_STRENGTH;
        }
        let close = bars[bars.len() - 1].close;
        let mut score = 0.0;

        let ma20 = close_mean(bars, 20);
        let ma60 = close_mean(bars, 60);
        if close > ma20 {
            score += 10.0;
        }
        if close > ma60 {
            score += 10.0;
        }
        if ma20 > ma60 {
            score += 5.0;
        }

        let (high_60, low_60) = bar_range(bars, 60);
        let position = if high_60 > low_60 {
            (close - low_60) / (high_60 - low_60)
        } else {
            0.5
        };
        score += position * 25.0;

        let ma20_prev = close_mean(&bars[..bars.len() - 5], 20);
        if ma20_prev > 0.0 {
            let direction = (ma20 - ma20_prev) / ma20_prev;
            score += (direction * 500.0).clamp(0.0, 25.0);
        }

        let close_prev = bars[bars.len() - 6].close;
        if close_prev > 0.0 {
            let momentum = (close - close_prev) / close_prev;
            score += (momentum * 250.0).clamp(0.0, 25.0);
        }

        score.clamp(0.0, 100.0)
    }
}

impl EntryGatePort for IndexTrendGate {
    fn should_allow(&self, code: &str, date: NaiveDate) -> GateDecision {
        let Some(index_code) = self.index_for(code) else {
            return GateDecision {
                allow: false,
                strength: NEUTRAL_STRENGTH,
            };
        };
        let bars = self.window(index_code, date);
        GateDecision {
            allow: self.is_bullish(bars),
            strength: self.trend_strength(bars),
        }
    }
}

/// Mean of the last `n` closes.
fn close_mean(bars: &[IndexBar], n: usize) -> f64 {
    let tail = &bars[bars.len().saturating_sub(n)..];
    tail.iter().map(|b| b.close).sum::<f64>() / tail.len() as f64
}

/// (max, min) of the last `n` closes.
fn close_range(bars: &[IndexBar], n: usize) -> (f64, f64) {
    let tail = &bars[bars.len().saturating_sub(n)..];
    let high = tail.iter().map(|b| b.close).fold(f64::MIN, f64::max);
    let low = tail.iter().map(|b| b.close).fold(f64::MAX, f64::min);
    (high, low)
}

/// (max high, min low) of the last `n` bars.
fn bar_range(bars: &[IndexBar], n: usize) -> (f64, f64) {
    let tail = &bars[bars.len().saturating_sub(n)..];
    let high = tail.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = tail.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    (high, low)
}

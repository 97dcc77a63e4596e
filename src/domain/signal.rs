//! Precomputed signal bars and the date-aligned market view.
//!
//! The strategy oracle runs upstream; the simulator only ever sees its
//! output: one [`SignalBar`] per instrument per trading day.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Minimum bars an instrument needs before it is worth simulating.
pub const MIN_SIGNAL_BARS: usize = 60;

/// One daily bar plus the oracle's verdict for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub buy_signal: bool,
    pub sell_signal: bool,
    /// Composite 0-100 confidence score; 0 when the oracle emitted none.
    pub quality: f64,
    pub atr: f64,
}

/// Identity of a tradable instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentInfo {
    pub code: String,
    pub name: String,
}

/// All signal bars for one instrument, indexed by date.
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    pub code: String,
    pub name: String,
    pub bars: Vec<SignalBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl InstrumentSeries {
    pub fn new(code: String, name: String, mut bars: Vec<SignalBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            code,
            name,
            bars,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&SignalBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }
}

/// Per-day view of the whole universe, on a unified ascending timeline.
///
/// Days and instruments-within-a-day are both BTreeMaps: the admission pass
/// tie-breaks candidates by scan order, so iteration order must be stable
/// across runs for the trade log to replay identically.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    names: BTreeMap<String, String>,
    days: BTreeMap<NaiveDate, BTreeMap<String, SignalBar>>,
}

impl MarketData {
    pub fn from_series(series: Vec<InstrumentSeries>) -> Self {
        let mut names = BTreeMap::new();
        let mut days: BTreeMap<NaiveDate, BTreeMap<String, SignalBar>> = BTreeMap::new();

        for inst in series {
            names.insert(inst.code.clone(), inst.name.clone());
            for bar in &inst.bars {
                days.entry(bar.date)
                    .or_default()
                    .insert(inst.code.clone(), *bar);
            }
        }

        Self { names, days }
    }

    pub fn instrument_count(&self) -> usize {
        self.names.len()
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn name_of<'a>(&'a self, code: &'a str) -> &'a str {
        self.names.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Ascending trading-day timeline over all instruments.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&BTreeMap<String, SignalBar>> {
        self.days.get(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(date: &str, close: f64) -> SignalBar {
        SignalBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            buy_signal: false,
            sell_signal: false,
            quality: 0.0,
            atr: 0.0,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn series_sorts_bars_and_builds_index() {
        let series = InstrumentSeries::new(
            "SZ300750".into(),
            "CATL".into(),
            vec![
                make_bar("2024-01-03", 102.0),
                make_bar("2024-01-01", 100.0),
                make_bar("2024-01-02", 101.0),
            ],
        );

        assert_eq!(series.bar_count(), 3);
        assert_eq!(series.bars[0].date, date("2024-01-01"));
        assert_eq!(series.bars[2].date, date("2024-01-03"));

        let bar = series.get_bar(date("2024-01-02")).unwrap();
        assert!((bar.close - 101.0).abs() < f64::EPSILON);
        assert!(series.get_bar(date("2024-01-05")).is_none());
    }

    #[test]
    fn market_data_merges_timelines() {
        let a = InstrumentSeries::new(
            "SZ300750".into(),
            "CATL".into(),
            vec![make_bar("2024-01-02", 100.0), make_bar("2024-01-05", 101.0)],
        );
        let b = InstrumentSeries::new(
            "SH688981".into(),
            "SMIC".into(),
            vec![make_bar("2024-01-01", 50.0), make_bar("2024-01-03", 51.0)],
        );

        let market = MarketData::from_series(vec![a, b]);

        let timeline: Vec<NaiveDate> = market.dates().collect();
        assert_eq!(
            timeline,
            vec![
                date("2024-01-01"),
                date("2024-01-02"),
                date("2024-01-03"),
                date("2024-01-05"),
            ]
        );
        assert_eq!(market.instrument_count(), 2);
        assert_eq!(market.day_count(), 4);
    }

    #[test]
    fn day_view_contains_only_instruments_with_bars() {
        let a = InstrumentSeries::new(
            "AAA".into(),
            "AAA".into(),
            vec![make_bar("2024-01-01", 10.0)],
        );
        let b = InstrumentSeries::new(
            "BBB".into(),
            "BBB".into(),
            vec![make_bar("2024-01-02", 20.0)],
        );

        let market = MarketData::from_series(vec![a, b]);

        let day1 = market.day(date("2024-01-01")).unwrap();
        assert!(day1.contains_key("AAA"));
        assert!(!day1.contains_key("BBB"));
        assert!(market.day(date("2024-01-03")).is_none());
    }

    #[test]
    fn name_lookup_falls_back_to_code() {
        let market = MarketData::from_series(vec![InstrumentSeries::new(
            "AAA".into(),
            "Alpha".into(),
            vec![make_bar("2024-01-01", 10.0)],
        )]);

        assert_eq!(market.name_of("AAA"), "Alpha");
        assert_eq!(market.name_of("ZZZ"), "ZZZ");
    }

    #[test]
    fn day_scan_order_is_code_order() {
        let market = MarketData::from_series(vec![
            InstrumentSeries::new("ZZZ".into(), "Z".into(), vec![make_bar("2024-01-01", 1.0)]),
            InstrumentSeries::new("AAA".into(), "A".into(), vec![make_bar("2024-01-01", 2.0)]),
            InstrumentSeries::new("MMM".into(), "M".into(), vec![make_bar("2024-01-01", 3.0)]),
        ]);

        let codes: Vec<&String> = market.day(date("2024-01-01")).unwrap().keys().collect();
        assert_eq!(codes, vec!["AAA", "MMM", "ZZZ"]);
    }
}

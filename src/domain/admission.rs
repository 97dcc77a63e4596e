//! Entry admission: collect the day's candidates, rank them by quality, and
//! admit the best until slots or capital run out.

use chrono::NaiveDate;
use std::cmp::Ordering;

use super::config::SimulatorConfig;
use super::execution;
use super::portfolio::SimulatorState;
use super::position::{lot_floor, LOT};
use super::signal::MarketData;
use crate::ports::gate_port::EntryGatePort;

/// One admissible buy signal; exists only during the day's admission pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub quality: f64,
    pub atr: f64,
}

/// Counters for gate consults, reported alongside the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub total_signals: u64,
    pub blocked: u64,
    pub passed: u64,
}

/// Scan the day's bars for admissible candidates. Held instruments and
/// sub-threshold quality are dropped; the gate (when present) is consulted
/// last and its verdicts counted.
pub fn collect_candidates(
    market: &MarketData,
    date: NaiveDate,
    state: &SimulatorState,
    config: &SimulatorConfig,
    gate: Option<&dyn EntryGatePort>,
    stats: &mut GateStats,
) -> Vec<Candidate> {
    let Some(day) = market.day(date) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for (code, bar) in day {
        if !bar.buy_signal {
            continue;
        }
        stats.total_signals += 1;

        if state.has_position(code) || bar.quality < config.min_quality {
            continue;
        }

        if let Some(gate) = gate {
            let decision = gate.should_allow(code, date);
            if !decision.allow || decision.strength < config.min_gate_strength {
                stats.blocked += 1;
                continue;
            }
            stats.passed += 1;
        }

        candidates.push(Candidate {
            code: code.clone(),
            name: market.name_of(code).to_string(),
            price: bar.close,
            quality: bar.quality,
            atr: bar.atr,
        });
    }
    candidates
}

/// Quality descending; the sort is stable so ties keep their scan order.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
}

/// Walk the ranked list, opening positions until slots or cash run out.
///
/// Sizing is fixed-fractional against *starting* capital: target =
/// initial_capital / max_positions, capped by current cash, with only 20%
/// committed up front when pyramiding is on. Share counts reserve the
/// commission rate per share and round down to whole lots; the final
/// affordability check covers the flat fee floor so cash can never go
/// negative.
pub fn admit_entries(
    state: &mut SimulatorState,
    candidates: &[Candidate],
    config: &SimulatorConfig,
    date: NaiveDate,
) {
    for cand in candidates {
        if state.position_count() >= config.max_positions {
            break;
        }

        let target = config.target_allocation();
        let mut available = state.account.cash.min(target);
        if config.pyramid_enabled {
            available *= 0.20;
        }

        let per_share = cand.price * (1.0 + config.fees.commission_rate);
        if available < per_share * LOT as f64 {
            continue;
        }

        let shares = lot_floor((available / per_share) as i64);
        if shares < LOT {
            continue;
        }

        let notional = shares as f64 * cand.price;
        if !state.account.can_afford(notional) {
            continue;
        }

        execution::open_position(
            state,
            date,
            &cand.code,
            &cand.name,
            cand.price,
            shares,
            cand.quality,
            cand.atr,
            config.exits.exit_mode.initial_state(cand.price),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{InstrumentSeries, SignalBar};
    use crate::ports::gate_port::GateDecision;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn signal_bar(day: u32, close: f64, quality: f64) -> SignalBar {
        SignalBar {
            date: date(day),
            open: close,
            high: close,
            low: close,
            close,
            buy_signal: true,
            sell_signal: false,
            quality,
            atr: 0.0,
        }
    }

    fn market_of(bars: Vec<(&str, SignalBar)>) -> MarketData {
        MarketData::from_series(
            bars.into_iter()
                .map(|(code, bar)| {
                    InstrumentSeries::new(code.to_string(), code.to_string(), vec![bar])
                })
                .collect(),
        )
    }

    fn fresh_state(config: &SimulatorConfig) -> SimulatorState {
        SimulatorState::new(config.initial_capital, config.fees)
    }

    struct FixedGate {
        allow: bool,
        strength: f64,
    }

    impl EntryGatePort for FixedGate {
        fn should_allow(&self, _code: &str, _date: NaiveDate) -> GateDecision {
            GateDecision {
                allow: self.allow,
                strength: self.strength,
            }
        }
    }

    #[test]
    fn collect_drops_low_quality_and_held() {
        let config = SimulatorConfig::default();
        let market = market_of(vec![
            ("AAA", signal_bar(2, 10.0, 80.0)),
            ("BBB", signal_bar(2, 10.0, 40.0)),
            ("CCC", signal_bar(2, 10.0, 75.0)),
        ]);
        let mut state = fresh_state(&config);
        // pretend CCC is already held
        let candidates_pre = collect_candidates(
            &market,
            date(2),
            &state,
            &config,
            None,
            &mut GateStats::default(),
        );
        assert_eq!(candidates_pre.len(), 2);

        admit_entries(&mut state, &candidates_pre[1..], &config, date(2));
        assert!(state.has_position("CCC"));

        let mut stats = GateStats::default();
        let candidates = collect_candidates(&market, date(2), &state, &config, None, &mut stats);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].code, "AAA");
        assert_eq!(stats.total_signals, 3);
    }

    #[test]
    fn gate_blocks_and_counts() {
        let config = SimulatorConfig::default();
        let market = market_of(vec![("AAA", signal_bar(2, 10.0, 80.0))]);
        let state = fresh_state(&config);

        let gate = FixedGate {
            allow: true,
            strength: 30.0, // below the 60 minimum
        };
        let mut stats = GateStats::default();
        let candidates =
            collect_candidates(&market, date(2), &state, &config, Some(&gate), &mut stats);
        assert!(candidates.is_empty());
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.passed, 0);

        let gate = FixedGate {
            allow: true,
            strength: 85.0,
        };
        let mut stats = GateStats::default();
        let candidates =
            collect_candidates(&market, date(2), &state, &config, Some(&gate), &mut stats);
        assert_eq!(candidates.len(), 1);
        assert_eq!(stats.passed, 1);
    }

    #[test]
    fn rank_is_quality_descending_and_stable() {
        let mut candidates = vec![
            Candidate {
                code: "AAA".into(),
                name: "AAA".into(),
                price: 10.0,
                quality: 70.0,
                atr: 0.0,
            },
            Candidate {
                code: "BBB".into(),
                name: "BBB".into(),
                price: 10.0,
                quality: 90.0,
                atr: 0.0,
            },
            Candidate {
                code: "CCC".into(),
                name: "CCC".into(),
                price: 10.0,
                quality: 70.0,
                atr: 0.0,
            },
        ];
        rank(&mut candidates);
        let codes: Vec<&str> = candidates.iter().map(|c| c.code.as_str()).collect();
        // AAA and CCC tie at 70; AAA keeps its earlier scan position
        assert_eq!(codes, vec!["BBB", "AAA", "CCC"]);
    }

    #[test]
    fn only_best_candidate_fits_last_slot() {
        let config = SimulatorConfig {
            max_positions: 1,
            ..SimulatorConfig::default()
        };
        let market = market_of(vec![
            ("AAA", signal_bar(2, 10.0, 60.0)),
            ("BBB", signal_bar(2, 10.0, 80.0)),
        ]);
        let mut state = fresh_state(&config);

        let mut candidates = collect_candidates(
            &market,
            date(2),
            &state,
            &config,
            None,
            &mut GateStats::default(),
        );
        rank(&mut candidates);
        admit_entries(&mut state, &candidates, &config, date(2));

        assert!(state.has_position("BBB"));
        assert!(!state.has_position("AAA"));
        assert_eq!(state.position_count(), 1);
    }

    #[test]
    fn sizing_rounds_down_to_lots() {
        let config = SimulatorConfig::default(); // 100k / 5 = 20k per slot
        let mut state = fresh_state(&config);
        let candidates = vec![Candidate {
            code: "AAA".into(),
            name: "AAA".into(),
            price: 10.0,
            quality: 80.0,
            atr: 0.0,
        }];
        admit_entries(&mut state, &candidates, &config, date(2));

        let pos = state.positions.get("AAA").unwrap();
        // 20_000 / (10 * 1.0003) = 1999.4 -> 1900 after lot rounding
        assert_eq!(pos.shares, 1900);
    }

    #[test]
    fn candidate_skipped_when_cash_below_one_lot() {
        let config = SimulatorConfig::default();
        let mut state = fresh_state(&config);
        state.account.cash = 500.0; // one lot at 10.0 costs ~1000
        let candidates = vec![Candidate {
            code: "AAA".into(),
            name: "AAA".into(),
            price: 10.0,
            quality: 80.0,
            atr: 0.0,
        }];
        admit_entries(&mut state, &candidates, &config, date(2));
        assert!(state.positions.is_empty());
        assert!((state.account.cash - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pyramiding_commits_a_fifth_up_front() {
        let config = SimulatorConfig {
            pyramid_enabled: true,
            ..SimulatorConfig::default()
        };
        let mut state = fresh_state(&config);
        let candidates = vec![Candidate {
            code: "AAA".into(),
            name: "AAA".into(),
            price: 10.0,
            quality: 80.0,
            atr: 0.0,
        }];
        admit_entries(&mut state, &candidates, &config, date(2));

        let pos = state.positions.get("AAA").unwrap();
        // 20% of the 20k slot = 4_000 -> 300 shares after lot rounding
        assert_eq!(pos.shares, 300);
    }

    #[test]
    fn second_admission_limited_by_remaining_cash() {
        // First admission eats most of the cash; the second sizes to what is
        // left rather than the full slot.
        let config = SimulatorConfig {
            initial_capital: 30_000.0,
            max_positions: 2,
            ..SimulatorConfig::default()
        };
        let mut state = fresh_state(&config);
        let make = |code: &str, quality: f64| Candidate {
            code: code.into(),
            name: code.into(),
            price: 100.0,
            quality,
            atr: 0.0,
        };
        let mut candidates = vec![make("AAA", 90.0), make("BBB", 70.0)];
        rank(&mut candidates);
        admit_entries(&mut state, &candidates, &config, date(2));

        // slot = 15_000 -> 100 shares each; both fit
        assert_eq!(state.positions.get("AAA").unwrap().shares, 100);
        assert_eq!(state.positions.get("BBB").unwrap().shares, 100);
        assert!(state.account.cash >= 0.0);
    }

    #[test]
    fn cash_never_goes_negative_under_flat_fee() {
        // Cash exactly covers the lot notional but not the flat fee floor;
        // the affordability guard must reject the buy.
        let config = SimulatorConfig {
            initial_capital: 1_000.4,
            max_positions: 1,
            ..SimulatorConfig::default()
        };
        let mut state = fresh_state(&config);
        let candidates = vec![Candidate {
            code: "AAA".into(),
            name: "AAA".into(),
            price: 10.0,
            quality: 80.0,
            atr: 0.0,
        }];
        admit_entries(&mut state, &candidates, &config, date(2));
        assert!(state.positions.is_empty());
        assert!(state.account.cash >= 0.0);
    }
}

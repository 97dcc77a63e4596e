//! Pre-construction validation of simulation configuration.
//!
//! The simulator assumes validated parameters; everything here runs before a
//! [`crate::domain::config::SimulatorConfig`] is ever built.

use crate::domain::error::QqetraderError;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), QqetraderError> {
    validate_capital(config)?;
    validate_max_positions(config)?;
    validate_rates(config)?;
    validate_exit_levels(config)?;
    validate_exit_mode_exclusivity(config)?;
    validate_quality_thresholds(config)?;
    validate_gate(config)?;
    Ok(())
}

/// Parse a comma-separated quality threshold list, e.g. `50,60,70`.
pub fn parse_thresholds(input: &str) -> Result<Vec<f64>, QqetraderError> {
    let mut thresholds = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        let value: f64 = trimmed.parse().map_err(|_| invalid(
            "backtest",
            "quality_thresholds",
            format!("'{trimmed}' is not a number"),
        ))?;
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid(
                "backtest",
                "quality_thresholds",
                format!("{value} is outside 0..=100"),
            ));
        }
        thresholds.push(value);
    }
    Ok(thresholds)
}

fn invalid(section: &str, key: &str, reason: String) -> QqetraderError {
    QqetraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn validate_capital(config: &dyn ConfigPort) -> Result<(), QqetraderError> {
    let value = config.get_float("backtest", "initial_capital", 100_000.0);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive".into(),
        ));
    }
    Ok(())
}

fn validate_max_positions(config: &dyn ConfigPort) -> Result<(), QqetraderError> {
    let value = config.get_int("backtest", "max_positions", 5);
    if value < 1 {
        return Err(invalid(
            "backtest",
            "max_positions",
            "max_positions must be at least 1".into(),
        ));
    }
    Ok(())
}

fn validate_rates(config: &dyn ConfigPort) -> Result<(), QqetraderError> {
    for key in ["commission_rate", "min_commission", "slippage_rate"] {
        let value = config.get_float("backtest", key, 0.0);
        if value < 0.0 {
            return Err(invalid(
                "backtest",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }
    Ok(())
}

fn validate_exit_levels(config: &dyn ConfigPort) -> Result<(), QqetraderError> {
    for key in [
        "stop_loss",
        "take_profit",
        "trailing_stop",
        "drawdown_threshold",
        "min_profit_for_drawdown",
        "atr_multiplier",
    ] {
        let value = config.get_float("exits", key, 0.0);
        if value < 0.0 {
            return Err(invalid("exits", key, format!("{key} must be non-negative")));
        }
    }

    let stop_loss = config.get_float("exits", "stop_loss", 0.10);
    if stop_loss >= 1.0 {
        return Err(invalid(
            "exits",
            "stop_loss",
            "stop_loss is a fraction of cost, expected below 1.0".into(),
        ));
    }
    Ok(())
}

/// Exactly one take-profit style per run; the original selected them through
/// mutually exclusive branches and this keeps that a configuration-time rule.
fn validate_exit_mode_exclusivity(config: &dyn ConfigPort) -> Result<(), QqetraderError> {
    let layered = config.get_bool("exits", "layered_tp", false);
    let trailing = config.get_float("exits", "trailing_stop", 0.0) > 0.0;
    let drawdown = config.get_bool("exits", "drawdown_exit", false);

    let selected = [layered, trailing, drawdown].iter().filter(|m| **m).count();
    if selected > 1 {
        return Err(invalid(
            "exits",
            "layered_tp",
            "layered_tp, trailing_stop and drawdown_exit are mutually exclusive".into(),
        ));
    }
    Ok(())
}

fn validate_quality_thresholds(config: &dyn ConfigPort) -> Result<(), QqetraderError> {
    if let Some(raw) = config.get_str("backtest", "quality_thresholds") {
        parse_thresholds(&raw)?;
    }
    Ok(())
}

fn validate_gate(config: &dyn ConfigPort) -> Result<(), QqetraderError> {
    if !config.get_bool("gate", "enabled", false) {
        return Ok(());
    }

    match config.get_str("gate", "mode").as_deref() {
        None | Some("simple") | Some("moderate") => {}
        Some(other) => {
            return Err(invalid(
                "gate",
                "mode",
                format!("unknown gate mode '{other}', expected simple or moderate"),
            ));
        }
    }

    match config.get_str("gate", "index") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(QqetraderError::ConfigMissing {
                section: "gate".into(),
                key: "index".into(),
            });
        }
    }

    let strength = config.get_float("gate", "min_strength", 60.0);
    if !(0.0..=100.0).contains(&strength) {
        return Err(invalid(
            "gate",
            "min_strength",
            "min_strength must be within 0..=100".into(),
        ));
    }
    Ok(())
}

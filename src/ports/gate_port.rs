//! Entry gate port trait, consulted only during admission.

use chrono::NaiveDate;

/// Verdict of the gate for one instrument on one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    pub allow: bool,
    /// 0-100 trend strength; the admission pass applies its own minimum.
    pub strength: f64,
}

pub trait EntryGatePort {
    fn should_allow(&self, code: &str, date: NaiveDate) -> GateDecision;
}

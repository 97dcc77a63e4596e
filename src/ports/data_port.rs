//! Signal data access port trait.
//!
//! The oracle runs elsewhere; implementations only hand over its
//! pre-materialized per-day output.

use crate::domain::error::QqetraderError;
use crate::domain::signal::{InstrumentInfo, SignalBar};

pub trait SignalDataPort {
    /// All signal bars for one instrument, any order; callers sort.
    fn fetch_signals(&self, code: &str) -> Result<Vec<SignalBar>, QqetraderError>;

    /// Every instrument the source knows about.
    fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, QqetraderError>;
}

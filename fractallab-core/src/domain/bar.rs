//! PriceBar — the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC bar for a single instrument.
///
/// Bars are immutable once produced by a provider. A series is ordered
/// ascending by `timestamp` with no duplicates (see [`validate_series`]).
/// Date-only input is stamped at midnight; live session bars may carry the
/// time of their last update, which the weekly timing gate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("empty price series")]
    Empty,

    #[error("bar {index} at {timestamp} is not after the previous bar")]
    NotAscending { index: usize, timestamp: NaiveDateTime },

    #[error("bar {index} at {timestamp} fails OHLC sanity checks")]
    Insane { index: usize, timestamp: NaiveDateTime },
}

/// Check the input contract for a series: non-empty, strictly ascending
/// timestamps (which also rules out duplicates), and sane OHLC values.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), BarError> {
    if bars.is_empty() {
        return Err(BarError::Empty);
    }
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(BarError::Insane { index, timestamp: bar.timestamp });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(BarError::NotAscending { index, timestamp: bar.timestamp });
        }
    }
    Ok(())
}

//! Timing gate: may a cadence's signal be emitted yet?
//!
//! The gate reads only the bars of the parent period, never the evaluator's
//! clock. Using the latest bar's own timestamp keeps the decision aligned with
//! the data provider's session labelling and makes reports reproducible.

use chrono::{Datelike, NaiveDateTime};

use crate::config::{CadenceConfig, LockRule};
use crate::domain::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Signal may be emitted; `at` is the earliest bar at which it could be.
    Locked { at: NaiveDateTime },
    /// Still forming.
    Forming(GateWait),
}

/// What the gate is still waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateWait {
    MinBars { have: usize, need: usize },
    DayOfMonth { day: u32, after: u32 },
    SessionClose,
}

impl std::fmt::Display for GateWait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateWait::MinBars { have, need } => write!(f, "waiting for bars: {have} of {need}"),
            GateWait::DayOfMonth { day, after } => {
                write!(f, "reference window open: day {day}, locks after day {after}")
            }
            GateWait::SessionClose => write!(f, "reference session not closed yet"),
        }
    }
}

/// Check the lock rule against a prefix of the period ending at its last bar.
fn check_prefix(prefix: &[PriceBar], config: &CadenceConfig) -> Result<(), GateWait> {
    let Some(latest) = prefix.last() else {
        return Err(GateWait::MinBars { have: 0, need: config.min_bars.max(1) });
    };
    if prefix.len() < config.min_bars {
        return Err(GateWait::MinBars { have: prefix.len(), need: config.min_bars });
    }
    match config.lock {
        LockRule::AfterDayOfMonth { day } => {
            let today = latest.timestamp.day();
            if today > day {
                Ok(())
            } else {
                Err(GateWait::DayOfMonth { day: today, after: day })
            }
        }
        LockRule::AfterBars { bars, session_close } => {
            if prefix.len() < bars {
                return Err(GateWait::MinBars { have: prefix.len(), need: bars });
            }
            match session_close {
                Some(close) if prefix.len() == bars && latest.timestamp.time() < close => {
                    Err(GateWait::SessionClose)
                }
                _ => Ok(()),
            }
        }
        LockRule::Unlocked => Ok(()),
    }
}

/// Decide whether the period's signal is locked.
///
/// Each rule is monotone in the prefix length, so the earliest passing
/// prefix is the lock point and the full period passes iff any prefix does.
pub fn evaluate(period: &[PriceBar], config: &CadenceConfig) -> GateDecision {
    match check_prefix(period, config) {
        Err(wait) => GateDecision::Forming(wait),
        Ok(()) => {
            let at = (1..=period.len())
                .find(|&n| check_prefix(&period[..n], config).is_ok())
                .map(|n| period[n - 1].timestamp);
            match at {
                Some(at) => GateDecision::Locked { at },
                None => GateDecision::Forming(GateWait::MinBars { have: 0, need: config.min_bars }),
            }
        }
    }
}

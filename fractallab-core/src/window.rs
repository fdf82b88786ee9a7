//! Range window extraction.
//!
//! A parent period is the run of bars that share the latest bar's period key
//! (calendar month, ISO week or calendar day). The reference window is always
//! a prefix of that period, so it can never contain bars from outside it.

use chrono::{Datelike, NaiveDateTime};

use crate::config::{CadenceConfig, ReferenceRule};
use crate::domain::{Cadence, PriceBar, PriceRange};

/// A contiguous, non-empty, borrowed run of bars.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    bars: &'a [PriceBar],
}

impl<'a> Window<'a> {
    /// Returns `None` for an empty slice.
    pub fn new(bars: &'a [PriceBar]) -> Option<Self> {
        if bars.is_empty() {
            None
        } else {
            Some(Self { bars })
        }
    }

    pub fn bars(&self) -> &'a [PriceBar] {
        self.bars
    }

    /// Always at least 1; `new` rejects empty slices, so there is no `is_empty`.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn range(&self) -> PriceRange {
        let high = self.bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = self.bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        PriceRange { high, low }
    }

    pub fn first(&self) -> &'a PriceBar {
        &self.bars[0]
    }

    pub fn last(&self) -> &'a PriceBar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn open_price(&self) -> f64 {
        self.first().open
    }

    pub fn close_price(&self) -> f64 {
        self.last().close
    }

    pub fn start(&self) -> NaiveDateTime {
        self.first().timestamp
    }

    pub fn end(&self) -> NaiveDateTime {
        self.last().timestamp
    }
}

/// Why a reference window could not be formed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormingReason {
    /// Fewer bars than the cadence requires.
    InsufficientData { have: usize, need: usize },
}

impl std::fmt::Display for FormingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormingReason::InsufficientData { have, need } => {
                write!(f, "insufficient data: {have} of {need} bars")
            }
        }
    }
}

/// Reference window plus the bars of the period that follow it.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceSplit<'a> {
    pub period: Window<'a>,
    pub reference: Window<'a>,
    /// Bars strictly after the reference window, within the period.
    pub after: &'a [PriceBar],
}

#[derive(Debug, Clone, Copy)]
pub enum Extraction<'a> {
    Ready(ReferenceSplit<'a>),
    Forming(FormingReason),
}

/// The run of bars at the end of `bars` that share the latest bar's period.
pub fn parent_period(bars: &[PriceBar], cadence: Cadence) -> Option<Window<'_>> {
    let last = bars.last()?;
    let key = cadence.period_key(last.timestamp);
    let start = bars
        .iter()
        .rposition(|b| cadence.period_key(b.timestamp) != key)
        .map_or(0, |i| i + 1);
    Window::new(&bars[start..])
}

/// Cut the reference window from the front of a parent period.
pub fn extract_reference<'a>(period: Window<'a>, config: &CadenceConfig) -> Extraction<'a> {
    let bars = period.bars();
    let (len, need) = match config.reference {
        ReferenceRule::DayOfMonthCutoff { day, fallback_bars } => {
            let len = bars.iter().take_while(|b| b.timestamp.day() <= day).count();
            match fallback_bars {
                // Thin start of month (holidays, late data): fall back to the
                // period's first bars once the period itself is long enough.
                Some(n) if len < config.min_bars && bars.len() >= config.min_bars => {
                    (n.min(bars.len()), config.min_bars)
                }
                _ => (len, config.min_bars),
            }
        }
        ReferenceRule::FirstBars { count } => (count.min(bars.len()), count.max(config.min_bars)),
    };
    if len < need {
        return Extraction::Forming(FormingReason::InsufficientData { have: len, need });
    }
    match Window::new(&bars[..len]) {
        Some(reference) => Extraction::Ready(ReferenceSplit { period, reference, after: &bars[len..] }),
        None => Extraction::Forming(FormingReason::InsufficientData { have: 0, need }),
    }
}

//! Signal vocabulary: cadences, biases, targets and grades.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One of the three nested evaluation frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cadence {
    /// Strategic layer: parent period is the calendar month.
    Monthly,
    /// Tactical layer: parent period is the ISO week.
    Weekly,
    /// Execution layer: parent period is the calendar day.
    Daily,
}

/// Key identifying the parent period a bar belongs to for a cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKey {
    Month { year: i32, month: u32 },
    IsoWeek { year: i32, week: u32 },
    Day(NaiveDate),
}

impl Cadence {
    pub const ALL: [Cadence; 3] = [Cadence::Monthly, Cadence::Weekly, Cadence::Daily];

    /// Parent period key of a timestamp under this cadence.
    pub fn period_key(self, ts: NaiveDateTime) -> PeriodKey {
        let date = ts.date();
        match self {
            Cadence::Monthly => PeriodKey::Month { year: date.year(), month: date.month() },
            Cadence::Weekly => {
                let iso = date.iso_week();
                PeriodKey::IsoWeek { year: iso.year(), week: iso.week() }
            }
            Cadence::Daily => PeriodKey::Day(date),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Cadence::Monthly => "monthly",
            Cadence::Weekly => "weekly",
            Cadence::Daily => "daily",
        }
    }
}

/// Directional classification of a reference window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bias {
    Bull,
    Bear,
    /// Degenerate range, or a midpoint tie under `TieBreak::Undefined`.
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    NewHigh,
    NewLow,
    /// Green period close for BULL, red period close for BEAR.
    DirectionalClose,
}

/// Target lifecycle. Extension targets move PENDING -> FULFILLED and never
/// back; directional-close targets stay ACTIVE until the period ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetStatus {
    Pending,
    Active,
    Fulfilled,
}

/// Qualitative label derived from a probability, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    Diamond,
    Platinum,
    GoldPlus,
    Gold,
    Silver,
    Bronze,
    Noise,
}

/// Which configuration tier produced a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionTier {
    Seasonal,
    General,
    Default,
}

/// High/low envelope of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub high: f64,
    pub low: f64,
}

impl PriceRange {
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// A bias frozen for one parent period.
///
/// Built from the reference window only, so later bars in the period can
/// never change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalSignal {
    pub bias: Bias,
    /// Normalized close inside the reference range; `None` for a degenerate range.
    pub position: Option<f64>,
    pub reference_range: PriceRange,
    pub reference_close: f64,
    pub reference_start: NaiveDateTime,
    pub reference_end: NaiveDateTime,
    pub period_start: NaiveDateTime,
    /// Timestamp of the earliest bar at which the timing gate opened.
    pub locked_at: NaiveDateTime,
}

/// A probability-annotated objective owned by a [`FractalSignal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionTarget {
    pub kind: TargetKind,
    pub status: TargetStatus,
    pub probability: f64,
    pub sample_size: Option<u32>,
    pub grade: Grade,
    pub tier: ResolutionTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// First bar that breached the reference range (extension targets only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfilled_at: Option<NaiveDateTime>,
    /// Whether the period currently closes in the biased direction
    /// (directional-close targets only; may flip until the period ends).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_track: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn weekly_key_follows_iso_year() {
        // 2024-12-30 (Mon) belongs to ISO week 1 of 2025.
        assert_eq!(
            Cadence::Weekly.period_key(at(2024, 12, 30)),
            PeriodKey::IsoWeek { year: 2025, week: 1 }
        );
        assert_eq!(
            Cadence::Weekly.period_key(at(2024, 12, 30)),
            Cadence::Weekly.period_key(at(2025, 1, 3))
        );
    }

    #[test]
    fn monthly_key_separates_years() {
        assert_ne!(
            Cadence::Monthly.period_key(at(2023, 2, 1)),
            Cadence::Monthly.period_key(at(2024, 2, 1))
        );
    }

    #[test]
    fn enums_serialize_screaming_snake() {
        assert_eq!(serde_json::to_string(&Bias::Undefined).unwrap(), "\"UNDEFINED\"");
        assert_eq!(serde_json::to_string(&TargetKind::DirectionalClose).unwrap(), "\"DIRECTIONAL_CLOSE\"");
        assert_eq!(serde_json::to_string(&Grade::GoldPlus).unwrap(), "\"GOLD_PLUS\"");
    }

    #[test]
    fn grades_order_best_first() {
        assert!(Grade::Diamond < Grade::Platinum);
        assert!(Grade::Bronze < Grade::Noise);
    }
}

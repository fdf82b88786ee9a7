//! Fulfillment tracking for a locked signal.
//!
//! Every call rescans the whole post-reference slice of the period, so a
//! breach that happened once is reported FULFILLED on every later evaluation
//! without carrying state between calls.

use chrono::NaiveDateTime;

use crate::domain::{Bias, PriceBar, PriceRange, TargetKind, TargetStatus};
use crate::window::Window;

/// Progress of one target before probabilities are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetProgress {
    pub kind: TargetKind,
    pub status: TargetStatus,
    pub fulfilled_at: Option<NaiveDateTime>,
    pub on_track: Option<bool>,
}

/// First bar after the reference window whose high exceeds the range high.
pub fn first_breach_above(range: PriceRange, after: &[PriceBar]) -> Option<NaiveDateTime> {
    after.iter().find(|b| b.high > range.high).map(|b| b.timestamp)
}

/// First bar after the reference window whose low undercuts the range low.
pub fn first_breach_below(range: PriceRange, after: &[PriceBar]) -> Option<NaiveDateTime> {
    after.iter().find(|b| b.low < range.low).map(|b| b.timestamp)
}

fn extension(kind: TargetKind, breach: Option<NaiveDateTime>) -> TargetProgress {
    TargetProgress {
        kind,
        status: if breach.is_some() { TargetStatus::Fulfilled } else { TargetStatus::Pending },
        fulfilled_at: breach,
        on_track: None,
    }
}

fn directional_close(on_track: bool) -> TargetProgress {
    TargetProgress {
        kind: TargetKind::DirectionalClose,
        status: TargetStatus::Active,
        fulfilled_at: None,
        on_track: Some(on_track),
    }
}

/// Targets for `bias`. Only the biased direction is tracked: a BEAR signal
/// never carries a NEW_HIGH target and vice versa.
pub fn track(
    bias: Bias,
    range: PriceRange,
    period: &Window<'_>,
    after: &[PriceBar],
) -> Vec<TargetProgress> {
    let open = period.open_price();
    let close = period.close_price();
    match bias {
        Bias::Bull => vec![
            extension(TargetKind::NewHigh, first_breach_above(range, after)),
            directional_close(close > open),
        ],
        Bias::Bear => vec![
            extension(TargetKind::NewLow, first_breach_below(range, after)),
            directional_close(close < open),
        ],
        Bias::Undefined => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(d: u32, o: f64, h: f64, l: f64, c: f64) -> PriceBar {
        PriceBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, d).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            open: o,
            high: h,
            low: l,
            close: c,
        }
    }

    fn series() -> Vec<PriceBar> {
        vec![
            bar(4, 100.0, 105.0, 98.0, 104.0),
            bar(5, 104.0, 106.0, 103.0, 99.0),
            bar(6, 99.0, 107.0, 98.5, 101.0),
            bar(7, 101.0, 102.0, 97.0, 97.5),
        ]
    }

    #[test]
    fn bear_tracks_new_low_only() {
        let bars = series();
        let period = Window::new(&bars).unwrap();
        let range = PriceRange { high: 106.0, low: 98.0 };
        let targets = track(Bias::Bear, range, &period, &bars[2..]);
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.kind != TargetKind::NewHigh));
        assert_eq!(targets[0].kind, TargetKind::NewLow);
        assert_eq!(targets[0].status, TargetStatus::Fulfilled);
        assert_eq!(targets[0].fulfilled_at, Some(bars[3].timestamp));
        // Period opened at 100 and is at 97.5: red so far.
        assert_eq!(targets[1].status, TargetStatus::Active);
        assert_eq!(targets[1].on_track, Some(true));
    }

    #[test]
    fn bull_new_high_fulfilled_by_later_bar() {
        let bars = series();
        let period = Window::new(&bars).unwrap();
        let range = PriceRange { high: 106.0, low: 98.0 };
        let targets = track(Bias::Bull, range, &period, &bars[2..]);
        assert_eq!(targets[0].kind, TargetKind::NewHigh);
        assert_eq!(targets[0].fulfilled_at, Some(bars[2].timestamp));
        assert_eq!(targets[1].on_track, Some(false));
    }

    #[test]
    fn touching_the_range_is_not_a_breach() {
        let bars = vec![bar(4, 100.0, 106.0, 98.0, 100.0), bar(5, 100.0, 106.0, 98.0, 101.0)];
        let range = PriceRange { high: 106.0, low: 98.0 };
        assert_eq!(first_breach_above(range, &bars[1..]), None);
        assert_eq!(first_breach_below(range, &bars[1..]), None);
    }

    #[test]
    fn undefined_has_no_targets() {
        let bars = series();
        let period = Window::new(&bars).unwrap();
        let range = PriceRange { high: 100.0, low: 100.0 };
        assert!(track(Bias::Undefined, range, &period, &bars[1..]).is_empty());
    }
}

//! Sigma edge: open-to-close move of a period against its sigma threshold,
//! optionally read against the instrument's audited edge table.
//!
//! A weekday trigger for the edge's state wins over the plain state entry,
//! so a Tuesday panic on NQ reads as `REBOUND WED` rather than a generic
//! bear expansion.

use chrono::Weekday;

use crate::config::{EdgeTable, GradeScale};
use crate::domain::{EdgeOutlook, SigmaEdge, SigmaState};
use crate::window::Window;

/// Classify the period-to-date open-to-close return. Returns `None` when the
/// threshold is not a positive finite number or the period opened at zero.
pub fn sigma_edge(period: &Window<'_>, sigma: f64) -> Option<SigmaEdge> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return None;
    }
    let open = period.open_price();
    if open == 0.0 {
        return None;
    }
    let o2c = (period.close_price() - open) / open;
    let state = if o2c > sigma {
        SigmaState::BullExpansion
    } else if o2c < -sigma {
        SigmaState::BearExpansion
    } else {
        SigmaState::Inside
    };
    Some(SigmaEdge { o2c, sigma, multiple: o2c / sigma, state, outlook: None })
}

/// Audited read for `state` on `weekday`. `None` when the table has neither a
/// trigger nor an entry for the state.
pub fn edge_outlook(
    table: &EdgeTable,
    state: SigmaState,
    weekday: Weekday,
    grades: &GradeScale,
) -> Option<EdgeOutlook> {
    if let Some(trigger) = table.trigger(weekday, state) {
        return Some(EdgeOutlook {
            probability: trigger.probability,
            grade: trigger.grade.unwrap_or_else(|| grades.grade_for(trigger.probability)),
            setup: Some(trigger.setup.clone()),
        });
    }
    table.entry(state).map(|entry| EdgeOutlook {
        probability: entry.probability,
        grade: entry.grade.unwrap_or_else(|| grades.grade_for(entry.probability)),
        setup: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgeEntry, EdgeTrigger};
    use crate::domain::{Grade, PriceBar};
    use chrono::NaiveDate;

    fn day(o: f64, c: f64) -> PriceBar {
        PriceBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            open: o,
            high: o.max(c),
            low: o.min(c),
            close: c,
        }
    }

    #[test]
    fn drive_above_sigma_is_bull_expansion() {
        let bars = vec![day(100.0, 102.0)];
        let edge = sigma_edge(&Window::new(&bars).unwrap(), 0.0135).unwrap();
        assert_eq!(edge.state, SigmaState::BullExpansion);
        assert!((edge.o2c - 0.02).abs() < 1e-12);
        assert!((edge.multiple - 0.02 / 0.0135).abs() < 1e-12);
    }

    #[test]
    fn panic_below_sigma_is_bear_expansion() {
        let bars = vec![day(100.0, 98.0)];
        let edge = sigma_edge(&Window::new(&bars).unwrap(), 0.0109).unwrap();
        assert_eq!(edge.state, SigmaState::BearExpansion);
    }

    #[test]
    fn small_move_is_inside() {
        let bars = vec![day(100.0, 100.5)];
        let edge = sigma_edge(&Window::new(&bars).unwrap(), 0.0109).unwrap();
        assert_eq!(edge.state, SigmaState::Inside);
    }

    #[test]
    fn bad_threshold_omits_edge() {
        let bars = vec![day(100.0, 102.0)];
        let w = Window::new(&bars).unwrap();
        assert!(sigma_edge(&w, 0.0).is_none());
        assert!(sigma_edge(&w, f64::NAN).is_none());
    }

    fn nq_daily() -> EdgeTable {
        let entry = |probability| Some(EdgeEntry { probability, grade: None });
        EdgeTable {
            bull_expansion: entry(82.0),
            bear_expansion: entry(84.0),
            inside: entry(50.0),
            triggers: vec![
                EdgeTrigger {
                    weekday: Weekday::Tue,
                    state: SigmaState::BearExpansion,
                    setup: "REBOUND WED".into(),
                    probability: 55.4,
                    grade: Some(Grade::Gold),
                },
                EdgeTrigger {
                    weekday: Weekday::Fri,
                    state: SigmaState::BullExpansion,
                    setup: "CONTINUE MON".into(),
                    probability: 64.5,
                    grade: None,
                },
            ],
        }
    }

    fn scale() -> GradeScale {
        crate::SignalConfig::from_toml(
            r#"
[grades]
floor = "NOISE"
steps = [
    { min_probability = 80.0, grade = "GOLD_PLUS" },
    { min_probability = 60.0, grade = "SILVER" },
]
"#,
        )
        .unwrap()
        .grades
    }

    #[test]
    fn weekday_trigger_replaces_expansion_read() {
        let table = nq_daily();
        let tue = edge_outlook(&table, SigmaState::BearExpansion, Weekday::Tue, &scale()).unwrap();
        assert_eq!(tue.setup.as_deref(), Some("REBOUND WED"));
        assert_eq!(tue.probability, 55.4);
        assert_eq!(tue.grade, Grade::Gold);

        let fri = edge_outlook(&table, SigmaState::BullExpansion, Weekday::Fri, &scale()).unwrap();
        assert_eq!(fri.setup.as_deref(), Some("CONTINUE MON"));
        assert_eq!(fri.grade, Grade::Silver);
    }

    #[test]
    fn plain_expansion_uses_state_entry() {
        let table = nq_daily();
        // Tuesday drive: the Tuesday trigger only covers panics.
        let drive = edge_outlook(&table, SigmaState::BullExpansion, Weekday::Tue, &scale()).unwrap();
        assert_eq!(drive.setup, None);
        assert_eq!(drive.probability, 82.0);
        assert_eq!(drive.grade, Grade::GoldPlus);

        let panic = edge_outlook(&table, SigmaState::BearExpansion, Weekday::Mon, &scale()).unwrap();
        assert_eq!(panic.probability, 84.0);
        assert_eq!(panic.grade, Grade::GoldPlus);
    }

    #[test]
    fn inside_reads_as_noise() {
        let inside = edge_outlook(&nq_daily(), SigmaState::Inside, Weekday::Wed, &scale()).unwrap();
        assert_eq!(inside.probability, 50.0);
        assert_eq!(inside.grade, Grade::Noise);
        assert!(edge_outlook(&EdgeTable::default(), SigmaState::Inside, Weekday::Wed, &scale()).is_none());
    }
}

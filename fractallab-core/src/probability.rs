//! Probability annotation against the layered configuration tables.
//!
//! Resolution order is seasonal override, then the instrument's general
//! table, then the conservative default. An entry that is missing, zero
//! probability or zero samples is skipped, never emitted.

use crate::config::{ProbabilityEntry, SignalConfig};
use crate::domain::{Bias, Cadence, Grade, ResolutionTier, TargetKind};

/// Probability used when no table tier has a usable entry.
pub const DEFAULT_PROBABILITY: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub probability: f64,
    pub sample_size: Option<u32>,
    pub grade: Grade,
    pub tier: ResolutionTier,
    /// Tag of the resolved entry, if it names a setup.
    pub tag: Option<String>,
}

/// Lookup key for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationKey<'a> {
    pub instrument_id: &'a str,
    pub cadence: Cadence,
    /// Calendar month (1–12) of the parent period.
    pub month: u32,
    pub bias: Bias,
    pub kind: TargetKind,
}

pub struct ProbabilityAnnotator<'c> {
    config: &'c SignalConfig,
}

impl<'c> ProbabilityAnnotator<'c> {
    pub fn new(config: &'c SignalConfig) -> Self {
        Self { config }
    }

    pub fn annotate(&self, key: AnnotationKey<'_>) -> Annotation {
        let (probability, sample_size, tier, tag) = match self.resolve(key) {
            Some((entry, tier)) => (entry.probability, entry.samples, tier, entry.tag.clone()),
            None => (DEFAULT_PROBABILITY, None, ResolutionTier::Default, None),
        };
        Annotation {
            probability,
            sample_size,
            grade: self.config.grades.grade_for(probability),
            tier,
            tag,
        }
    }

    fn resolve(&self, key: AnnotationKey<'_>) -> Option<(&'c ProbabilityEntry, ResolutionTier)> {
        let table = self.config.instrument(key.instrument_id)?.table(key.cadence);

        let seasonal = table
            .seasonal_for(key.month)
            .and_then(|s| s.for_bias(key.bias))
            .and_then(|t| t.entry(key.kind))
            .filter(|e| e.is_usable());
        if let Some(entry) = seasonal {
            return Some((entry, ResolutionTier::Seasonal));
        }

        table
            .general
            .for_bias(key.bias)
            .and_then(|t| t.entry(key.kind))
            .filter(|e| e.is_usable())
            .map(|e| (e, ResolutionTier::General))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"
[grades]
floor = "NOISE"
steps = [
    { min_probability = 90.0, grade = "DIAMOND" },
    { min_probability = 85.0, grade = "PLATINUM" },
    { min_probability = 80.0, grade = "GOLD_PLUS" },
    { min_probability = 70.0, grade = "GOLD" },
    { min_probability = 60.0, grade = "SILVER" },
]

[instruments.NQ.weekly.general.bull]
extension = { probability = 80.0 }
directional_close = { probability = 75.0 }

[instruments.NQ.weekly.general.bear]
extension = { probability = 72.0 }

[[instruments.NQ.weekly.seasonal]]
month = 1
bull.extension = { probability = 88.0, tag = "JANUARY EFFECT" }
bear.extension = { probability = 78.6 }
bear.directional_close = { probability = 83.3 }

[[instruments.NQ.weekly.seasonal]]
month = 6
bull.extension = { probability = 85.0, samples = 0 }
"#;

    fn key(month: u32, bias: Bias, kind: TargetKind) -> AnnotationKey<'static> {
        AnnotationKey { instrument_id: "NQ", cadence: Cadence::Weekly, month, bias, kind }
    }

    #[test]
    fn seasonal_entry_wins() {
        let config = SignalConfig::from_toml(TABLES).unwrap();
        let a = ProbabilityAnnotator::new(&config).annotate(key(1, Bias::Bull, TargetKind::NewHigh));
        assert_eq!(a.tier, ResolutionTier::Seasonal);
        assert_eq!(a.probability, 88.0);
        assert_eq!(a.grade, Grade::Platinum);
        assert_eq!(a.tag.as_deref(), Some("JANUARY EFFECT"));
    }

    #[test]
    fn seasonal_gap_falls_to_general() {
        let config = SignalConfig::from_toml(TABLES).unwrap();
        let annotator = ProbabilityAnnotator::new(&config);
        // January has no directional-close override.
        let a = annotator.annotate(key(1, Bias::Bull, TargetKind::DirectionalClose));
        assert_eq!(a.tier, ResolutionTier::General);
        assert_eq!(a.probability, 75.0);
        assert_eq!(a.tag, None);
    }

    #[test]
    fn tag_stays_with_the_entry_that_carries_it() {
        let config = SignalConfig::from_toml(TABLES).unwrap();
        let annotator = ProbabilityAnnotator::new(&config);

        // Same January row, but the bear side has no named setup.
        let low = annotator.annotate(key(1, Bias::Bear, TargetKind::NewLow));
        assert_eq!(low.tier, ResolutionTier::Seasonal);
        assert_eq!(low.probability, 78.6);
        assert_eq!(low.tag, None);

        let close = annotator.annotate(key(1, Bias::Bear, TargetKind::DirectionalClose));
        assert_eq!(close.tier, ResolutionTier::Seasonal);
        assert_eq!(close.probability, 83.3);
        assert_eq!(close.tag, None);
    }

    #[test]
    fn zero_sample_seasonal_falls_through() {
        let config = SignalConfig::from_toml(TABLES).unwrap();
        let a = ProbabilityAnnotator::new(&config).annotate(key(6, Bias::Bull, TargetKind::NewHigh));
        assert_eq!(a.tier, ResolutionTier::General);
        assert_eq!(a.probability, 80.0);
    }

    #[test]
    fn missing_everywhere_uses_default() {
        let config = SignalConfig::from_toml(TABLES).unwrap();
        let annotator = ProbabilityAnnotator::new(&config);
        let a = annotator.annotate(key(3, Bias::Bear, TargetKind::DirectionalClose));
        assert_eq!(a.tier, ResolutionTier::Default);
        assert_eq!(a.probability, DEFAULT_PROBABILITY);
        assert_eq!(a.sample_size, None);
        assert_eq!(a.grade, Grade::Silver);

        let unknown = AnnotationKey { instrument_id: "ZZ", ..key(3, Bias::Bull, TargetKind::NewHigh) };
        assert_eq!(annotator.annotate(unknown).tier, ResolutionTier::Default);
    }

    #[test]
    fn extension_entry_serves_new_low_for_bear() {
        let config = SignalConfig::from_toml(TABLES).unwrap();
        let a = ProbabilityAnnotator::new(&config).annotate(key(3, Bias::Bear, TargetKind::NewLow));
        assert_eq!(a.probability, 72.0);
        assert_eq!(a.grade, Grade::Gold);
    }
}

//! Injected engine configuration: cadence parameters, grade scale and the
//! per-instrument probability tables.
//!
//! The whole document is one TOML file. Nothing in the classification logic
//! reads a compiled-in constant; every cutoff, minimum and tie-break policy
//! lives here so the behaviour of a run is fully described by the
//! configuration and its [`SignalConfig::fingerprint`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bias, Cadence, Grade, SigmaState, TargetKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("serialize config: {0}")]
    Serialize(String),
}

// ─── Cadence parameters ─────────────────────────────────────────────

/// How the reference window is cut from the front of a parent period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceRule {
    /// Bars whose day-of-month is <= `day` (the W1+W2 window of a month).
    /// When that prefix is shorter than `min_bars` but the period is not,
    /// the first `fallback_bars` bars of the period are used instead.
    DayOfMonthCutoff {
        day: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_bars: Option<usize>,
    },
    /// The first `count` bars of the period (D1+D2 of a week).
    FirstBars { count: usize },
}

/// When a cadence's signal may be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockRule {
    /// The latest bar's day-of-month must be strictly greater than `day`.
    AfterDayOfMonth { day: u32 },
    /// At least `bars` bars in the period. When the period holds exactly
    /// `bars` bars and `session_close` is set, the latest bar must be stamped
    /// at or after that time of day.
    AfterBars {
        bars: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_close: Option<NaiveTime>,
    },
    /// No lock: the layer reflects the latest bar directly.
    Unlocked,
}

/// Policy for a close sitting exactly on the 50% midpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TieBreak {
    #[default]
    Undefined,
    Bull,
    Bear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceConfig {
    pub reference: ReferenceRule,
    /// Minimum bars in the parent period and in the reference window.
    pub min_bars: usize,
    pub lock: LockRule,
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Emit a NEW_HIGH/NEW_LOW target. Off for the daily layer, whose
    /// one-bar reference leaves nothing after it on daily data.
    #[serde(default = "default_true")]
    pub track_extension: bool,
}

fn default_true() -> bool {
    true
}

impl CadenceConfig {
    pub fn monthly() -> Self {
        Self {
            reference: ReferenceRule::DayOfMonthCutoff { day: 13, fallback_bars: Some(10) },
            min_bars: 5,
            lock: LockRule::AfterDayOfMonth { day: 13 },
            tie_break: TieBreak::Undefined,
            track_extension: true,
        }
    }

    pub fn weekly() -> Self {
        Self {
            reference: ReferenceRule::FirstBars { count: 2 },
            min_bars: 2,
            lock: LockRule::AfterBars { bars: 2, session_close: None },
            tie_break: TieBreak::Undefined,
            track_extension: true,
        }
    }

    pub fn daily() -> Self {
        Self {
            reference: ReferenceRule::FirstBars { count: 1 },
            min_bars: 1,
            lock: LockRule::Unlocked,
            tie_break: TieBreak::Undefined,
            track_extension: false,
        }
    }

    fn validate(&self, cadence: Cadence) -> Result<(), ConfigError> {
        let name = cadence.label();
        if self.min_bars == 0 {
            return Err(invalid(format!("{name}: min_bars must be at least 1")));
        }
        match self.reference {
            ReferenceRule::DayOfMonthCutoff { day, .. } if !(1..=31).contains(&day) => {
                return Err(invalid(format!("{name}: reference day {day} outside 1..=31")));
            }
            ReferenceRule::DayOfMonthCutoff { fallback_bars: Some(n), .. } if n < self.min_bars => {
                return Err(invalid(format!(
                    "{name}: fallback of {n} bars is shorter than min_bars {}",
                    self.min_bars
                )));
            }
            ReferenceRule::FirstBars { count: 0 } => {
                return Err(invalid(format!("{name}: reference must take at least one bar")));
            }
            _ => {}
        }
        match self.lock {
            LockRule::AfterDayOfMonth { day } if day > 31 => {
                Err(invalid(format!("{name}: lock day {day} outside 0..=31")))
            }
            LockRule::AfterBars { bars: 0, .. } => {
                Err(invalid(format!("{name}: lock must wait for at least one bar")))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "CadenceConfig::monthly")]
    pub monthly: CadenceConfig,
    #[serde(default = "CadenceConfig::weekly")]
    pub weekly: CadenceConfig,
    #[serde(default = "CadenceConfig::daily")]
    pub daily: CadenceConfig,
}

impl EngineConfig {
    pub fn cadence(&self, cadence: Cadence) -> &CadenceConfig {
        match cadence {
            Cadence::Monthly => &self.monthly,
            Cadence::Weekly => &self.weekly,
            Cadence::Daily => &self.daily,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monthly: CadenceConfig::monthly(),
            weekly: CadenceConfig::weekly(),
            daily: CadenceConfig::daily(),
        }
    }
}

// ─── Grade scale ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeStep {
    pub min_probability: f64,
    pub grade: Grade,
}

/// Monotone step function from probability (0–100) to [`Grade`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeScale {
    /// Steps in strictly descending `min_probability` order.
    pub steps: Vec<GradeStep>,
    pub floor: Grade,
}

impl GradeScale {
    pub fn grade_for(&self, probability: f64) -> Grade {
        self.steps
            .iter()
            .find(|step| probability >= step.min_probability)
            .map(|step| step.grade)
            .unwrap_or(self.floor)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for pair in self.steps.windows(2) {
            if pair[1].min_probability >= pair[0].min_probability {
                return Err(invalid("grade steps must be strictly descending".into()));
            }
            if pair[1].grade <= pair[0].grade {
                return Err(invalid("grade steps must name progressively weaker grades".into()));
            }
        }
        if let Some(last) = self.steps.last() {
            if self.floor <= last.grade {
                return Err(invalid("floor grade must be weaker than every step".into()));
            }
        }
        Ok(())
    }
}

impl Default for GradeScale {
    fn default() -> Self {
        let step = |min_probability, grade| GradeStep { min_probability, grade };
        Self {
            steps: vec![
                step(90.0, Grade::Diamond),
                step(82.0, Grade::Platinum),
                step(75.0, Grade::Gold),
                step(60.0, Grade::Silver),
            ],
            floor: Grade::Noise,
        }
    }
}

// ─── Probability tables ─────────────────────────────────────────────

/// One audited statistic: probability in percent and its sample count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityEntry {
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    /// Named setup behind this exact entry (e.g. `JANUARY EFFECT`). Reported
    /// only when this entry is the one that resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ProbabilityEntry {
    /// Zero-probability or zero-sample entries are treated as missing.
    pub fn is_usable(&self) -> bool {
        self.probability > 0.0 && self.samples != Some(0)
    }
}

/// Entries for one bias direction. `extension` is NEW_HIGH for BULL and
/// NEW_LOW for BEAR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<ProbabilityEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directional_close: Option<ProbabilityEntry>,
}

impl TargetTable {
    pub fn entry(&self, kind: TargetKind) -> Option<&ProbabilityEntry> {
        match kind {
            TargetKind::NewHigh | TargetKind::NewLow => self.extension.as_ref(),
            TargetKind::DirectionalClose => self.directional_close.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasTable {
    #[serde(default)]
    pub bull: TargetTable,
    #[serde(default)]
    pub bear: TargetTable,
}

impl BiasTable {
    pub fn for_bias(&self, bias: Bias) -> Option<&TargetTable> {
        match bias {
            Bias::Bull => Some(&self.bull),
            Bias::Bear => Some(&self.bear),
            Bias::Undefined => None,
        }
    }
}

/// Month-specific override of a [`BiasTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalTable {
    pub month: u32,
    #[serde(default)]
    pub bull: TargetTable,
    #[serde(default)]
    pub bear: TargetTable,
}

impl SeasonalTable {
    pub fn for_bias(&self, bias: Bias) -> Option<&TargetTable> {
        match bias {
            Bias::Bull => Some(&self.bull),
            Bias::Bear => Some(&self.bear),
            Bias::Undefined => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadenceTable {
    #[serde(default)]
    pub general: BiasTable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seasonal: Vec<SeasonalTable>,
}

impl CadenceTable {
    pub fn seasonal_for(&self, month: u32) -> Option<&SeasonalTable> {
        self.seasonal.iter().find(|s| s.month == month)
    }
}

// ─── Sigma edge tables ──────────────────────────────────────────────

/// Audited probability for one sigma-edge state. `grade` overrides the
/// grade scale when the source graded the setup by its own statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeEntry {
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
}

/// Weekday setup that replaces the plain expansion read, e.g. a Tuesday
/// panic on NQ that historically rebounds on Wednesday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeTrigger {
    pub weekday: Weekday,
    pub state: SigmaState,
    pub setup: String,
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bull_expansion: Option<EdgeEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bear_expansion: Option<EdgeEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside: Option<EdgeEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<EdgeTrigger>,
}

impl EdgeTable {
    pub fn entry(&self, state: SigmaState) -> Option<&EdgeEntry> {
        match state {
            SigmaState::BullExpansion => self.bull_expansion.as_ref(),
            SigmaState::BearExpansion => self.bear_expansion.as_ref(),
            SigmaState::Inside => self.inside.as_ref(),
        }
    }

    pub fn trigger(&self, weekday: Weekday, state: SigmaState) -> Option<&EdgeTrigger> {
        self.triggers.iter().find(|t| t.weekday == weekday && t.state == state)
    }

    fn validate(&self, at: &str) -> Result<(), ConfigError> {
        let probabilities = [&self.bull_expansion, &self.bear_expansion, &self.inside]
            .into_iter()
            .flatten()
            .map(|e| e.probability)
            .chain(self.triggers.iter().map(|t| t.probability));
        for p in probabilities {
            if !(0.0..=100.0).contains(&p) {
                return Err(invalid(format!("{at}: edge probability {p} outside 0..=100")));
            }
        }
        let mut seen = BTreeSet::new();
        for t in &self.triggers {
            if !seen.insert((t.weekday.num_days_from_monday(), t.state as u8)) {
                return Err(invalid(format!(
                    "{at}: duplicate edge trigger for {} {:?}",
                    t.weekday, t.state
                )));
            }
        }
        Ok(())
    }
}

/// Edge tables per cadence. Monthly has no sigma edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeTables {
    #[serde(default)]
    pub daily: EdgeTable,
    #[serde(default)]
    pub weekly: EdgeTable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SigmaThresholds {
    /// Daily sigma as a fraction of price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily: Option<f64>,
    /// Weekly sigma as a fraction of price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentTables {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sigma: SigmaThresholds,
    #[serde(default)]
    pub edge: EdgeTables,
    #[serde(default)]
    pub monthly: CadenceTable,
    #[serde(default)]
    pub weekly: CadenceTable,
    #[serde(default)]
    pub daily: CadenceTable,
}

impl InstrumentTables {
    pub fn table(&self, cadence: Cadence) -> &CadenceTable {
        match cadence {
            Cadence::Monthly => &self.monthly,
            Cadence::Weekly => &self.weekly,
            Cadence::Daily => &self.daily,
        }
    }

    /// Sigma threshold used for the cadence's sigma edge, if any.
    pub fn sigma_for(&self, cadence: Cadence) -> Option<f64> {
        match cadence {
            Cadence::Monthly => None,
            Cadence::Weekly => self.sigma.weekly,
            Cadence::Daily => self.sigma.daily,
        }
    }

    /// Edge table for the cadence's sigma edge, if the cadence has one.
    pub fn edge_for(&self, cadence: Cadence) -> Option<&EdgeTable> {
        match cadence {
            Cadence::Monthly => None,
            Cadence::Weekly => Some(&self.edge.weekly),
            Cadence::Daily => Some(&self.edge.daily),
        }
    }

    fn validate(&self, id: &str) -> Result<(), ConfigError> {
        for sigma in [self.sigma.daily, self.sigma.weekly].into_iter().flatten() {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(invalid(format!("{id}: sigma {sigma} must be positive")));
            }
        }
        self.edge.daily.validate(&format!("{id}.edge.daily"))?;
        self.edge.weekly.validate(&format!("{id}.edge.weekly"))?;
        for cadence in Cadence::ALL {
            let table = self.table(cadence);
            let mut months = BTreeSet::new();
            for seasonal in &table.seasonal {
                if !(1..=12).contains(&seasonal.month) {
                    return Err(invalid(format!(
                        "{id}.{}: seasonal month {} outside 1..=12",
                        cadence.label(),
                        seasonal.month
                    )));
                }
                if !months.insert(seasonal.month) {
                    return Err(invalid(format!(
                        "{id}.{}: duplicate seasonal month {}",
                        cadence.label(),
                        seasonal.month
                    )));
                }
            }
            let targets = [&table.general.bull, &table.general.bear]
                .into_iter()
                .chain(table.seasonal.iter().flat_map(|s| [&s.bull, &s.bear]));
            for target in targets {
                for entry in [&target.extension, &target.directional_close].into_iter().flatten() {
                    if !(0.0..=100.0).contains(&entry.probability) {
                        return Err(invalid(format!(
                            "{id}.{}: probability {} outside 0..=100",
                            cadence.label(),
                            entry.probability
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

// ─── Top-level document ─────────────────────────────────────────────

/// The complete injected configuration for one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Human-assigned version of the audited tables.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub grades: GradeScale,
    #[serde(default)]
    pub instruments: BTreeMap<String, InstrumentTables>,
}

fn default_version() -> String {
    "unversioned".into()
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::Invalid(msg)
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            engine: EngineConfig::default(),
            grades: GradeScale::default(),
            instruments: BTreeMap::new(),
        }
    }
}

impl SignalConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SignalConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for cadence in Cadence::ALL {
            self.engine.cadence(cadence).validate(cadence)?;
        }
        self.grades.validate()?;
        for (id, tables) in &self.instruments {
            tables.validate(id)?;
        }
        Ok(())
    }

    pub fn instrument(&self, id: &str) -> Option<&InstrumentTables> {
        self.instruments.get(id)
    }

    /// Deterministic BLAKE3 hash of the configuration.
    ///
    /// Two runs with equal fingerprints used identical cadence parameters and
    /// tables, so their reports are directly comparable.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

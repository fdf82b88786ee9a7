//! Layer and instrument reports — the engine's output unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::signal::{Bias, Cadence, ExtensionTarget, FractalSignal, Grade};

/// Per-cadence state after one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerStatus {
    /// Timing gate closed or not enough bars; no bias, no targets.
    Forming,
    /// Locked but unclassifiable (degenerate range or midpoint tie).
    Undefined,
    /// Locked with a BULL/BEAR bias and targets.
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SigmaState {
    BullExpansion,
    BearExpansion,
    Inside,
}

/// Audited read of a sigma-edge state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeOutlook {
    pub probability: f64,
    pub grade: Grade,
    /// Weekday setup that replaced the plain expansion read (e.g. `REBOUND WED`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<String>,
}

/// Open-to-close move of the period so far against a sigma threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigmaEdge {
    pub o2c: f64,
    pub sigma: f64,
    pub multiple: f64,
    pub state: SigmaState,
    /// `None` when the instrument has no edge table for the cadence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlook: Option<EdgeOutlook>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerReport {
    pub cadence: Cadence,
    pub status: LayerStatus,
    /// `None` (JSON `null`) exactly when the layer is forming.
    pub bias: Option<Bias>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<FractalSignal>,
    pub targets: Vec<ExtensionTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma_edge: Option<SigmaEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl LayerReport {
    pub fn forming(cadence: Cadence, detail: impl Into<String>) -> Self {
        Self {
            cadence,
            status: LayerStatus::Forming,
            bias: None,
            signal: None,
            targets: Vec::new(),
            sigma_edge: None,
            detail: Some(detail.into()),
        }
    }

    pub fn is_forming(&self) -> bool {
        self.status == LayerStatus::Forming
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layers {
    pub monthly: LayerReport,
    pub weekly: LayerReport,
    pub daily: LayerReport,
}

impl Layers {
    pub fn get(&self, cadence: Cadence) -> &LayerReport {
        match cadence {
            Cadence::Monthly => &self.monthly,
            Cadence::Weekly => &self.weekly,
            Cadence::Daily => &self.daily,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentReport {
    pub instrument_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub current_price: f64,
    /// Timestamp of the latest bar; the engine never reads the wall clock.
    pub as_of: NaiveDateTime,
    pub config_version: String,
    pub layers: Layers,
}

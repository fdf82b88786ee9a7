//! Layer composition: run the pipeline once per cadence and assemble the
//! per-instrument report.
//!
//! Per cadence the order is gate -> extract -> classify -> track -> annotate.
//! The gate runs first because it is the cheapest check. Cadences share no
//! mutable state, and a cadence that cannot lock degrades to FORMING without
//! affecting the other two.

use chrono::Datelike;
use thiserror::Error;
use tracing::debug;

use crate::classify::classify;
use crate::config::SignalConfig;
use crate::domain::{
    validate_series, BarError, Bias, Cadence, ExtensionTarget, FractalSignal, InstrumentReport,
    LayerReport, LayerStatus, Layers, PriceBar, TargetKind,
};
use crate::fulfillment::track;
use crate::probability::{AnnotationKey, ProbabilityAnnotator};
use crate::sigma::{edge_outlook, sigma_edge};
use crate::timing::{self, GateDecision};
use crate::window::{extract_reference, parent_period, Extraction};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid price series for {instrument_id}: {source}")]
    InvalidSeries {
        instrument_id: String,
        #[source]
        source: BarError,
    },
}

pub struct LayerComposer<'c> {
    config: &'c SignalConfig,
    annotator: ProbabilityAnnotator<'c>,
}

impl<'c> LayerComposer<'c> {
    pub fn new(config: &'c SignalConfig) -> Self {
        Self { config, annotator: ProbabilityAnnotator::new(config) }
    }

    /// Evaluate one cadence over a validated, ascending series.
    pub fn compose_layer(&self, instrument_id: &str, cadence: Cadence, bars: &[PriceBar]) -> LayerReport {
        let cadence_config = self.config.engine.cadence(cadence);

        let Some(period) = parent_period(bars, cadence) else {
            return LayerReport::forming(cadence, "no bars");
        };

        let locked_at = match timing::evaluate(period.bars(), cadence_config) {
            GateDecision::Locked { at } => at,
            GateDecision::Forming(wait) => {
                debug!(instrument_id, cadence = cadence.label(), %wait, "layer forming");
                return LayerReport::forming(cadence, wait.to_string());
            }
        };

        let split = match extract_reference(period, cadence_config) {
            Extraction::Ready(split) => split,
            Extraction::Forming(reason) => {
                debug!(instrument_id, cadence = cadence.label(), %reason, "layer forming");
                return LayerReport::forming(cadence, reason.to_string());
            }
        };

        let classification = classify(&split.reference, cadence_config.tie_break);
        let signal = FractalSignal {
            bias: classification.bias,
            position: classification.position,
            reference_range: classification.range,
            reference_close: classification.close,
            reference_start: split.reference.start(),
            reference_end: split.reference.end(),
            period_start: period.start(),
            locked_at,
        };

        let tables = self.config.instrument(instrument_id);
        let sigma = tables
            .and_then(|t| t.sigma_for(cadence))
            .and_then(|s| sigma_edge(&period, s))
            .map(|mut edge| {
                edge.outlook = tables.and_then(|t| t.edge_for(cadence)).and_then(|table| {
                    edge_outlook(table, edge.state, period.end().weekday(), &self.config.grades)
                });
                edge
            });

        if classification.bias == Bias::Undefined {
            debug!(instrument_id, cadence = cadence.label(), "layer undefined");
            return LayerReport {
                cadence,
                status: LayerStatus::Undefined,
                bias: Some(Bias::Undefined),
                signal: Some(signal),
                targets: Vec::new(),
                sigma_edge: sigma,
                detail: Some(match classification.position {
                    None => "degenerate reference range".to_string(),
                    Some(_) => "close on range midpoint".to_string(),
                }),
            };
        }

        let month = period.start().month();
        let targets = track(classification.bias, classification.range, &period, split.after)
            .into_iter()
            .filter(|p| cadence_config.track_extension || p.kind == TargetKind::DirectionalClose)
            .map(|progress| {
                let annotation = self.annotator.annotate(AnnotationKey {
                    instrument_id,
                    cadence,
                    month,
                    bias: classification.bias,
                    kind: progress.kind,
                });
                ExtensionTarget {
                    kind: progress.kind,
                    status: progress.status,
                    probability: annotation.probability,
                    sample_size: annotation.sample_size,
                    grade: annotation.grade,
                    tier: annotation.tier,
                    tag: annotation.tag,
                    fulfilled_at: progress.fulfilled_at,
                    on_track: progress.on_track,
                }
            })
            .collect();

        debug!(
            instrument_id,
            cadence = cadence.label(),
            bias = ?classification.bias,
            position = ?classification.position,
            "layer locked"
        );

        LayerReport {
            cadence,
            status: LayerStatus::Locked,
            bias: Some(classification.bias),
            signal: Some(signal),
            targets,
            sigma_edge: sigma,
            detail: None,
        }
    }

    /// Build the full three-layer report for one instrument.
    pub fn compose(&self, instrument_id: &str, bars: &[PriceBar]) -> Result<InstrumentReport, EngineError> {
        validate_series(bars).map_err(|source| EngineError::InvalidSeries {
            instrument_id: instrument_id.to_string(),
            source,
        })?;
        let Some(latest) = bars.last() else {
            return Err(EngineError::InvalidSeries {
                instrument_id: instrument_id.to_string(),
                source: BarError::Empty,
            });
        };

        let layers = Layers {
            monthly: self.compose_layer(instrument_id, Cadence::Monthly, bars),
            weekly: self.compose_layer(instrument_id, Cadence::Weekly, bars),
            daily: self.compose_layer(instrument_id, Cadence::Daily, bars),
        };

        Ok(InstrumentReport {
            instrument_id: instrument_id.to_string(),
            name: self.config.instrument(instrument_id).and_then(|t| t.name.clone()),
            current_price: latest.close,
            as_of: latest.timestamp,
            config_version: self.config.version.clone(),
            layers,
        })
    }
}

/// Convenience wrapper around [`LayerComposer::compose`].
pub fn compose(
    instrument_id: &str,
    bars: &[PriceBar],
    config: &SignalConfig,
) -> Result<InstrumentReport, EngineError> {
    LayerComposer::new(config).compose(instrument_id, bars)
}

//! Parallel batch evaluation across instruments.
//!
//! Each instrument is fetched and composed independently on the rayon pool.
//! A fetch or validation failure for one instrument is recorded in its
//! outcome and never aborts the rest of the batch. Results keep the order of
//! the requested instrument list.

use fractallab_core::config::ConfigError;
use fractallab_core::domain::{InstrumentReport, PriceBar};
use fractallab_core::{LayerComposer, SignalConfig};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::provider::{BarProvider, DataSource};

/// Outcome of evaluating one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentOutcome {
    pub instrument_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSource>,
    /// BLAKE3 over the fetched bars, so two outcomes can be checked for
    /// identical input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_hash: Option<String>,
    pub report: Option<InstrumentReport>,
    pub error: Option<String>,
}

impl InstrumentOutcome {
    fn failed(instrument_id: &str, source: Option<DataSource>, error: String) -> Self {
        Self { instrument_id: instrument_id.to_string(), source, dataset_hash: None, report: None, error: Some(error) }
    }

    pub fn is_ok(&self) -> bool {
        self.report.is_some()
    }
}

/// All outcomes of one batch run plus the identity of the configuration used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub config_version: String,
    pub config_fingerprint: String,
    pub provider: String,
    pub results: Vec<InstrumentOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn get(&self, instrument_id: &str) -> Option<&InstrumentOutcome> {
        self.results.iter().find(|r| r.instrument_id == instrument_id)
    }
}

/// Evaluate every instrument in parallel against one shared configuration.
///
/// Only a configuration that cannot be fingerprinted fails the whole batch.
pub fn run_batch(
    provider: &dyn BarProvider,
    instruments: &[String],
    config: &SignalConfig,
) -> Result<BatchReport, ConfigError> {
    let config_fingerprint = config.fingerprint()?;
    let composer = LayerComposer::new(config);

    info!(
        provider = provider.name(),
        instruments = instruments.len(),
        config_version = %config.version,
        "starting batch"
    );

    let results: Vec<InstrumentOutcome> = instruments
        .par_iter()
        .map(|id| evaluate_one(provider, &composer, id))
        .collect();

    let report = BatchReport {
        config_version: config.version.clone(),
        config_fingerprint,
        provider: provider.name().to_string(),
        results,
    };
    info!(succeeded = report.succeeded(), failed = report.failed(), "batch complete");
    Ok(report)
}

fn evaluate_one(provider: &dyn BarProvider, composer: &LayerComposer<'_>, instrument_id: &str) -> InstrumentOutcome {
    let fetched = match provider.fetch(instrument_id) {
        Ok(f) => f,
        Err(e) => {
            warn!(instrument_id, error = %e, "fetch failed");
            return InstrumentOutcome::failed(instrument_id, None, e.to_string());
        }
    };
    if fetched.source == DataSource::Synthetic {
        warn!(instrument_id, "using synthetic bars, results are not market data");
    }

    match composer.compose(instrument_id, &fetched.bars) {
        Ok(report) => {
            info!(instrument_id, bars = fetched.bars.len(), "instrument composed");
            InstrumentOutcome {
                instrument_id: instrument_id.to_string(),
                source: Some(fetched.source),
                dataset_hash: Some(compute_dataset_hash(&fetched.bars)),
                report: Some(report),
                error: None,
            }
        }
        Err(e) => {
            warn!(instrument_id, error = %e, "composition failed");
            InstrumentOutcome::failed(instrument_id, Some(fetched.source), e.to_string())
        }
    }
}

/// Deterministic BLAKE3 hash over timestamps and OHLC values in series order.
pub fn compute_dataset_hash(bars: &[PriceBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

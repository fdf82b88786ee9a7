//! Reporting and export: JSON and CSV artifacts for a batch.
//!
//! - **JSON**: the full `BatchReport`, round-trippable
//! - **CSV**: one flat row per target; a layer without targets (forming,
//!   undefined) gets a single row, and a failed instrument gets one error row.
//!   The layer's sigma edge is repeated on each of its rows.

use std::path::Path;

use anyhow::{Context, Result};
use fractallab_core::domain::{Cadence, ExtensionTarget, LayerReport};
use serde::Serialize;

use crate::batch::{BatchReport, InstrumentOutcome};

/// Output format for a batch artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BatchReport` to pretty JSON.
pub fn export_json(report: &BatchReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BatchReport to JSON")
}

/// Deserialize a `BatchReport` from JSON.
pub fn import_json(json: &str) -> Result<BatchReport> {
    serde_json::from_str(json).context("failed to deserialize BatchReport from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

const CSV_HEADER: [&str; 24] = [
    "instrument_id",
    "as_of",
    "current_price",
    "cadence",
    "status",
    "bias",
    "position",
    "range_high",
    "range_low",
    "locked_at",
    "target",
    "target_status",
    "probability",
    "samples",
    "grade",
    "tier",
    "tag",
    "fulfilled_at",
    "on_track",
    "edge_state",
    "edge_multiple",
    "edge_probability",
    "edge_setup",
    "detail",
];

/// Export a batch as a flat CSV.
pub fn export_csv(report: &BatchReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for outcome in &report.results {
        write_outcome(&mut wtr, outcome)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn write_outcome(wtr: &mut csv::Writer<Vec<u8>>, outcome: &InstrumentOutcome) -> Result<()> {
    let Some(report) = &outcome.report else {
        let mut row = vec![String::new(); CSV_HEADER.len()];
        row[0] = outcome.instrument_id.clone();
        row[CSV_HEADER.len() - 1] = outcome.error.clone().unwrap_or_default();
        wtr.write_record(&row)?;
        return Ok(());
    };

    for layer in Cadence::ALL.map(|c| report.layers.get(c)) {
        let prefix = [
            report.instrument_id.clone(),
            report.as_of.to_string(),
            format!("{:.6}", report.current_price),
        ];
        if layer.targets.is_empty() {
            let row = layer_row(&prefix, layer, None);
            wtr.write_record(&row)?;
        } else {
            for target in &layer.targets {
                let row = layer_row(&prefix, layer, Some(target));
                wtr.write_record(&row)?;
            }
        }
    }
    Ok(())
}

fn layer_row(prefix: &[String; 3], layer: &LayerReport, target: Option<&ExtensionTarget>) -> Vec<String> {
    let signal = layer.signal.as_ref();
    let mut row = prefix.to_vec();
    row.extend([
        label(&layer.cadence),
        label(&layer.status),
        layer.bias.as_ref().map(label).unwrap_or_default(),
        opt_f64(signal.and_then(|s| s.position)),
        opt_f64(signal.map(|s| s.reference_range.high)),
        opt_f64(signal.map(|s| s.reference_range.low)),
        signal.map(|s| s.locked_at.to_string()).unwrap_or_default(),
    ]);
    match target {
        Some(t) => row.extend([
            label(&t.kind),
            label(&t.status),
            format!("{:.1}", t.probability),
            t.sample_size.map(|n| n.to_string()).unwrap_or_default(),
            label(&t.grade),
            label(&t.tier),
            t.tag.clone().unwrap_or_default(),
            t.fulfilled_at.map(|ts| ts.to_string()).unwrap_or_default(),
            t.on_track.map(|b| b.to_string()).unwrap_or_default(),
        ]),
        None => row.extend(std::iter::repeat(String::new()).take(9)),
    }
    let edge = layer.sigma_edge.as_ref();
    let outlook = edge.and_then(|e| e.outlook.as_ref());
    row.extend([
        edge.map(|e| label(&e.state)).unwrap_or_default(),
        opt_f64(edge.map(|e| e.multiple)),
        outlook.map(|o| format!("{:.1}", o.probability)).unwrap_or_default(),
        outlook.and_then(|o| o.setup.clone()).unwrap_or_default(),
    ]);
    row.push(layer.detail.clone().unwrap_or_default());
    row
}

/// Wire name of a serde unit variant (e.g. `NEW_HIGH`).
fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

fn opt_f64(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

// ─── Files ──────────────────────────────────────────────────────────

/// Render the batch in `format`.
pub fn render(report: &BatchReport, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => export_json(report),
        ExportFormat::Csv => export_csv(report),
    }
}

/// Write the rendered batch to `path`, creating parent directories.
pub fn write_report(report: &BatchReport, format: ExportFormat, path: &Path) -> Result<()> {
    let content = render(report, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir: {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

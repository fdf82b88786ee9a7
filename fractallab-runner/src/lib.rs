//! fractallab runner — bar providers, batch evaluation, export.
//!
//! This crate builds on `fractallab-core` to provide:
//! - Bar providers (CSV directory, deterministic synthetic walk)
//! - Parallel per-instrument evaluation with failure isolation
//! - Dataset and configuration fingerprints for run comparison
//! - JSON and CSV export of batch results

pub mod batch;
pub mod export;
pub mod provider;

pub use batch::{compute_dataset_hash, run_batch, BatchReport, InstrumentOutcome};
pub use export::{export_csv, export_json, import_json, render, write_report, ExportFormat};
pub use provider::{BarProvider, CsvProvider, DataSource, FetchError, FetchResult, SyntheticProvider};

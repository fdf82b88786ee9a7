//! Bar providers and structured fetch errors.
//!
//! The `BarProvider` trait abstracts over where bars come from (CSV files on
//! disk, a synthetic random walk) so the batch runner can swap sources and
//! tests can inject failing providers.
//!
//! Synthetic data is a developer-only mode for demos and benchmarks. Outcomes
//! computed on it are tagged with `DataSource::Synthetic`.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use fractallab_core::domain::PriceBar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from fetching bars for one instrument.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no data for instrument '{instrument_id}' at {}", path.display())]
    NotFound { instrument_id: String, path: PathBuf },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row {row} in {}: {reason}", path.display())]
    Malformed { path: PathBuf, row: usize, reason: String },

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Where the bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    CsvImport,
    Synthetic,
}

/// Result of a successful fetch for a single instrument.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub instrument_id: String,
    pub bars: Vec<PriceBar>,
    pub source: DataSource,
}

/// Trait for bar providers.
///
/// Implementations return the full available history in file/generation
/// order; series validation is the engine's job.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for one instrument.
    fn fetch(&self, instrument_id: &str) -> Result<FetchResult, FetchError>;
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Reads `<dir>/<INSTRUMENT>.csv` with a `timestamp,open,high,low,close`
/// header. Timestamps may be dates (`2024-02-13`, read as midnight) or
/// datetimes (`2024-02-13 16:00:00`, `2024-02-13T16:00:00`).
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, instrument_id: &str) -> PathBuf {
        self.dir.join(format!("{instrument_id}.csv"))
    }

    fn read(&self, path: &Path) -> Result<Vec<PriceBar>, FetchError> {
        let file = std::fs::File::open(path)
            .map_err(|source| FetchError::Io { path: path.to_path_buf(), source })?;
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let mut bars = Vec::new();
        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            // Header is line 1.
            let line = i + 2;
            let row = row.map_err(|e| FetchError::Malformed {
                path: path.to_path_buf(),
                row: line,
                reason: e.to_string(),
            })?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| FetchError::Malformed {
                path: path.to_path_buf(),
                row: line,
                reason: format!("unrecognized timestamp '{}'", row.timestamp),
            })?;
            bars.push(PriceBar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
            });
        }
        Ok(bars)
    }
}

impl BarProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, instrument_id: &str) -> Result<FetchResult, FetchError> {
        let path = self.path_for(instrument_id);
        if !path.is_file() {
            return Err(FetchError::NotFound { instrument_id: instrument_id.to_string(), path });
        }
        let bars = self.read(&path)?;
        Ok(FetchResult { instrument_id: instrument_id.to_string(), bars, source: DataSource::CsvImport })
    }
}

const DATETIME_FORMATS: [&str; 4] =
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Parse a date or datetime timestamp; a bare date becomes midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Deterministic random-walk bars, one per weekday in `[start, end]`.
///
/// The RNG is seeded from the BLAKE3 hash of the instrument id, so the same
/// id always produces the same history and different ids diverge.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub start_price: f64,
}

impl SyntheticProvider {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end, start_price: 100.0 }
    }
}

impl BarProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, instrument_id: &str) -> Result<FetchResult, FetchError> {
        if self.start > self.end {
            return Err(FetchError::Unavailable(format!(
                "synthetic range is empty ({} > {})",
                self.start, self.end
            )));
        }
        Ok(FetchResult {
            instrument_id: instrument_id.to_string(),
            bars: generate_synthetic_bars(instrument_id, self.start, self.end, self.start_price),
            source: DataSource::Synthetic,
        })
    }
}

fn generate_synthetic_bars(
    instrument_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    start_price: f64,
) -> Vec<PriceBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(instrument_id.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = start_price;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.02..0.02);
        let open = price * (1.0 + rng.gen_range(-0.003..0.003));
        let close = open * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));

        if let Some(timestamp) = current.and_hms_opt(0, 0, 0) {
            bars.push(PriceBar { timestamp, open, high, low, close });
        }

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractallab_core::domain::validate_series;
    use std::io::Write;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_dates_and_datetimes() {
        assert_eq!(parse_timestamp("2024-02-13"), d(2024, 2, 13).and_hms_opt(0, 0, 0));
        assert_eq!(parse_timestamp("2024-02-13 16:00:00"), d(2024, 2, 13).and_hms_opt(16, 0, 0));
        assert_eq!(parse_timestamp("2024-02-13T09:30"), d(2024, 2, 13).and_hms_opt(9, 30, 0));
        assert_eq!(parse_timestamp("13/02/2024"), None);
    }

    #[test]
    fn csv_provider_reads_bars() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("NQ.csv")).unwrap();
        writeln!(f, "timestamp,open,high,low,close").unwrap();
        writeln!(f, "2024-02-12, 100.0, 105.0, 98.0, 104.0").unwrap();
        writeln!(f, "2024-02-13 16:00:00,104.0,106.0,103.0,99.0").unwrap();

        let provider = CsvProvider::new(dir.path());
        let result = provider.fetch("NQ").unwrap();
        assert_eq!(result.source, DataSource::CsvImport);
        assert_eq!(result.bars.len(), 2);
        assert_eq!(result.bars[1].close, 99.0);
        assert_eq!(result.bars[1].timestamp, d(2024, 2, 13).and_hms_opt(16, 0, 0).unwrap());
    }

    #[test]
    fn csv_provider_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvProvider::new(dir.path()).fetch("ES").unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
        assert!(err.to_string().contains("ES"));
    }

    #[test]
    fn csv_provider_reports_malformed_row() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("YM.csv"),
            "timestamp,open,high,low,close\n2024-02-12,1,2,0.5,1.5\nnot-a-date,1,2,0.5,1.5\n",
        )
        .unwrap();
        let err = CsvProvider::new(dir.path()).fetch("YM").unwrap_err();
        match err {
            FetchError::Malformed { row, .. } => assert_eq!(row, 3),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn synthetic_data_is_deterministic_and_valid() {
        let provider = SyntheticProvider::new(d(2024, 1, 1), d(2024, 3, 31));
        let a = provider.fetch("NQ").unwrap();
        let b = provider.fetch("NQ").unwrap();
        assert_eq!(a.bars, b.bars);
        assert_eq!(a.source, DataSource::Synthetic);
        assert!(validate_series(&a.bars).is_ok());
        assert!(a.bars.iter().all(|bar| {
            let wd = bar.timestamp.date().weekday();
            wd != chrono::Weekday::Sat && wd != chrono::Weekday::Sun
        }));
    }

    #[test]
    fn different_instruments_get_different_synthetic_data() {
        let provider = SyntheticProvider::new(d(2024, 1, 1), d(2024, 1, 31));
        let nq = provider.fetch("NQ").unwrap();
        let es = provider.fetch("ES").unwrap();
        assert_eq!(nq.bars.len(), es.bars.len());
        assert_ne!(nq.bars[0].close, es.bars[0].close);
    }

    #[test]
    fn inverted_synthetic_range_is_unavailable() {
        let provider = SyntheticProvider::new(d(2024, 2, 1), d(2024, 1, 1));
        assert!(matches!(provider.fetch("NQ"), Err(FetchError::Unavailable(_))));
    }
}

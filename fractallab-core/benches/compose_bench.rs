//! Criterion benchmarks for the signal engine hot paths.
//!
//! Benchmarks:
//! 1. Reference extraction + classification over one month
//! 2. Fulfillment tracking (full rescan of the post-reference slice)
//! 3. Full three-layer composition for a multi-year daily history

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fractallab_core::classify::classify;
use fractallab_core::config::{CadenceConfig, SignalConfig, TieBreak};
use fractallab_core::domain::{Bias, Cadence, PriceBar};
use fractallab_core::fulfillment::track;
use fractallab_core::window::{extract_reference, parent_period, Extraction, Window};
use fractallab_core::LayerComposer;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<PriceBar> {
    let mut date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut i = 0usize;
    while bars.len() < n {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            bars.push(PriceBar {
                timestamp: date.and_hms_opt(0, 0, 0).unwrap(),
                open,
                high: close + 1.5,
                low: close - 1.5,
                close,
            });
            i += 1;
        }
        date += Duration::days(1);
    }
    bars
}

/// A single full month of minute-resolution bars (about 22 sessions x 390).
fn make_intraday_month() -> Vec<PriceBar> {
    let mut bars = Vec::new();
    let mut date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let mut i = 0usize;
    while date.month() == 5 {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let open_ts = date.and_hms_opt(9, 30, 0).unwrap();
            for m in 0..390 {
                let close = 5000.0 + (i as f64 * 0.01).sin() * 50.0;
                bars.push(PriceBar {
                    timestamp: open_ts + Duration::minutes(m),
                    open: close - 0.25,
                    high: close + 0.75,
                    low: close - 0.75,
                    close,
                });
                i += 1;
            }
        }
        date += Duration::days(1);
    }
    bars
}

// ── 1. Extraction + classification ───────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let bars = make_intraday_month();
    let monthly = CadenceConfig::monthly();

    group.bench_function("monthly_intraday", |b| {
        b.iter(|| {
            let period = parent_period(black_box(&bars), Cadence::Monthly).unwrap();
            match extract_reference(period, &monthly) {
                Extraction::Ready(split) => Some(classify(&split.reference, TieBreak::Undefined)),
                Extraction::Forming(_) => None,
            }
        });
    });

    group.finish();
}

// ── 2. Fulfillment tracking ──────────────────────────────────────────

fn bench_track(c: &mut Criterion) {
    let mut group = c.benchmark_group("track");
    let bars = make_intraday_month();
    let period = Window::new(&bars).unwrap();
    let Extraction::Ready(split) = extract_reference(period, &CadenceConfig::monthly()) else {
        panic!("benchmark month must have a reference window");
    };
    let range = split.reference.range();

    for bias in [Bias::Bull, Bias::Bear] {
        group.bench_with_input(BenchmarkId::new("rescan", format!("{bias:?}")), &bias, |b, &bias| {
            b.iter(|| track(bias, black_box(range), &period, black_box(split.after)));
        });
    }

    group.finish();
}

// ── 3. Full composition ──────────────────────────────────────────────

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    let config = SignalConfig::default();
    let composer = LayerComposer::new(&config);

    for n in [252usize, 1260, 2520] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::new("daily_history", n), &bars, |b, bars| {
            b.iter(|| composer.compose(black_box("BENCH"), black_box(bars)));
        });
    }

    let intraday = make_intraday_month();
    group.bench_function("intraday_month", |b| {
        b.iter(|| composer.compose(black_box("BENCH"), black_box(&intraday)));
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_track, bench_compose);
criterion_main!(benches);

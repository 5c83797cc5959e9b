//! Benchmark suite for danci-insight
//!
//! Run with: cargo bench

use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};

use danci_insight::{
    aggregate, batch_compute_models, compute_model, detect_patterns, AggregationPeriod,
    ItemMetrics, MetricEvent, MetricKind,
};

/// Synthetic event log: one accuracy sample per item per day across 90
/// days, values following a deterministic sawtooth.
fn synthetic_events(item_count: usize, days: i64) -> Vec<MetricEvent> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

    let mut events = Vec::new();
    for day in 0..days {
        for item in 0..item_count {
            let value = 0.5 + 0.05 * ((day as usize + item) % 10) as f64;
            events.push(MetricEvent::for_word(
                start + Duration::days(day),
                MetricKind::AccuracyRate,
                value,
                format!("w{}", item),
            ));
        }
    }
    events
}

fn synthetic_items(item_count: usize) -> Vec<ItemMetrics> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

    (0..item_count)
        .map(|i| {
            let mut item = ItemMetrics::new(format!("w{}", i), start);
            for day in 0..20 {
                item.record_interaction(day % 3 != 0, 1500.0, start + Duration::days(day));
            }
            item
        })
        .collect()
}

fn bench_compute_model(c: &mut Criterion) {
    let events = synthetic_events(1, 90);
    let items = synthetic_items(1);
    let now = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();

    c.bench_function("compute_model/90_days", |b| {
        b.iter(|| compute_model(&items[0], &events, now))
    });
}

fn bench_batch_compute_models(c: &mut Criterion) {
    let events = synthetic_events(100, 90);
    let items = synthetic_items(100);
    let now = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();

    c.bench_function("batch_compute_models/100_items", |b| {
        b.iter(|| batch_compute_models(&items, &events, now))
    });
}

fn bench_detect_patterns(c: &mut Criterion) {
    let events = synthetic_events(10, 90);

    c.bench_function("detect_patterns/900_events", |b| {
        b.iter(|| detect_patterns(&events, &[]))
    });
}

fn bench_aggregate_daily(c: &mut Criterion) {
    let events = synthetic_events(10, 90);

    c.bench_function("aggregate/daily_900_events", |b| {
        b.iter(|| aggregate(&events, MetricKind::AccuracyRate, AggregationPeriod::Day))
    });
}

criterion_group!(
    benches,
    bench_compute_model,
    bench_batch_compute_models,
    bench_detect_patterns,
    bench_aggregate_daily
);
criterion_main!(benches);

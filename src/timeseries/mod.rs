//! Time-Series Analytics
//!
//! General-purpose analytics over the metric event log: periodic
//! aggregation, per-metric trend and seasonality analysis, z-score
//! anomaly detection, and pairwise cross-metric correlation.
//!
//! Unlike the forgetting module this layer is item-agnostic. It treats
//! the log as plain (timestamp, kind, value) observations and reports on
//! the series as a whole.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::stats;
use crate::types::{weekday_name, MetricEvent, MetricKind, EPSILON};

// ==================== Constants ====================

/// Minimum samples of a metric before its pattern analysis runs
const MIN_ANALYSIS_SAMPLES: usize = 10;

/// Slope magnitude below which a trend reads as stable
const TREND_SLOPE_THRESHOLD: f64 = 0.01;

/// Z-score cutoffs for anomaly detection and severity grading
const ANOMALY_Z_THRESHOLD: f64 = 2.0;
const ANOMALY_Z_MEDIUM: f64 = 2.5;
const ANOMALY_Z_HIGH: f64 = 3.0;

/// Off-peak study hours (late night / early morning)
const OFF_PEAK_MORNING_END: u32 = 6;
const OFF_PEAK_EVENING_START: u32 = 22;

/// Correlation: minimum hourly buckets per series and shared buckets per
/// pair, plus the overlap count treated as fully significant
const MIN_SERIES_BUCKETS: usize = 5;
const MIN_SHARED_BUCKETS: usize = 3;
const FULL_SIGNIFICANCE_OVERLAP: f64 = 30.0;

// ==================== Aggregation ====================

/// Bucketing granularity for [`aggregate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPeriod {
    Hour,
    Day,
    Week,
    Month,
}

impl AggregationPeriod {
    /// Bucket key for a timestamp. Keys sort lexicographically in
    /// chronological order (weeks use the ISO week-numbering year).
    fn key(&self, ts: DateTime<Utc>) -> String {
        match self {
            AggregationPeriod::Hour => ts.format("%Y-%m-%dT%H:00").to_string(),
            AggregationPeriod::Day => ts.format("%Y-%m-%d").to_string(),
            AggregationPeriod::Week => ts.format("%G-W%V").to_string(),
            AggregationPeriod::Month => ts.format("%Y-%m").to_string(),
        }
    }
}

/// Summary statistics for one time bucket.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeSeriesAggregate {
    pub period_key: String,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation of the bucket's values
    pub std_dev: f64,
}

/// Bucket one metric's events by period and summarize each bucket.
///
/// Output is ordered by period key ascending, which is chronological
/// order. Events of other metric kinds are ignored.
pub fn aggregate(
    events: &[MetricEvent],
    kind: MetricKind,
    period: AggregationPeriod,
) -> Vec<TimeSeriesAggregate> {
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for e in events.iter().filter(|e| e.kind == kind) {
        buckets
            .entry(period.key(e.timestamp))
            .or_default()
            .push(e.value);
    }

    buckets
        .into_iter()
        .map(|(period_key, values)| {
            let sum: f64 = values.iter().sum();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            TimeSeriesAggregate {
                period_key,
                count: values.len(),
                sum,
                mean: stats::mean(&values),
                min,
                max,
                std_dev: stats::std_dev(&values),
            }
        })
        .collect()
}

// ==================== Pattern Analysis ====================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Linear trend of a metric over its observation sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    /// OLS slope per observation
    pub slope: f64,
    /// |Pearson r| of value against observation index [0, 1]
    pub strength: f64,
}

/// Hours and weekdays where a metric runs high or low.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeasonalProfile {
    /// Hours whose mean reaches the 75th percentile of hourly means
    pub peak_hours: Vec<u32>,
    /// Hours whose mean falls at or below the 25th percentile
    pub low_hours: Vec<u32>,
    /// Up to two strongest weekdays by mean value
    pub strong_days: Vec<String>,
    /// Up to two weakest weekdays by mean value
    pub weak_days: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

/// One observation flagged as a statistical outlier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub z_score: f64,
    pub severity: AnomalySeverity,
    pub probable_cause: String,
}

/// Full pattern report for one metric kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricPatternAnalysis {
    pub kind: MetricKind,
    pub sample_size: usize,
    pub trend: TrendSummary,
    pub seasonal: SeasonalProfile,
    pub anomalies: Vec<Anomaly>,
    /// Fixed prior for how strongly this metric tracks learning success
    pub correlation_to_success: f64,
}

/// Analyze trend, seasonality, and anomalies for every metric kind with
/// enough observations.
///
/// `range` restricts the analysis to events within the inclusive window.
/// Kinds with fewer than 10 samples after filtering are skipped; the
/// output follows the stable [`MetricKind::ALL`] order.
pub fn analyze_patterns(
    events: &[MetricEvent],
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<MetricPatternAnalysis> {
    let filtered: Vec<&MetricEvent> = events
        .iter()
        .filter(|e| match range {
            Some((start, end)) => e.timestamp >= start && e.timestamp <= end,
            None => true,
        })
        .collect();

    let mut analyses = Vec::new();
    for kind in MetricKind::ALL {
        let mut kind_events: Vec<&MetricEvent> =
            filtered.iter().copied().filter(|e| e.kind == kind).collect();
        if kind_events.len() < MIN_ANALYSIS_SAMPLES {
            continue;
        }
        kind_events.sort_by_key(|e| e.timestamp);

        let values: Vec<f64> = kind_events.iter().map(|e| e.value).collect();

        analyses.push(MetricPatternAnalysis {
            kind,
            sample_size: values.len(),
            trend: summarize_trend(&values),
            seasonal: seasonal_profile(&kind_events),
            anomalies: find_anomalies(&kind_events, &values),
            correlation_to_success: success_correlation(kind),
        });
    }

    analyses
}

fn summarize_trend(values: &[f64]) -> TrendSummary {
    let slope = stats::linear_slope(values);
    let direction = if slope > TREND_SLOPE_THRESHOLD {
        TrendDirection::Increasing
    } else if slope < -TREND_SLOPE_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    let indices: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    TrendSummary {
        direction,
        slope,
        strength: stats::pearson(&indices, values).abs(),
    }
}

fn seasonal_profile(events: &[&MetricEvent]) -> SeasonalProfile {
    let mut hour_buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    let mut day_buckets: HashMap<Weekday, Vec<f64>> = HashMap::new();
    for e in events {
        hour_buckets.entry(e.timestamp.hour()).or_default().push(e.value);
        day_buckets.entry(e.timestamp.weekday()).or_default().push(e.value);
    }

    let hour_means: Vec<(u32, f64)> = hour_buckets
        .into_iter()
        .map(|(hour, values)| (hour, stats::mean(&values)))
        .collect();
    let means_only: Vec<f64> = hour_means.iter().map(|(_, m)| *m).collect();
    let p75 = stats::percentile(&means_only, 75.0);
    let p25 = stats::percentile(&means_only, 25.0);

    let peak_hours: Vec<u32> = hour_means
        .iter()
        .filter(|(_, m)| *m >= p75)
        .map(|(h, _)| *h)
        .collect();
    let low_hours: Vec<u32> = hour_means
        .iter()
        .filter(|(_, m)| *m <= p25)
        .map(|(h, _)| *h)
        .collect();

    let mut day_means: Vec<(Weekday, f64)> = day_buckets
        .into_iter()
        .map(|(day, values)| (day, stats::mean(&values)))
        .collect();
    day_means.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let strong_days: Vec<String> = day_means
        .iter()
        .take(2)
        .map(|(d, _)| weekday_name(*d).to_string())
        .collect();
    let weak_days: Vec<String> = day_means
        .iter()
        .rev()
        .take(2)
        .map(|(d, _)| weekday_name(*d).to_string())
        .collect();

    SeasonalProfile {
        peak_hours,
        low_hours,
        strong_days,
        weak_days,
    }
}

fn find_anomalies(events: &[&MetricEvent], values: &[f64]) -> Vec<Anomaly> {
    let m = stats::mean(values);
    let sd = stats::std_dev(values);
    if sd < EPSILON {
        return Vec::new();
    }

    events
        .iter()
        .filter_map(|e| {
            let z = (e.value - m) / sd;
            if z.abs() <= ANOMALY_Z_THRESHOLD {
                return None;
            }
            Some(Anomaly {
                timestamp: e.timestamp,
                value: e.value,
                z_score: z,
                severity: severity_of(z.abs()),
                probable_cause: probable_cause(e, z.abs()),
            })
        })
        .collect()
}

fn severity_of(z: f64) -> AnomalySeverity {
    if z > ANOMALY_Z_HIGH {
        AnomalySeverity::High
    } else if z > ANOMALY_Z_MEDIUM {
        AnomalySeverity::Medium
    } else {
        AnomalySeverity::Low
    }
}

/// Heuristic cause attribution, first match wins.
fn probable_cause(event: &MetricEvent, z: f64) -> String {
    let hour = event.timestamp.hour();
    if z > ANOMALY_Z_HIGH {
        "extreme deviation, possible tracking glitch".to_string()
    } else if hour < OFF_PEAK_MORNING_END || hour >= OFF_PEAK_EVENING_START {
        "off-peak study time".to_string()
    } else if event.word_id.is_some() {
        "item-specific difficulty".to_string()
    } else {
        "natural variation".to_string()
    }
}

/// Fixed priors for how each metric relates to learning success.
fn success_correlation(kind: MetricKind) -> f64 {
    match kind {
        MetricKind::AccuracyRate => 0.8,
        MetricKind::ResponseTime => -0.3,
        MetricKind::SessionDuration => 0.4,
        _ => 0.0,
    }
}

// ==================== Cross-Metric Correlation ====================

/// Pearson correlation between two metrics over shared hourly buckets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricCorrelation {
    pub metric_a: MetricKind,
    pub metric_b: MetricKind,
    pub coefficient: f64,
    /// Number of shared hourly buckets the coefficient was computed over
    pub sample_size: usize,
    /// Overlap-based weight [0, 1]; 30 shared buckets reads as full
    pub significance: f64,
}

/// Correlate every metric pair that shares enough hourly buckets.
///
/// Each metric is first reduced to its mean value per clock hour, and
/// all sample-count gates are applied to those hourly buckets rather
/// than raw events: a pair is skipped when either series covers fewer
/// than 5 distinct hours, or the two share fewer than 3, no matter how
/// many raw events fall inside an hour. Significance likewise counts
/// shared hours, reaching 1.0 at 30. Pair order follows
/// [`MetricKind::ALL`].
pub fn correlate_metrics(events: &[MetricEvent]) -> Vec<MetricCorrelation> {
    let mut raw: HashMap<MetricKind, BTreeMap<String, Vec<f64>>> = HashMap::new();
    for e in events {
        raw.entry(e.kind)
            .or_default()
            .entry(e.timestamp.format("%Y-%m-%dT%H").to_string())
            .or_default()
            .push(e.value);
    }

    let series: HashMap<MetricKind, BTreeMap<String, f64>> = raw
        .into_iter()
        .map(|(kind, buckets)| {
            let means = buckets
                .into_iter()
                .map(|(key, values)| (key, stats::mean(&values)))
                .collect();
            (kind, means)
        })
        .collect();

    let mut correlations = Vec::new();
    for (i, a) in MetricKind::ALL.iter().enumerate() {
        for b in MetricKind::ALL.iter().skip(i + 1) {
            let (Some(series_a), Some(series_b)) = (series.get(a), series.get(b)) else {
                continue;
            };
            if series_a.len() < MIN_SERIES_BUCKETS || series_b.len() < MIN_SERIES_BUCKETS {
                continue;
            }

            // BTreeMap keys are already sorted, so the shared bucket list
            // is chronological.
            let shared: Vec<&String> = series_a
                .keys()
                .filter(|key| series_b.contains_key(*key))
                .collect();
            if shared.len() < MIN_SHARED_BUCKETS {
                continue;
            }

            let xs: Vec<f64> = shared.iter().map(|key| series_a[*key]).collect();
            let ys: Vec<f64> = shared.iter().map(|key| series_b[*key]).collect();

            correlations.push(MetricCorrelation {
                metric_a: *a,
                metric_b: *b,
                coefficient: stats::pearson(&xs, &ys),
                sample_size: shared.len(),
                significance: (shared.len() as f64 / FULL_SIGNIFICANCE_OVERLAP).min(1.0),
            });
        }
    }

    correlations
}

// ==================== Unit Tests ====================

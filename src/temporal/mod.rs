//! Temporal Pattern Detection
//!
//! Detects recurring structure in *when* and *how long* the learner
//! studies, as opposed to *what* is retained:
//!
//! - Rhythms: recurring time-of-day and day-of-week performance structure
//! - Session shape: micro-session and binge-learning habits
//! - Waves: multi-day performance cycles found by autocorrelation
//! - Momentum: short-term trend in engagement and performance
//!
//! Detector thresholds (minimum sample counts, confidence cutoffs,
//! variance bounds) are empirically chosen tuning constants, kept as
//! named constants below rather than derived values.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

use crate::stats;
use crate::types::{weekday_name, MetricEvent, MetricKind, StudySession};

// ==================== Constants ====================

/// Minimum event-log size before any detector runs
const MIN_PATTERN_EVENTS: usize = 50;

/// Patterns below this confidence are discarded
const MIN_PATTERN_CONFIDENCE: f64 = 0.7;

/// Daily rhythm: distinct hours required, and points per hour
const MIN_DISTINCT_HOURS: usize = 8;
const MIN_POINTS_PER_HOUR: usize = 5;

/// Weekly cycle: distinct weekdays required, and the variance bound that
/// marks the cycle as significant
const MIN_DISTINCT_WEEKDAYS: usize = 5;
const WEEKLY_VARIANCE_THRESHOLD: f64 = 0.1;

/// Session shape cutoffs (minutes) and ratio triggers
const MICRO_SESSION_MINUTES: f64 = 5.0;
const BINGE_SESSION_MINUTES: f64 = 30.0;
const MICRO_RATIO_THRESHOLD: f64 = 0.4;
const BINGE_RATIO_THRESHOLD: f64 = 0.15;

/// Performance waves: smoothing window and autocorrelation lag scan
const WAVE_SMOOTHING_WINDOW: usize = 7;
const WAVE_MIN_LAG_DAYS: usize = 5;
const WAVE_MAX_LAG_DAYS: usize = 30;
const WAVE_CORRELATION_THRESHOLD: f64 = 0.5;

/// Consistency: distinct days required and the daily-count variance bound
const MIN_CONSISTENCY_DAYS: usize = 14;
const CONSISTENCY_VARIANCE_THRESHOLD: f64 = 5.0;

/// Rhythm analysis: samples per hour, top-hour counts
const RHYTHM_MIN_SAMPLES_PER_HOUR: usize = 3;
const OPTIMAL_HOUR_COUNT: usize = 4;
const PEAK_WINDOW_HOURS: usize = 3;

/// Fixed fatigue threshold reported with the energy pattern (minutes)
const FATIGUE_THRESHOLD_MINUTES: f64 = 45.0;

/// Momentum windows (days)
const STREAK_WINDOW_DAYS: i64 = 14;
const BREAKTHROUGH_WINDOW_DAYS: i64 = 30;
const PLATEAU_WINDOW_DAYS: i64 = 21;

// ==================== Data Structures ====================

/// Kinds of behavioral patterns the detectors can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    DailyRhythm,
    WeeklyCycle,
    BingeLearning,
    MicroSessions,
    ConsistencyPattern,
    SeasonalDrift,
    PerformanceWave,
    PlateauBreakthrough,
}

/// One detected behavioral pattern.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemporalPattern {
    pub kind: PatternKind,
    /// Detector confidence [0, 1]; only ≥ 0.7 survives filtering
    pub confidence: f64,
    pub span_start: DateTime<Utc>,
    pub span_end: DateTime<Utc>,
    /// Cycles per day (1.0 for a daily rhythm, 1/7 for a weekly cycle)
    pub frequency: f64,
    pub significance_score: f64,
    /// Detector-specific details (top hours, period length, ratios, ...)
    pub metadata: serde_json::Value,
}

/// Contiguous high-performance window within the day.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Peak-hour performance relative to the all-hour mean, capped at 2.0
    pub performance_multiplier: f64,
}

/// Hours of the day partitioned by relative performance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnergyDeclinePattern {
    pub peak_hours: Vec<u32>,
    pub recovery_hours: Vec<u32>,
    pub decline_hours: Vec<u32>,
    /// Session length after which performance typically drops
    pub fatigue_threshold_minutes: f64,
}

/// The learner's time-of-day performance profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearningRhythm {
    /// Best-performing hours, strongest first (up to 4)
    pub optimal_hours: Vec<u32>,
    pub peak_window: PeakWindow,
    pub energy_decline: EnergyDeclinePattern,
    /// How pronounced the hourly structure is [0, 0.9]
    pub rhythm_strength: f64,
    /// Day-to-day regularity of study volume [0, 1]
    pub consistency_score: f64,
}

/// Short-term engagement trend direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumDirection {
    Building,
    Maintaining,
    Declining,
}

/// Streak and trend summary over the recent study window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearningMomentum {
    /// Fraction of the last 14 days with at least one session [0, 1]
    pub streak_strength: f64,
    pub momentum_direction: MomentumDirection,
    /// Expected days the current streak continues
    pub predicted_continuation_days: f64,
    /// Chance of an imminent performance jump [0.1, 0.9]
    pub breakthrough_probability: f64,
    /// Chance the learner is stuck on a plateau [0.1, 0.9]
    pub plateau_risk: f64,
}

// ==================== Pattern Detection ====================

/// Run all pattern detectors over the event log and session records.
///
/// Returns an empty list when the log holds fewer than 50 events; each
/// detector needs volume before its output means anything. Only results
/// with confidence ≥ 0.7 are kept.
pub fn detect_patterns(events: &[MetricEvent], sessions: &[StudySession]) -> Vec<TemporalPattern> {
    if events.len() < MIN_PATTERN_EVENTS {
        return Vec::new();
    }

    let span = event_span(events);

    let mut patterns = Vec::new();
    if let Some(p) = detect_daily_rhythm(events, span) {
        patterns.push(p);
    }
    if let Some(p) = detect_weekly_cycle(events, span) {
        patterns.push(p);
    }
    patterns.extend(detect_session_shape(sessions, span));
    if let Some(p) = detect_performance_wave(events, span) {
        patterns.push(p);
    }
    if let Some(p) = detect_consistency(events, span) {
        patterns.push(p);
    }

    patterns.retain(|p| p.confidence >= MIN_PATTERN_CONFIDENCE);
    patterns
}

/// Daily rhythm: ranked hour-of-day performance buckets.
fn detect_daily_rhythm(
    events: &[MetricEvent],
    span: (DateTime<Utc>, DateTime<Utc>),
) -> Option<TemporalPattern> {
    let buckets = hourly_performance(events, MIN_POINTS_PER_HOUR);
    if buckets.len() < MIN_DISTINCT_HOURS {
        return None;
    }

    let means: Vec<f64> = buckets.iter().map(|(_, m)| *m).collect();
    let spread = stats::variance(&means);

    let mut ranked = buckets.clone();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let top_hours: Vec<u32> = ranked.iter().take(3).map(|(h, _)| *h).collect();

    Some(TemporalPattern {
        kind: PatternKind::DailyRhythm,
        confidence: (0.55 + spread * 5.0).min(0.95),
        span_start: span.0,
        span_end: span.1,
        frequency: 1.0,
        significance_score: (spread / 0.05).min(1.0),
        metadata: json!({
            "top_hours": top_hours,
            "hour_spread": spread,
        }),
    })
}

/// Weekly cycle: significant performance variance across weekdays.
fn detect_weekly_cycle(
    events: &[MetricEvent],
    span: (DateTime<Utc>, DateTime<Utc>),
) -> Option<TemporalPattern> {
    let mut buckets: HashMap<Weekday, Vec<f64>> = HashMap::new();
    for e in performance_events(events) {
        buckets.entry(e.timestamp.weekday()).or_default().push(e.value);
    }
    if buckets.len() < MIN_DISTINCT_WEEKDAYS {
        return None;
    }

    let day_means: Vec<(Weekday, f64)> = buckets
        .iter()
        .map(|(day, values)| (*day, stats::mean(values)))
        .collect();
    let means: Vec<f64> = day_means.iter().map(|(_, m)| *m).collect();
    let day_variance = stats::variance(&means);

    if day_variance <= WEEKLY_VARIANCE_THRESHOLD {
        return None;
    }

    let best = day_means
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let worst = day_means
        .iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    Some(TemporalPattern {
        kind: PatternKind::WeeklyCycle,
        confidence: (0.6 + day_variance).min(0.9),
        span_start: span.0,
        span_end: span.1,
        frequency: 1.0 / 7.0,
        significance_score: (day_variance / WEEKLY_VARIANCE_THRESHOLD).min(1.0),
        metadata: json!({
            "best_day": weekday_name(best.0),
            "worst_day": weekday_name(worst.0),
            "day_variance": day_variance,
        }),
    })
}

/// Session shape: micro-session and binge-learning habits.
fn detect_session_shape(
    sessions: &[StudySession],
    span: (DateTime<Utc>, DateTime<Utc>),
) -> Vec<TemporalPattern> {
    let mut patterns = Vec::new();
    if sessions.is_empty() {
        return patterns;
    }

    let total = sessions.len() as f64;
    let micro = sessions
        .iter()
        .filter(|s| s.duration_minutes <= MICRO_SESSION_MINUTES)
        .count() as f64;
    let binge = sessions
        .iter()
        .filter(|s| s.duration_minutes >= BINGE_SESSION_MINUTES)
        .count() as f64;

    let micro_ratio = micro / total;
    let binge_ratio = binge / total;

    if micro_ratio > MICRO_RATIO_THRESHOLD {
        patterns.push(TemporalPattern {
            kind: PatternKind::MicroSessions,
            confidence: (0.5 + micro_ratio * 0.6).min(0.9),
            span_start: span.0,
            span_end: span.1,
            frequency: 1.0,
            significance_score: micro_ratio,
            metadata: json!({ "micro_ratio": micro_ratio, "session_count": sessions.len() }),
        });
    }
    if binge_ratio > BINGE_RATIO_THRESHOLD {
        patterns.push(TemporalPattern {
            kind: PatternKind::BingeLearning,
            confidence: (0.6 + binge_ratio * 0.8).min(0.9),
            span_start: span.0,
            span_end: span.1,
            frequency: 1.0,
            significance_score: binge_ratio,
            metadata: json!({ "binge_ratio": binge_ratio, "session_count": sessions.len() }),
        });
    }

    patterns
}

/// Performance waves: multi-day cycles in smoothed daily accuracy.
fn detect_performance_wave(
    events: &[MetricEvent],
    span: (DateTime<Utc>, DateTime<Utc>),
) -> Option<TemporalPattern> {
    let series = daily_performance_series(events);
    if series.len() < WAVE_MIN_LAG_DAYS + 2 {
        return None;
    }

    let smoothed = stats::moving_average(&series, WAVE_SMOOTHING_WINDOW);

    let mut best_lag = 0;
    let mut best_correlation = 0.0;
    for lag in WAVE_MIN_LAG_DAYS..=WAVE_MAX_LAG_DAYS {
        let correlation = stats::autocorrelation(&smoothed, lag);
        if correlation > best_correlation {
            best_correlation = correlation;
            best_lag = lag;
        }
    }

    if best_correlation <= WAVE_CORRELATION_THRESHOLD {
        return None;
    }

    Some(TemporalPattern {
        kind: PatternKind::PerformanceWave,
        confidence: best_correlation.min(0.99),
        span_start: span.0,
        span_end: span.1,
        frequency: 1.0 / best_lag as f64,
        significance_score: best_correlation,
        metadata: json!({
            "period_days": best_lag,
            "amplitude": stats::variance(&smoothed),
        }),
    })
}

/// Consistency: near-constant daily study volume across two weeks.
fn detect_consistency(
    events: &[MetricEvent],
    span: (DateTime<Utc>, DateTime<Utc>),
) -> Option<TemporalPattern> {
    let counts = daily_event_counts(events);
    if counts.len() < MIN_CONSISTENCY_DAYS {
        return None;
    }

    let values: Vec<f64> = counts.values().map(|c| *c as f64).collect();
    let count_variance = stats::variance(&values);
    if count_variance >= CONSISTENCY_VARIANCE_THRESHOLD {
        return None;
    }

    Some(TemporalPattern {
        kind: PatternKind::ConsistencyPattern,
        confidence: 0.9,
        span_start: span.0,
        span_end: span.1,
        frequency: 1.0,
        significance_score: 1.0 - count_variance / CONSISTENCY_VARIANCE_THRESHOLD,
        metadata: json!({
            "distinct_days": counts.len(),
            "count_variance": count_variance,
        }),
    })
}

// ==================== Rhythm Analysis ====================

/// Build the learner's hour-of-day performance profile.
///
/// Hours with fewer than three accuracy samples are ignored. With no
/// qualifying hour at all, a neutral profile is returned (empty hour
/// lists, multiplier 1.0).
pub fn analyze_rhythm(events: &[MetricEvent]) -> LearningRhythm {
    let buckets = hourly_performance(events, RHYTHM_MIN_SAMPLES_PER_HOUR);

    if buckets.is_empty() {
        return LearningRhythm {
            optimal_hours: Vec::new(),
            peak_window: PeakWindow {
                start_hour: 0,
                end_hour: 0,
                performance_multiplier: 1.0,
            },
            energy_decline: EnergyDeclinePattern {
                peak_hours: Vec::new(),
                recovery_hours: Vec::new(),
                decline_hours: Vec::new(),
                fatigue_threshold_minutes: FATIGUE_THRESHOLD_MINUTES,
            },
            rhythm_strength: 0.0,
            consistency_score: 0.0,
        };
    }

    let mut ranked = buckets.clone();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let optimal_hours: Vec<u32> = ranked
        .iter()
        .take(OPTIMAL_HOUR_COUNT)
        .map(|(h, _)| *h)
        .collect();

    // Peak window spans the top hours; its multiplier compares their mean
    // performance to the all-hour mean.
    let top: Vec<(u32, f64)> = ranked.iter().take(PEAK_WINDOW_HOURS).cloned().collect();
    let start_hour = top.iter().map(|(h, _)| *h).min().unwrap_or(0);
    let end_hour = top.iter().map(|(h, _)| *h).max().unwrap_or(0);

    let all_means: Vec<f64> = buckets.iter().map(|(_, m)| *m).collect();
    let overall_mean = stats::mean(&all_means);
    let top_means: Vec<f64> = top.iter().map(|(_, m)| *m).collect();
    let performance_multiplier = if overall_mean > 0.0 {
        (stats::mean(&top_means) / overall_mean).min(2.0)
    } else {
        1.0
    };

    // Partition hours into performance thirds: peak / recovery / decline.
    let third = (ranked.len() + 2) / 3;
    let mut peak_hours: Vec<u32> = ranked.iter().take(third).map(|(h, _)| *h).collect();
    let mut recovery_hours: Vec<u32> = ranked.iter().skip(third).take(third).map(|(h, _)| *h).collect();
    let mut decline_hours: Vec<u32> = ranked.iter().skip(third * 2).map(|(h, _)| *h).collect();
    peak_hours.sort_unstable();
    recovery_hours.sort_unstable();
    decline_hours.sort_unstable();

    let rhythm_strength = if overall_mean > 0.0 {
        (stats::variance(&all_means) / overall_mean).min(0.9)
    } else {
        0.0
    };

    let daily_counts: Vec<f64> = daily_event_counts(events)
        .values()
        .map(|c| *c as f64)
        .collect();
    let mean_daily = stats::mean(&daily_counts);
    let consistency_score = if mean_daily > 0.0 {
        (1.0 - stats::variance(&daily_counts) / mean_daily).clamp(0.0, 1.0)
    } else {
        0.0
    };

    LearningRhythm {
        optimal_hours,
        peak_window: PeakWindow {
            start_hour,
            end_hour,
            performance_multiplier,
        },
        energy_decline: EnergyDeclinePattern {
            peak_hours,
            recovery_hours,
            decline_hours,
            fatigue_threshold_minutes: FATIGUE_THRESHOLD_MINUTES,
        },
        rhythm_strength,
        consistency_score,
    }
}

// ==================== Momentum Analysis ====================

/// Summarize streak strength and short-term performance trend.
pub fn analyze_momentum(
    events: &[MetricEvent],
    sessions: &[StudySession],
    now: DateTime<Utc>,
) -> LearningMomentum {
    let today = now.date_naive();

    // Streak: fraction of the last 14 days with at least one session.
    let mut active_days = 0;
    for offset in 0..STREAK_WINDOW_DAYS {
        let day = today - Duration::days(offset);
        if sessions.iter().any(|s| s.started_at.date_naive() == day) {
            active_days += 1;
        }
    }
    let streak_strength = active_days as f64 / STREAK_WINDOW_DAYS as f64;

    // Direction: first- vs second-half mean of the 14-day accuracy series.
    let recent_accuracy = accuracy_values_since(events, now, STREAK_WINDOW_DAYS);
    let momentum_direction = if recent_accuracy.len() < 2 {
        MomentumDirection::Maintaining
    } else {
        let mid = recent_accuracy.len() / 2;
        let delta = stats::mean(&recent_accuracy[mid..]) - stats::mean(&recent_accuracy[..mid]);
        if delta > 0.05 {
            MomentumDirection::Building
        } else if delta < -0.05 {
            MomentumDirection::Declining
        } else {
            MomentumDirection::Maintaining
        }
    };

    let direction_factor = match momentum_direction {
        MomentumDirection::Building => 1.5,
        MomentumDirection::Maintaining => 1.0,
        MomentumDirection::Declining => 0.7,
    };
    let predicted_continuation_days = 7.0 * streak_strength * direction_factor;

    // Breakthrough: trailing-10 vs trailing-30 sample means.
    let month_accuracy = accuracy_values_since(events, now, BREAKTHROUGH_WINDOW_DAYS);
    let breakthrough_probability = if month_accuracy.len() < 20 {
        0.3
    } else {
        let last_10 = &month_accuracy[month_accuracy.len() - 10..];
        let last_30_start = month_accuracy.len().saturating_sub(30);
        let last_30 = &month_accuracy[last_30_start..];
        (0.5 + 2.0 * (stats::mean(last_10) - stats::mean(last_30))).clamp(0.1, 0.9)
    };

    // Plateau: low variance of the smoothed 21-day series means flat
    // performance, which reads as plateau risk.
    let window_accuracy = accuracy_values_since(events, now, PLATEAU_WINDOW_DAYS);
    let plateau_risk = if window_accuracy.len() < 15 {
        0.3
    } else {
        let smoothed = stats::moving_average(&window_accuracy, 5);
        (1.0 - 10.0 * stats::variance(&smoothed)).clamp(0.1, 0.9)
    };

    LearningMomentum {
        streak_strength,
        momentum_direction,
        predicted_continuation_days,
        breakthrough_probability,
        plateau_risk,
    }
}

// ==================== Static Helpers ====================

/// Accuracy events are the performance signal for rhythm detection.
fn performance_events<'a>(events: &'a [MetricEvent]) -> impl Iterator<Item = &'a MetricEvent> {
    events.iter().filter(|e| e.kind == MetricKind::AccuracyRate)
}

/// Hour-of-day performance means for hours with enough samples, ordered
/// by hour.
fn hourly_performance(events: &[MetricEvent], min_samples: usize) -> Vec<(u32, f64)> {
    let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for e in performance_events(events) {
        buckets.entry(e.timestamp.hour()).or_default().push(e.value);
    }

    buckets
        .into_iter()
        .filter(|(_, values)| values.len() >= min_samples)
        .map(|(hour, values)| (hour, stats::mean(&values)))
        .collect()
}

/// Mean accuracy per calendar day, in date order.
fn daily_performance_series(events: &[MetricEvent]) -> Vec<f64> {
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for e in performance_events(events) {
        buckets
            .entry(e.timestamp.date_naive())
            .or_default()
            .push(e.value);
    }

    buckets.values().map(|values| stats::mean(values)).collect()
}

/// Event counts per calendar day, all metric kinds included.
fn daily_event_counts(events: &[MetricEvent]) -> BTreeMap<NaiveDate, usize> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for e in events {
        *counts.entry(e.timestamp.date_naive()).or_default() += 1;
    }
    counts
}

/// Accuracy values within the trailing window, ordered by time.
fn accuracy_values_since(events: &[MetricEvent], now: DateTime<Utc>, days: i64) -> Vec<f64> {
    let cutoff = now - Duration::days(days);
    let mut recent: Vec<(DateTime<Utc>, f64)> = performance_events(events)
        .filter(|e| e.timestamp >= cutoff && e.timestamp <= now)
        .map(|e| (e.timestamp, e.value))
        .collect();

    recent.sort_by_key(|(ts, _)| *ts);
    recent.into_iter().map(|(_, v)| v).collect()
}

/// First and last event timestamps; callers only use this on non-empty
/// logs.
fn event_span(events: &[MetricEvent]) -> (DateTime<Utc>, DateTime<Utc>) {
    let mut min = events[0].timestamp;
    let mut max = events[0].timestamp;
    for e in events {
        if e.timestamp < min {
            min = e.timestamp;
        }
        if e.timestamp > max {
            max = e.timestamp;
        }
    }
    (min, max)
}

// ==================== Unit Tests ====================

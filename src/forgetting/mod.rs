//! Forgetting Curve & Spaced Repetition
//!
//! Core theory:
//! - Exponential forgetting: projected retention decays as
//!   R(t) = R₀ · e^(−decay·t) with t in days since the last observation
//! - Review scheduling follows the SM-2 recurrence: successful recalls
//!   grow the interval by the ease factor, lapses reset it to one day
//! - All model parameters are re-derived from the item's accuracy history
//!   on every call; nothing is cached between calls
//!
//! Key quantities:
//! - decay_rate: per-item forgetting coefficient, from the OLS slope of
//!   accuracy over elapsed days (steeper decline → faster forgetting)
//! - stability_factor: historical accuracy blended with a consistency
//!   bonus from the variance of recent samples
//! - retrieval_strength: time-decayed last observed performance
//! - optimal_interval: days until projected retention crosses the target
//!
//! References:
//! - Ebbinghaus, H. (1885). Über das Gedächtnis.
//! - Wozniak, P. A. (1990). Optimization of learning (SM-2 algorithm).

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::stats;
use crate::types::{days_between, ItemMetrics, MetricEvent, MetricKind, StudySession};

// ==================== Constants ====================

/// Target retention the optimal interval is solved for
const RETENTION_TARGET: f64 = 0.85;

/// Baseline decay before the accuracy slope adjustment
const BASE_DECAY: f64 = 0.1;

/// Decay rate clamp range
const MIN_DECAY: f64 = 0.01;
const MAX_DECAY: f64 = 0.5;

/// Floor on retrieval strength; retention never models to exactly zero
const MIN_RETRIEVAL: f64 = 0.05;

/// Review interval clamp range (days)
const MIN_INTERVAL_DAYS: f64 = 1.0;
const MAX_INTERVAL_DAYS: f64 = 365.0;

/// Consistency bonus cap when blending stability
const MAX_CONSISTENCY_BONUS: f64 = 0.2;

/// Largest possible variance of values confined to [0, 1]
const UNIT_VARIANCE_CEILING: f64 = 0.25;

/// How many trailing samples feed the consistency bonus
const CONSISTENCY_WINDOW: usize = 10;

/// Samples no older than this count as "recent" for confidence
const RECENT_SAMPLE_DAYS: i64 = 30;

/// SM-2 initial ease factor
const INITIAL_EASE_FACTOR: f64 = 2.5;

/// SM-2 ease factor floor (no ceiling is enforced)
const MIN_EASE_FACTOR: f64 = 1.3;

/// Success threshold on the 0–5 quality scale
const SUCCESS_QUALITY: u8 = 3;

/// Cap on predicted success probability
const MAX_SUCCESS_PROBABILITY: f64 = 0.95;

// ==================== Data Structures ====================

/// Per-item decay model, fully recomputed on each call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForgettingCurveModel {
    /// Modeled strength at first exposure [0, 1]
    pub initial_strength: f64,
    /// Exponential forgetting coefficient [0.01, 0.5]
    pub decay_rate: f64,
    /// Accuracy-plus-consistency blend [0, 1]
    pub stability_factor: f64,
    /// Time-decayed current recall strength [0.05, 1]
    pub retrieval_strength: f64,
    /// Days until projected retention crosses the target [1, 365]
    pub optimal_interval_days: f64,
    /// How much history backs this model [0, 0.9]
    pub confidence_level: f64,
}

impl ForgettingCurveModel {
    /// Explicit insufficient-data fallback: a moderate-confidence default
    /// model for items with no accuracy history. Not an error.
    pub fn insufficient_data() -> Self {
        Self {
            initial_strength: 0.3,
            decay_rate: 0.1,
            stability_factor: 0.5,
            retrieval_strength: 0.3,
            optimal_interval_days: 1.0,
            confidence_level: 0.2,
        }
    }
}

/// Review urgency buckets, ordered from most to least pressing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPriority {
    Urgent,
    Due,
    Optional,
    TooEarly,
}

/// Prediction of a review outcome at a given point in time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewPrediction {
    /// Probability of successful recall [0, 0.95]
    pub success_probability: f64,
    /// Suggested days from the last review to the next one
    pub recommended_delay_days: f64,
    /// Suggested difficulty shift for the next exercise [-0.3, 0.3]
    pub difficulty_adjustment: f64,
    pub review_priority: ReviewPriority,
    /// Human-readable explanation of the decision
    pub reasoning: Vec<String>,
}

/// SM-2 schedule for the next review.
///
/// The caller persists this back into the item's
/// [`SpacedRepetitionState`](crate::types::SpacedRepetitionState) when it
/// decides to apply it; see [`SpacedRepetitionSchedule::apply_to`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpacedRepetitionSchedule {
    pub next_review_date: DateTime<Utc>,
    /// Review interval in days [1, 365]
    pub interval_days: u32,
    /// Ease factor after this review (floor 1.3)
    pub ease_factor: f64,
    /// Consecutive successes, 0 after a lapse
    pub repetition_number: u32,
    /// Quality grade (0–5) that produced this schedule
    pub last_quality: u8,
}

impl SpacedRepetitionSchedule {
    /// Write this schedule into an item's stored state. The host calls
    /// this once it commits to the schedule.
    pub fn apply_to(&self, metrics: &mut ItemMetrics) {
        metrics.next_review_date = Some(self.next_review_date);
        metrics.spaced_repetition = Some(crate::types::SpacedRepetitionState {
            next_review_date: self.next_review_date,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            repetition_number: self.repetition_number,
        });
    }
}

/// Suggested consolidation activity kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Review,
    SelfTest,
    ContextPractice,
}

/// One prioritized consolidation suggestion (lower priority value = more
/// pressing).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsolidationActivity {
    pub kind: ActivityKind,
    pub priority: u8,
    pub description: String,
}

/// How durably an item has moved toward long-term memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryConsolidation {
    /// Blend of accuracy, session frequency and recency [0, 1]
    pub consolidation_score: f64,
    /// Risk that parallel study is interfering with this item [0, 1]
    pub interference_risk: f64,
    pub activities: Vec<ConsolidationActivity>,
}

/// Coarse direction of the learner's overall memory stability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityTrend {
    Improving,
    Stable,
    Declining,
}

/// One entry in an item ranking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemRanking {
    pub word_id: String,
    pub score: f64,
}

/// Aggregate view over all items' forgetting models.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForgettingCurveInsights {
    pub total_items: usize,
    /// Items at or past their optimal interval
    pub due_count: usize,
    /// Items at or past 1.5× their optimal interval
    pub overdue_count: usize,
    /// Mean retrieval strength across items
    pub average_retention: f64,
    pub stability_trend: StabilityTrend,
    /// Top items by decay rate, fastest forgetters first
    pub most_forgettable: Vec<ItemRanking>,
    /// Top items by retrieval × stability
    pub strongest: Vec<ItemRanking>,
}

// ==================== Model Computation ====================

/// Derive the forgetting model for one item from its accuracy history.
///
/// Only `accuracy_rate` events whose `word_id` matches the item feed the
/// model; with none present the fixed insufficient-data defaults are
/// returned. The model is a pure function of its inputs: identical calls
/// yield identical output.
pub fn compute_model(
    metrics: &ItemMetrics,
    events: &[MetricEvent],
    now: DateTime<Utc>,
) -> ForgettingCurveModel {
    let samples = accuracy_samples(&metrics.word_id, events);
    if samples.is_empty() {
        return ForgettingCurveModel::insufficient_data();
    }

    let first_ts = samples[0].0;
    let day_offsets: Vec<f64> = samples
        .iter()
        .map(|(ts, _)| days_between(first_ts, *ts).max(0) as f64)
        .collect();
    let values: Vec<f64> = samples.iter().map(|(_, v)| v.clamp(0.0, 1.0)).collect();

    // Declining accuracy over elapsed days raises the decay rate.
    let slope = stats::linear_slope_xy(&day_offsets, &values);
    let decay_rate = (BASE_DECAY - slope).clamp(MIN_DECAY, MAX_DECAY);

    // Stability: historical accuracy plus a consistency bonus. Low
    // variance in the trailing window earns up to the bonus cap.
    let recent_start = values.len().saturating_sub(CONSISTENCY_WINDOW);
    let recent_variance = stats::variance(&values[recent_start..]);
    let consistency_bonus =
        (1.0 - (recent_variance / UNIT_VARIANCE_CEILING).min(1.0)) * MAX_CONSISTENCY_BONUS;
    let stability_factor = (stats::mean(&values) * 0.8 + consistency_bonus).clamp(0.0, 1.0);

    // Retrieval strength: last observed performance under exponential
    // time decay, floored so retention never models to zero.
    let (last_ts, last_value) = samples[samples.len() - 1];
    let days_since_last = days_between(last_ts, now).max(0) as f64;
    let retrieval_strength = (last_value.clamp(0.0, 1.0) * (-decay_rate * days_since_last).exp())
        .clamp(MIN_RETRIEVAL, 1.0);

    // Solve retrieval · e^(−decay·t) = target for t.
    let optimal_interval_days = if retrieval_strength <= RETENTION_TARGET {
        MIN_INTERVAL_DAYS
    } else {
        ((retrieval_strength / RETENTION_TARGET).ln() / decay_rate)
            .clamp(MIN_INTERVAL_DAYS, MAX_INTERVAL_DAYS)
    };

    let head = &values[..values.len().min(3)];
    let initial_strength = stats::mean(head).clamp(MIN_RETRIEVAL, 1.0);

    // Confidence grows with sample count, with a small bonus for samples
    // inside the recency window.
    let n = samples.len() as f64;
    let recent_count = samples
        .iter()
        .filter(|(ts, _)| days_between(*ts, now) <= RECENT_SAMPLE_DAYS)
        .count() as f64;
    let confidence_level = (0.2 + n * 0.035 + 0.1 * (recent_count / n)).min(0.9);

    ForgettingCurveModel {
        initial_strength,
        decay_rate,
        stability_factor,
        retrieval_strength,
        optimal_interval_days,
        confidence_level,
    }
}

/// Compute models for many items in parallel.
///
/// Output order matches input order. Each item only sees events carrying
/// its own `word_id`, so passing the full shared log is fine.
pub fn batch_compute_models(
    items: &[ItemMetrics],
    events: &[MetricEvent],
    now: DateTime<Utc>,
) -> Vec<ForgettingCurveModel> {
    items
        .par_iter()
        .map(|item| compute_model(item, events, now))
        .collect()
}

// ==================== Review Prediction ====================

/// Predict the outcome of reviewing after `days_since_last_review` days.
pub fn predict_success(model: &ForgettingCurveModel, days_since_last_review: f64) -> ReviewPrediction {
    let days = days_since_last_review.max(0.0);

    let raw = model.retrieval_strength * (-model.decay_rate * days).exp()
        + model.stability_factor * 0.2;
    let success_probability = raw.clamp(0.0, MAX_SUCCESS_PROBABILITY);

    let review_priority = if success_probability < 0.5 {
        ReviewPriority::Urgent
    } else if days >= model.optimal_interval_days {
        ReviewPriority::Due
    } else if days >= 0.8 * model.optimal_interval_days {
        ReviewPriority::Optional
    } else {
        ReviewPriority::TooEarly
    };

    let mut reasoning = Vec::new();

    let recommended_delay_days = if success_probability > 0.9 {
        reasoning.push(format!(
            "recall probability {:.2} is above 0.90, the interval can grow by 50%",
            success_probability
        ));
        model.optimal_interval_days * 1.5
    } else if success_probability < 0.7 {
        reasoning.push(format!(
            "recall probability {:.2} is below 0.70, review immediately",
            success_probability
        ));
        0.0
    } else {
        let remaining = (model.optimal_interval_days - days).max(0.0);
        reasoning.push(format!(
            "{:.1} days remain until the optimal interval of {:.1} days",
            remaining, model.optimal_interval_days
        ));
        remaining
    };

    let difficulty_adjustment = if success_probability > 0.9 {
        reasoning.push("item looks too easy, raising difficulty".to_string());
        0.3
    } else if success_probability < 0.6 {
        reasoning.push("item looks too hard, lowering difficulty".to_string());
        -0.3
    } else {
        0.0
    };

    match review_priority {
        ReviewPriority::Urgent => {
            reasoning.push("recall has likely dropped below 50%, review is urgent".to_string())
        }
        ReviewPriority::Due => {
            reasoning.push("item is at or past its optimal review interval".to_string())
        }
        ReviewPriority::Optional => {
            reasoning.push("item is approaching its optimal review interval".to_string())
        }
        ReviewPriority::TooEarly => {
            reasoning.push("reviewing now would be earlier than necessary".to_string())
        }
    }

    ReviewPrediction {
        success_probability,
        recommended_delay_days,
        difficulty_adjustment,
        review_priority,
        reasoning,
    }
}

// ==================== Spaced Repetition (SM-2) ====================

/// Generate the next review schedule from a 0–5 quality grade.
///
/// This reproduces the SM-2 recurrence exactly; review-queue ordering in
/// the host depends on it:
/// - first review: interval 1 day, ease factor 2.5
/// - success (quality ≥ 3): repetition 2 is 6 days, afterwards
///   round(interval · ease); ease += 0.1 − (5−q)·(0.08 + (5−q)·0.02)
/// - failure (quality < 3): interval resets to 1 day, repetitions to 0
/// - ease floor 1.3 (no ceiling), interval clamped to [1, 365] days
pub fn generate_schedule(
    metrics: &ItemMetrics,
    last_review: DateTime<Utc>,
    quality: u8,
) -> SpacedRepetitionSchedule {
    let quality = quality.min(5);

    let (interval_days, ease_factor, repetition_number) = match &metrics.spaced_repetition {
        // A failed first review starts at zero repetitions, same as a lapse.
        None => {
            let repetition = if quality >= SUCCESS_QUALITY { 1 } else { 0 };
            (1_u32, INITIAL_EASE_FACTOR, repetition)
        }
        Some(state) => {
            let ease = updated_ease(state.ease_factor, quality);
            if quality >= SUCCESS_QUALITY {
                let repetition = state.repetition_number + 1;
                let interval = match repetition {
                    1 => 1,
                    2 => 6,
                    _ => (state.interval_days as f64 * ease).round() as u32,
                };
                (clamp_interval(interval), ease, repetition)
            } else {
                (1, ease, 0)
            }
        }
    };

    SpacedRepetitionSchedule {
        next_review_date: last_review + Duration::days(interval_days as i64),
        interval_days,
        ease_factor,
        repetition_number,
        last_quality: quality,
    }
}

/// SM-2 ease update with the 1.3 floor.
fn updated_ease(ease: f64, quality: u8) -> f64 {
    let q = quality as f64;
    (ease + 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)).max(MIN_EASE_FACTOR)
}

fn clamp_interval(interval: u32) -> u32 {
    interval.clamp(MIN_INTERVAL_DAYS as u32, MAX_INTERVAL_DAYS as u32)
}

// ==================== Consolidation ====================

/// Estimate how well an item has consolidated, and what would help.
///
/// `recent_sessions` is whatever window of sessions the caller considers
/// recent; the score saturates at 10 sessions and the interference term
/// at 50 practiced words.
pub fn analyze_consolidation(
    metrics: &ItemMetrics,
    recent_sessions: &[StudySession],
    now: DateTime<Utc>,
) -> MemoryConsolidation {
    let accuracy = metrics.accuracy();

    let session_frequency = (recent_sessions.len().min(10) as f64) / 10.0;

    let days_since_last = days_between(metrics.last_seen, now).max(0) as f64;
    let recency = (1.0 - days_since_last / 7.0).clamp(0.0, 1.0);

    let consolidation_score =
        (0.6 * accuracy + 0.3 * session_frequency + 0.1 * recency).clamp(0.0, 1.0);

    let recent_word_volume: u32 = recent_sessions.iter().map(|s| s.word_count).sum();
    let volume_pressure = (recent_word_volume.min(50) as f64) / 50.0;
    let interference_risk =
        (0.5 * volume_pressure + 0.5 * (1.0 - metrics.confidence_score)).clamp(0.0, 1.0);

    let mut activities = Vec::new();
    if consolidation_score < 0.7 {
        activities.push(ConsolidationActivity {
            kind: ActivityKind::Review,
            priority: 1,
            description: format!(
                "re-study '{}' soon; consolidation score {:.2} is below 0.70",
                metrics.word_id, consolidation_score
            ),
        });
        activities.push(ConsolidationActivity {
            kind: ActivityKind::SelfTest,
            priority: 2,
            description: format!(
                "quiz '{}' without hints to strengthen retrieval",
                metrics.word_id
            ),
        });
    }
    if interference_risk > 0.6 {
        activities.push(ConsolidationActivity {
            kind: ActivityKind::ContextPractice,
            priority: 3,
            description: format!(
                "practice '{}' in sentences; interference risk {:.2} is high",
                metrics.word_id, interference_risk
            ),
        });
    }

    MemoryConsolidation {
        consolidation_score,
        interference_risk,
        activities,
    }
}

// ==================== Insights ====================

/// Aggregate all items' models into a review-queue overview.
///
/// Per-item models are computed in parallel; an empty item collection
/// yields zero counts and a stable trend.
pub fn insights(
    all_metrics: &[ItemMetrics],
    all_events: &[MetricEvent],
    now: DateTime<Utc>,
) -> ForgettingCurveInsights {
    if all_metrics.is_empty() {
        return ForgettingCurveInsights {
            total_items: 0,
            due_count: 0,
            overdue_count: 0,
            average_retention: 0.0,
            stability_trend: StabilityTrend::Stable,
            most_forgettable: Vec::new(),
            strongest: Vec::new(),
        };
    }

    let models = batch_compute_models(all_metrics, all_events, now);

    let mut due_count = 0;
    let mut overdue_count = 0;
    for (item, model) in all_metrics.iter().zip(models.iter()) {
        let days_since = days_between(item.last_seen, now).max(0) as f64;
        if days_since >= model.optimal_interval_days {
            due_count += 1;
        }
        if days_since >= 1.5 * model.optimal_interval_days {
            overdue_count += 1;
        }
    }

    let retentions: Vec<f64> = models.iter().map(|m| m.retrieval_strength).collect();
    let average_retention = stats::mean(&retentions);

    let blended: Vec<f64> = models
        .iter()
        .map(|m| (m.stability_factor + m.retrieval_strength) / 2.0)
        .collect();
    let blended_mean = stats::mean(&blended);
    let stability_trend = if blended_mean > 0.6 {
        StabilityTrend::Improving
    } else if blended_mean < 0.4 {
        StabilityTrend::Declining
    } else {
        StabilityTrend::Stable
    };

    let most_forgettable = rank_items(all_metrics, &models, |m| m.decay_rate);
    let strongest = rank_items(all_metrics, &models, |m| {
        m.retrieval_strength * m.stability_factor
    });

    ForgettingCurveInsights {
        total_items: all_metrics.len(),
        due_count,
        overdue_count,
        average_retention,
        stability_trend,
        most_forgettable,
        strongest,
    }
}

/// Top five items by the given model score, descending.
fn rank_items(
    items: &[ItemMetrics],
    models: &[ForgettingCurveModel],
    score: impl Fn(&ForgettingCurveModel) -> f64,
) -> Vec<ItemRanking> {
    let mut ranked: Vec<ItemRanking> = items
        .iter()
        .zip(models.iter())
        .map(|(item, model)| ItemRanking {
            word_id: item.word_id.clone(),
            score: score(model),
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(5);
    ranked
}

// ==================== Static Helpers ====================

/// Accuracy observations for one item, ordered by time.
fn accuracy_samples(word_id: &str, events: &[MetricEvent]) -> Vec<(DateTime<Utc>, f64)> {
    let mut samples: Vec<(DateTime<Utc>, f64)> = events
        .iter()
        .filter(|e| e.kind == MetricKind::AccuracyRate)
        .filter(|e| e.word_id.as_deref() == Some(word_id))
        .map(|e| (e.timestamp, e.value))
        .collect();

    samples.sort_by_key(|(ts, _)| *ts);
    samples
}

// ==================== Unit Tests ====================

//! Common Types and Constants
//!
//! Input records shared by all analytics modules: per-item learning
//! metrics, the append-only metric event log, and study session records.
//!
//! The core never performs I/O. Callers load these records from whatever
//! persistence layer the host app uses and pass them in by reference;
//! every analysis function allocates fresh output.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Observed caller-side cap on the event log size.
///
/// The core never prunes events; hosts keep the most recent
/// `EVENT_LOG_CAP` entries to bound the working set of a call.
pub const EVENT_LOG_CAP: usize = 10_000;

// ==================== Metric Events ====================

/// Tracked metric kinds.
///
/// The set is closed: every event in the log carries exactly one of
/// these, and the analytics modules key their grouping on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    AccuracyRate,
    ResponseTime,
    SessionDuration,
    WordsPerMinute,
    RetentionRate,
    MotivationScore,
    DifficultyPreference,
}

impl MetricKind {
    /// All metric kinds, in a stable order used for pairwise iteration.
    pub const ALL: [MetricKind; 7] = [
        MetricKind::AccuracyRate,
        MetricKind::ResponseTime,
        MetricKind::SessionDuration,
        MetricKind::WordsPerMinute,
        MetricKind::RetentionRate,
        MetricKind::MotivationScore,
        MetricKind::DifficultyPreference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::AccuracyRate => "accuracy_rate",
            MetricKind::ResponseTime => "response_time",
            MetricKind::SessionDuration => "session_duration",
            MetricKind::WordsPerMinute => "words_per_minute",
            MetricKind::RetentionRate => "retention_rate",
            MetricKind::MotivationScore => "motivation_score",
            MetricKind::DifficultyPreference => "difficulty_preference",
        }
    }
}

/// One element of the append-only metric event log.
///
/// `word_id` is an explicit foreign key to the item the event concerns.
/// A dangling reference (no matching [`ItemMetrics`]) silently yields an
/// empty lookup downstream, never an error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricEvent {
    /// When the metric was observed
    pub timestamp: DateTime<Utc>,
    /// Which metric this value belongs to
    pub kind: MetricKind,
    /// Numeric observation (unit depends on `kind`)
    pub value: f64,
    /// Item this event concerns, if any
    pub word_id: Option<String>,
    /// Free-form category tag (e.g. wordbook or topic)
    pub category: Option<String>,
}

impl MetricEvent {
    pub fn new(timestamp: DateTime<Utc>, kind: MetricKind, value: f64) -> Self {
        Self {
            timestamp,
            kind,
            value,
            word_id: None,
            category: None,
        }
    }

    pub fn for_word(
        timestamp: DateTime<Utc>,
        kind: MetricKind,
        value: f64,
        word_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            value,
            word_id: Some(word_id.into()),
            category: None,
        }
    }
}

// ==================== Item Metrics ====================

/// Embedded spaced-repetition state, written back by the caller after it
/// applies a generated schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpacedRepetitionState {
    /// When this item should next be reviewed
    pub next_review_date: DateTime<Utc>,
    /// SM-2 ease factor (floor 1.3)
    pub ease_factor: f64,
    /// Current review interval in days [1, 365]
    pub interval_days: u32,
    /// Consecutive successful repetitions (0 after a lapse)
    pub repetition_number: u32,
}

/// Accumulated learning metrics for one studied item.
///
/// Created on the first interaction and mutated by the host on every
/// subsequent one; the analytics modules only ever read it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemMetrics {
    pub word_id: String,
    pub encounter_count: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    /// Incrementally maintained mean response time (milliseconds)
    pub avg_response_time_ms: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// correct / encounters, clamped to [0, 1]
    pub confidence_score: f64,
    /// Last computed retention estimate, persisted by the host
    pub retention_estimate: f64,
    pub next_review_date: Option<DateTime<Utc>>,
    pub spaced_repetition: Option<SpacedRepetitionState>,
}

impl ItemMetrics {
    /// Create metrics for an item seen for the first time at `now`.
    pub fn new(word_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            word_id: word_id.into(),
            encounter_count: 0,
            correct_count: 0,
            incorrect_count: 0,
            avg_response_time_ms: 0.0,
            first_seen: now,
            last_seen: now,
            confidence_score: 0.0,
            retention_estimate: 0.0,
            next_review_date: None,
            spaced_repetition: None,
        }
    }

    /// Record one interaction: counts accumulate, the response-time mean
    /// is updated incrementally, confidence is recomputed.
    pub fn record_interaction(&mut self, is_correct: bool, response_time_ms: f64, now: DateTime<Utc>) {
        self.encounter_count += 1;
        if is_correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }

        // Incremental mean: avg += (x - avg) / n
        let n = self.encounter_count as f64;
        self.avg_response_time_ms += (response_time_ms - self.avg_response_time_ms) / n;

        self.confidence_score = self.accuracy();
        self.last_seen = now;
    }

    /// Historical accuracy, 0.0 when the item has never been encountered.
    pub fn accuracy(&self) -> f64 {
        if self.encounter_count == 0 {
            return 0.0;
        }
        (self.correct_count as f64 / self.encounter_count as f64).clamp(0.0, 1.0)
    }
}

// ==================== Study Sessions ====================

/// One study session as reported by the host.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudySession {
    pub started_at: DateTime<Utc>,
    pub duration_minutes: f64,
    /// Words practiced during the session
    pub word_count: u32,
    /// Quiz score [0, 1] if the session ended with a quiz
    pub quiz_score: Option<f64>,
}

// ==================== Calendar Helpers ====================

/// Whole calendar days between two instants, in UTC.
///
/// The original behavior mixed millisecond and calendar arithmetic at day
/// boundaries; all "days since" computations in this crate use this one
/// definition: the difference of the two UTC calendar dates.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later.date_naive() - earlier.date_naive()).num_days()
}

/// English weekday name, used in pattern metadata and reports.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    // ============ ItemMetrics Tests ============

    #[test]
    fn test_new_item_has_zero_counts() {
        let item = ItemMetrics::new("w1", ts(2024, 1, 1, 9));

        assert_eq!(item.encounter_count, 0);
        assert_eq!(item.correct_count, 0);
        assert_eq!(item.incorrect_count, 0);
        assert!((item.accuracy() - 0.0).abs() < EPSILON);
        assert!((item.confidence_score - 0.0).abs() < EPSILON);
    }

    #[test]
    fn test_record_interaction_accumulates_counts() {
        let mut item = ItemMetrics::new("w1", ts(2024, 1, 1, 9));

        item.record_interaction(true, 1200.0, ts(2024, 1, 1, 9));
        item.record_interaction(false, 1800.0, ts(2024, 1, 2, 9));
        item.record_interaction(true, 900.0, ts(2024, 1, 3, 9));

        assert_eq!(item.encounter_count, 3);
        assert_eq!(item.correct_count, 2);
        assert_eq!(item.incorrect_count, 1);
        assert_eq!(item.last_seen, ts(2024, 1, 3, 9));
    }

    #[test]
    fn test_incremental_response_time_mean() {
        let mut item = ItemMetrics::new("w1", ts(2024, 1, 1, 9));

        item.record_interaction(true, 1000.0, ts(2024, 1, 1, 9));
        item.record_interaction(true, 2000.0, ts(2024, 1, 1, 10));
        item.record_interaction(true, 3000.0, ts(2024, 1, 1, 11));

        // (1000 + 2000 + 3000) / 3 = 2000
        assert!((item.avg_response_time_ms - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_tracks_accuracy() {
        let mut item = ItemMetrics::new("w1", ts(2024, 1, 1, 9));

        item.record_interaction(true, 1000.0, ts(2024, 1, 1, 9));
        item.record_interaction(true, 1000.0, ts(2024, 1, 1, 10));
        item.record_interaction(false, 1000.0, ts(2024, 1, 1, 11));
        item.record_interaction(true, 1000.0, ts(2024, 1, 1, 12));

        assert!((item.confidence_score - 0.75).abs() < EPSILON);
        assert!(item.confidence_score >= 0.0 && item.confidence_score <= 1.0);
    }

    // ============ MetricKind Tests ============

    #[test]
    fn test_metric_kind_all_is_complete_and_unique() {
        let mut strs: Vec<&str> = MetricKind::ALL.iter().map(|k| k.as_str()).collect();
        strs.sort();
        strs.dedup();

        assert_eq!(strs.len(), 7);
    }

    #[test]
    fn test_metric_kind_serde_snake_case() {
        let json = serde_json::to_string(&MetricKind::AccuracyRate).unwrap();
        assert_eq!(json, "\"accuracy_rate\"");

        let kind: MetricKind = serde_json::from_str("\"words_per_minute\"").unwrap();
        assert_eq!(kind, MetricKind::WordsPerMinute);
    }

    // ============ days_between Tests ============

    #[test]
    fn test_days_between_calendar_semantics() {
        // 23:00 to 01:00 next day is 2 hours but 1 calendar day
        let a = Utc.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 2, 1, 0, 0).unwrap();
        assert_eq!(days_between(a, b), 1);

        // Same day, 23 hours apart, is 0 days
        let c = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let d = Utc.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).unwrap();
        assert_eq!(days_between(c, d), 0);
    }

    #[test]
    fn test_days_between_negative_when_reversed() {
        let a = ts(2024, 1, 10, 12);
        let b = ts(2024, 1, 1, 12);
        assert_eq!(days_between(a, b), -9);
    }
}

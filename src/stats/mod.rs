//! Statistical Primitives
//!
//! Shared numeric building blocks for the analytics modules.
//!
//! Every function here is total: empty or degenerate input (length
//! mismatch, zero variance) resolves to 0.0 or an empty vector rather
//! than panicking. The services lean on this so that no reachable input
//! can raise.

use crate::types::EPSILON;

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance, 0.0 for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Pearson correlation coefficient over two equally sized series.
///
/// Returns 0.0 for mismatched lengths, fewer than two points, or a
/// constant series (zero variance on either side).
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }

    let mx = mean(xs);
    let my = mean(ys);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < EPSILON {
        return 0.0;
    }

    (cov / denom).clamp(-1.0, 1.0)
}

/// Ordinary least-squares slope of `ys` against explicit `xs`.
///
/// Returns 0.0 when the x values carry no spread.
pub fn linear_slope_xy(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }

    let mx = mean(xs);
    let my = mean(ys);

    let mut num = 0.0;
    let mut denom = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mx;
        num += dx * (y - my);
        denom += dx * dx;
    }

    if denom < EPSILON {
        return 0.0;
    }

    num / denom
}

/// OLS slope of a series against its index sequence 0, 1, 2, ...
pub fn linear_slope(values: &[f64]) -> f64 {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    linear_slope_xy(&xs, values)
}

/// Trailing moving average with the given window.
///
/// Each output point averages the window ending at that index (a shorter
/// prefix window at the start), so the output has the same length as the
/// input. An empty input or a zero window yields an empty vector.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() || window == 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let len = (i + 1).min(window) as f64;
        out.push(sum / len);
    }
    out
}

/// Autocorrelation of a series at the given lag.
///
/// Standard estimator: sum of lagged co-deviations over the total squared
/// deviation. Returns 0.0 when the lag leaves fewer than two overlapping
/// points or the series is constant.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if lag == 0 || values.len() < lag + 2 {
        return 0.0;
    }

    let m = mean(values);
    let denom: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denom < EPSILON {
        return 0.0;
    }

    let num: f64 = (0..values.len() - lag)
        .map(|i| (values[i] - m) * (values[i + lag] - m))
        .sum();

    (num / denom).clamp(-1.0, 1.0)
}

/// Value at the given percentile (0–100) by nearest-rank on a sorted copy.
///
/// Returns 0.0 for an empty slice.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let p = pct.clamp(0.0, 100.0) / 100.0;
    let rank = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank]
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    // ============ Mean / Variance Tests ============

    #[test]
    fn test_mean_basic() {
        assert!((mean(&[2.0, 4.0, 6.0]) - 4.0).abs() < TOLERANCE);
        assert!((mean(&[]) - 0.0).abs() < TOLERANCE);
        assert!((mean(&[5.0]) - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_population_variance_and_std_dev() {
        // [2, 4, 6]: deviations -2, 0, 2 → variance 8/3, stddev ≈ 1.633
        let v = variance(&[2.0, 4.0, 6.0]);
        assert!((v - 8.0 / 3.0).abs() < TOLERANCE);
        assert!((std_dev(&[2.0, 4.0, 6.0]) - 1.632993161).abs() < 1e-6);
    }

    #[test]
    fn test_variance_degenerate_inputs() {
        assert!((variance(&[]) - 0.0).abs() < TOLERANCE);
        assert!((variance(&[3.0]) - 0.0).abs() < TOLERANCE);
        assert!((variance(&[3.0, 3.0, 3.0]) - 0.0).abs() < TOLERANCE);
    }

    // ============ Pearson Tests ============

    #[test]
    fn test_pearson_perfect_positive() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [2.0, 4.0, 6.0, 8.0, 10.0];
        assert!((pearson(&xs, &ys) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [10.0, 8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&xs, &ys) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_pearson_guards() {
        // mismatched lengths
        assert!((pearson(&[1.0, 2.0], &[1.0]) - 0.0).abs() < TOLERANCE);
        // constant series
        assert!((pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]) - 0.0).abs() < TOLERANCE);
        // too short
        assert!((pearson(&[1.0], &[1.0]) - 0.0).abs() < TOLERANCE);
    }

    // ============ Slope Tests ============

    #[test]
    fn test_linear_slope_exact() {
        // y = 3x + 1 over indices 0..5
        let ys = [1.0, 4.0, 7.0, 10.0, 13.0];
        assert!((linear_slope(&ys) - 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_linear_slope_flat_and_degenerate() {
        assert!((linear_slope(&[5.0, 5.0, 5.0]) - 0.0).abs() < TOLERANCE);
        assert!((linear_slope(&[]) - 0.0).abs() < TOLERANCE);
        assert!((linear_slope(&[1.0]) - 0.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_linear_slope_xy_zero_spread() {
        // all x identical → slope undefined, guarded to 0
        let xs = [2.0, 2.0, 2.0];
        let ys = [1.0, 5.0, 9.0];
        assert!((linear_slope_xy(&xs, &ys) - 0.0).abs() < TOLERANCE);
    }

    // ============ Moving Average Tests ============

    #[test]
    fn test_moving_average_window_three() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = moving_average(&values, 3);

        assert_eq!(smoothed.len(), 5);
        assert!((smoothed[0] - 1.0).abs() < TOLERANCE);
        assert!((smoothed[1] - 1.5).abs() < TOLERANCE);
        assert!((smoothed[2] - 2.0).abs() < TOLERANCE);
        assert!((smoothed[3] - 3.0).abs() < TOLERANCE);
        assert!((smoothed[4] - 4.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_moving_average_degenerate() {
        assert!(moving_average(&[], 3).is_empty());
        assert!(moving_average(&[1.0, 2.0], 0).is_empty());
    }

    // ============ Autocorrelation Tests ============

    #[test]
    fn test_autocorrelation_periodic_series() {
        // Period-4 square-ish wave: strong correlation at lag 4
        let mut values = Vec::new();
        for _ in 0..10 {
            values.extend_from_slice(&[1.0, 0.5, -1.0, -0.5]);
        }

        let at_period = autocorrelation(&values, 4);
        let off_period = autocorrelation(&values, 2);

        assert!(at_period > 0.8);
        assert!(off_period < at_period);
    }

    #[test]
    fn test_autocorrelation_guards() {
        assert!((autocorrelation(&[1.0, 2.0, 3.0], 5) - 0.0).abs() < TOLERANCE);
        assert!((autocorrelation(&[1.0, 2.0, 3.0], 0) - 0.0).abs() < TOLERANCE);
        assert!((autocorrelation(&[2.0, 2.0, 2.0, 2.0, 2.0], 1) - 0.0).abs() < TOLERANCE);
    }

    // ============ Percentile Tests ============

    #[test]
    fn test_percentile_nearest_rank() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];

        assert!((percentile(&values, 0.0) - 10.0).abs() < TOLERANCE);
        assert!((percentile(&values, 50.0) - 30.0).abs() < TOLERANCE);
        assert!((percentile(&values, 100.0) - 50.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let values = [50.0, 10.0, 40.0, 20.0, 30.0];
        assert!((percentile(&values, 50.0) - 30.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_percentile_empty() {
        assert!((percentile(&[], 50.0) - 0.0).abs() < TOLERANCE);
    }
}

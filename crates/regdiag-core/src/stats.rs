use itertools::{Itertools, MinMaxResult};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of squared deviations from the mean.
pub fn total_sum_of_squares(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|&v| (v - m).powi(2)).sum())
}

pub fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

pub fn rmse(y: &[f64], y_hat: &[f64]) -> Option<f64> {
    if y.len() != y_hat.len() || y.is_empty() {
        return None;
    }

    let sum_sq: f64 = y.iter().zip(y_hat.iter()).map(|(&yi, &yhi)| (yi - yhi).powi(2)).sum();

    Some((sum_sq / y.len() as f64).sqrt())
}

/// Gaussian AIC up to a constant. `k` counts every estimated parameter,
/// intercept included. Undefined for a zero residual sum of squares.
pub fn aic_from_rss(rss: f64, n: usize, k: usize) -> Option<f64> {
    if rss <= 0.0 || n == 0 {
        return None;
    }
    Some(n as f64 * (rss / n as f64).ln() + 2.0 * k as f64)
}

pub fn r2_from_predictions(y: &[f64], y_hat: &[f64]) -> Option<f64> {
    if y.len() != y_hat.len() || y.is_empty() {
        return None;
    }

    let ss_res: f64 = y.iter().zip(y_hat).map(|(&yi, &yhi)| (yi - yhi).powi(2)).sum();
    let ss_tot = total_sum_of_squares(y)?;

    if ss_tot == 0.0 {
        return None;
    }

    Some(1.0 - ss_res / ss_tot)
}

/// `k` is the number of predictors, intercept excluded.
pub fn adjusted_r2(r2: f64, n: usize, k: usize) -> f64 {
    if n <= k + 1 {
        return r2; // Not enough data to adjust
    }
    1.0 - (1.0 - r2) * (n as f64 - 1.0) / (n as f64 - k as f64 - 1.0)
}

/// Smallest and largest finite value.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    match values.iter().copied().filter(|v| v.is_finite()).minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    }
}

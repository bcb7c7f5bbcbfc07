use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one least squares fit. Flat so the transport layer can
/// serialize it as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    pub rmse: f64,
    pub aic: Option<f64>,
    pub predictions: Vec<f64>,
    pub residuals: Vec<f64>,
    pub n_samples: usize,
    pub n_features: usize,
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "intercept: {:.4}, coefficients: {:?}, r2: {:.4}, n: {}, features: {}",
            self.intercept, self.coefficients, self.r_squared, self.n_samples, self.n_features
        )
    }
}

impl FitResult {
    /// `intercept + dot(coefficients, row)`.
    pub fn predict_row(&self, row: &[f64]) -> Option<f64> {
        if row.len() != self.coefficients.len() {
            return None;
        }
        Some(self.intercept + self.coefficients.iter().zip(row).map(|(c, x)| c * x).sum::<f64>())
    }

    pub fn residual_sum_of_squares(&self) -> f64 {
        crate::stats::sum_of_squares(&self.residuals)
    }
}

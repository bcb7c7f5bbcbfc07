use crate::data::FeatureMatrix;
use crate::regression::fitresult::FitResult;
use crate::regression::ols::{design_matrix, ScaledNormal};
use crate::regression::regerror::{RegResult, RegressionError};

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTest {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

/// t tests for the intercept and every coefficient of `fit`, which must come
/// from fitting `x`.
pub fn coefficient_tests(x: &FeatureMatrix, fit: &FitResult) -> RegResult<Vec<CoefficientTest>> {
    let (m, n) = x.shape();
    if m != fit.n_samples {
        return Err(RegressionError::DimensionMismatch {
            what: "sample count",
            expected: fit.n_samples,
            found: m,
        });
    }
    if n != fit.n_features {
        return Err(RegressionError::DimensionMismatch {
            what: "feature count",
            expected: fit.n_features,
            found: n,
        });
    }
    let n_params = n + 1;
    if m <= n_params {
        return Err(RegressionError::InsufficientDegreesOfFreedom { n_samples: m, n_params });
    }
    let dof = (m - n_params) as f64;

    let cov_diag = ScaledNormal::new(&design_matrix(x)).inverse_diagonal()?;

    let sigma2 = fit.residual_sum_of_squares() / dof;
    let dist = StudentsT::new(0.0, 1.0, dof)
        .map_err(|e| RegressionError::InvalidParameter(format!("student's t: {e}")))?;

    let estimates = std::iter::once(fit.intercept).chain(fit.coefficients.iter().copied());
    let tests = estimates
        .enumerate()
        .map(|(j, estimate)| {
            let std_error = (sigma2 * cov_diag[j]).sqrt();
            let t_value = estimate / std_error;
            // perfect fits give se = 0, t = inf and p = 0
            let p_value = if t_value.is_nan() { f64::NAN } else { 2.0 * dist.sf(t_value.abs()) };
            let name = if j == 0 { "intercept".to_string() } else { format!("feature_{j}") };
            CoefficientTest { name, estimate, std_error, t_value, p_value }
        })
        .collect();
    Ok(tests)
}

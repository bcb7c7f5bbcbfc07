use crate::data::{all_finite, FeatureMatrix, TargetVector};
use crate::regression::fitresult::FitResult;
use crate::regression::regerror::{RegResult, RegressionError};
use crate::stats::{adjusted_r2, aic_from_rss, min_max, r2_from_predictions, rmse, sum_of_squares};

use nalgebra::{DMatrix, DVector};
use std::fmt;

/// Equilibrated normal equations matrices whose smallest/largest singular
/// value ratio falls below this are rejected as singular.
pub const MIN_RCOND: f64 = 1e-12;
const SVD_MAX_ITER: usize = 10_000;

/// `[1 | X]`
pub(crate) fn design_matrix(x: &FeatureMatrix) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols() + 1, |i, j| if j == 0 { 1.0 } else { x[(i, j - 1)] })
}

/// `XᵀX` scaled to a unit diagonal, `D^-1/2 XᵀX D^-1/2`, so that the
/// conditioning check does not depend on feature units.
#[derive(Debug, Clone)]
pub(crate) struct ScaledNormal {
    pub matrix: DMatrix<f64>,
    /// `1 / sqrt(diag)`, zero for an all zero column.
    pub scale: DVector<f64>,
}

impl ScaledNormal {
    pub fn new(xa: &DMatrix<f64>) -> Self {
        let xtx = xa.tr_mul(xa);
        let scale =
            xtx.map_diagonal(|d| if d > 0.0 && d.is_finite() { 1.0 / d.sqrt() } else { 0.0 });
        let n = xtx.nrows();
        let matrix = DMatrix::from_fn(n, n, |i, j| xtx[(i, j)] * scale[i] * scale[j]);
        ScaledNormal { matrix, scale }
    }

    /// Reciprocal condition number, rejected below [`MIN_RCOND`].
    pub fn check(&self) -> RegResult<f64> {
        let rcond = reciprocal_condition(&self.matrix);
        // NaN rcond fails too
        if !(rcond >= MIN_RCOND) {
            return Err(RegressionError::SingularMatrix { rcond });
        }
        Ok(rcond)
    }

    /// Solves `XᵀX beta = rhs`.
    pub fn solve(&self, rhs: &DVector<f64>) -> RegResult<DVector<f64>> {
        let rcond = self.check()?;
        let z = self
            .matrix
            .clone()
            .lu()
            .solve(&rhs.component_mul(&self.scale))
            .ok_or(RegressionError::SingularMatrix { rcond })?;
        Ok(z.component_mul(&self.scale))
    }

    /// Diagonal of `(XᵀX)^-1`.
    pub fn inverse_diagonal(&self) -> RegResult<DVector<f64>> {
        let rcond = self.check()?;
        let n = self.matrix.nrows();
        let inv = self
            .matrix
            .clone()
            .lu()
            .solve(&DMatrix::identity(n, n))
            .ok_or(RegressionError::SingularMatrix { rcond })?;
        Ok(DVector::from_fn(n, |j, _| inv[(j, j)] * self.scale[j] * self.scale[j]))
    }
}

pub(crate) fn reciprocal_condition(m: &DMatrix<f64>) -> f64 {
    let Some(svd) = m.clone().try_svd(false, false, f64::EPSILON, SVD_MAX_ITER) else {
        return 0.0;
    };
    match min_max(svd.singular_values.as_slice()) {
        Some((lo, hi)) if hi > 0.0 => lo / hi,
        _ => 0.0,
    }
}

fn check_shapes(x: &FeatureMatrix, y: &TargetVector) -> RegResult<()> {
    if x.nrows() != y.len() {
        return Err(RegressionError::DimensionMismatch {
            what: "target length",
            expected: x.nrows(),
            found: y.len(),
        });
    }
    if !all_finite(x.iter()) || !all_finite(y.iter()) {
        return Err(RegressionError::NonFiniteInput);
    }
    Ok(())
}

fn apply(xa: &DMatrix<f64>, beta: &DVector<f64>) -> Vec<f64> {
    (xa * beta).as_slice().to_vec()
}

fn solve(x: &FeatureMatrix, y: &TargetVector) -> RegResult<(DVector<f64>, FitResult)> {
    check_shapes(x, y)?;
    let (m, n) = x.shape();

    let xa = design_matrix(x);
    let beta = ScaledNormal::new(&xa).solve(&xa.tr_mul(y))?;

    let y = y.as_slice();
    let predictions = apply(&xa, &beta);
    // constant target, SS_tot = 0
    let r_squared =
        r2_from_predictions(y, &predictions).ok_or(RegressionError::DegenerateTarget)?;
    let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(&yi, &yhi)| yi - yhi).collect();
    let ss_res = sum_of_squares(&residuals);

    let result = FitResult {
        intercept: beta[0],
        coefficients: beta.as_slice()[1..].to_vec(),
        r_squared,
        adjusted_r_squared: adjusted_r2(r_squared, m, n),
        rmse: rmse(y, &predictions).unwrap_or(0.0),
        aic: aic_from_rss(ss_res, m, n + 1),
        predictions,
        residuals,
        n_samples: m,
        n_features: n,
    };
    Ok((beta, result))
}

/// Ordinary least squares with intercept. Pure; see [`LinearRegression`] for
/// a model that keeps its parameters around for `predict`.
pub fn fit(x: &FeatureMatrix, y: &TargetVector) -> RegResult<FitResult> {
    solve(x, y).map(|(_, result)| result)
}

/// OLS model that remembers the parameters of its last successful fit.
///
/// `fit` takes `&mut self`, so sharing one instance between threads needs
/// external locking. One instance per request avoids that.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    beta: Option<DVector<f64>>,
}

impl fmt::Display for LinearRegression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.beta {
            Some(beta) => write!(f, "LinearRegression({} features)", beta.len() - 1),
            None => write!(f, "LinearRegression(unfitted)"),
        }
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self { beta: None }
    }

    /// Rebuild a model from a result cached by the caller.
    pub fn from_fit(result: &FitResult) -> Self {
        let mut beta = Vec::with_capacity(result.coefficients.len() + 1);
        beta.push(result.intercept);
        beta.extend_from_slice(&result.coefficients);
        Self { beta: Some(DVector::from_vec(beta)) }
    }

    /// On error the previously fitted parameters, if any, are kept.
    pub fn fit(&mut self, x: &FeatureMatrix, y: &TargetVector) -> RegResult<FitResult> {
        let (beta, result) = solve(x, y)?;
        self.beta = Some(beta);
        Ok(result)
    }

    /// `intercept + X coefficients`, computed the same way as the fitted
    /// predictions.
    pub fn predict(&self, x: &FeatureMatrix) -> RegResult<Vec<f64>> {
        let beta = self.beta.as_ref().ok_or(RegressionError::NotFitted)?;
        let n_features = beta.len() - 1;
        if x.ncols() != n_features {
            return Err(RegressionError::DimensionMismatch {
                what: "feature count",
                expected: n_features,
                found: x.ncols(),
            });
        }
        Ok(apply(&design_matrix(x), beta))
    }

    pub fn is_fitted(&self) -> bool {
        self.beta.is_some()
    }
    pub fn intercept(&self) -> Option<f64> {
        self.beta.as_ref().map(|b| b[0])
    }
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.beta.as_ref().map(|b| &b.as_slice()[1..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{feature_matrix_from_rows, target_vector};
    use crate::generator::generate;

    fn simple() -> (FeatureMatrix, TargetVector) {
        let x = feature_matrix_from_rows(&[vec![1.], vec![2.], vec![3.], vec![4.]]).unwrap();
        let y = target_vector(&[2.1, 3.9, 6.2, 7.8]);
        (x, y)
    }

    #[test]
    fn test_simple_line() {
        let (x, y) = simple();
        let res = fit(&x, &y).unwrap();
        dbg!(&res);
        assert!(res.intercept.abs() < 0.3);
        assert_eq!(res.coefficients.len(), 1);
        assert!((res.coefficients[0] - 2.0).abs() < 0.1);
        assert!(res.r_squared > 0.99);
        assert_eq!(res.n_samples, 4);
        assert_eq!(res.n_features, 1);
    }

    #[test]
    fn test_simple_line_exact_values() {
        // slope = sxy / sxx = 9.7 / 5
        let (x, y) = simple();
        let res = fit(&x, &y).unwrap();
        assert!((res.coefficients[0] - 1.94).abs() < 1e-10);
        assert!((res.intercept - 0.15).abs() < 1e-10);
        assert!((res.r_squared - (1.0 - 0.082 / 18.9)).abs() < 1e-10);
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = DMatrix::from_fn(5, 2, |i, j| (i * 2 + j) as f64);
        let y = target_vector(&[1., 2., 3., 4.]);
        assert_eq!(
            fit(&x, &y),
            Err(RegressionError::DimensionMismatch {
                what: "target length",
                expected: 5,
                found: 4
            })
        );
    }

    #[test]
    fn test_duplicate_columns_singular() {
        let x = feature_matrix_from_rows(&[
            vec![1., 1.],
            vec![2., 2.],
            vec![3., 3.],
            vec![4., 4.],
            vec![5., 5.],
        ])
        .unwrap();
        let y = target_vector(&[1., 3., 2., 5., 4.]);
        match fit(&x, &y) {
            Err(RegressionError::SingularMatrix { rcond }) => assert!(rcond < MIN_RCOND),
            other => panic!("expected SingularMatrix, got {other:?}"),
        }
    }

    #[test]
    fn test_feature_units_do_not_matter() {
        let data = generate(200, 2, 0.1, 3).unwrap();
        let base = fit(&data.x, &data.y).unwrap();

        let mut x = data.x.clone();
        x.column_mut(0).scale_mut(1e4);
        x.column_mut(1).scale_mut(1e-3);
        let res = fit(&x, &data.y).unwrap();

        assert!((res.r_squared - base.r_squared).abs() < 1e-9);
        assert!((res.intercept - base.intercept).abs() < 1e-6);
        assert!((res.coefficients[0] * 1e4 - base.coefficients[0]).abs() < 1e-6);
        assert!((res.coefficients[1] * 1e-3 - base.coefficients[1]).abs() < 1e-6);
    }

    #[test]
    fn test_scaled_duplicate_column_still_singular() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, i as f64 * 1e6]).collect();
        let x = feature_matrix_from_rows(&rows).unwrap();
        let y = target_vector(&[0., 2., 1., 4., 3., 6., 5., 8., 7., 9.]);
        assert!(matches!(fit(&x, &y), Err(RegressionError::SingularMatrix { .. })));
    }

    #[test]
    fn test_zero_column_singular() {
        let x = feature_matrix_from_rows(&[vec![1., 0.], vec![2., 0.], vec![3., 0.]]).unwrap();
        let y = target_vector(&[1., 3., 2.]);
        assert!(matches!(
            fit(&x, &y),
            Err(RegressionError::SingularMatrix { rcond }) if rcond < MIN_RCOND
        ));
    }

    #[test]
    fn test_collinear_columns_singular() {
        // third column = first + 2 * second
        let rows: Vec<Vec<f64>> = (0..8)
            .map(|i| {
                let a = i as f64;
                let b = (i * i) as f64;
                vec![a, b, a + 2.0 * b]
            })
            .collect();
        let x = feature_matrix_from_rows(&rows).unwrap();
        let y = target_vector(&[0., 1., 3., 2., 5., 4., 7., 9.]);
        assert!(matches!(fit(&x, &y), Err(RegressionError::SingularMatrix { .. })));
    }

    #[test]
    fn test_fewer_samples_than_parameters_singular() {
        let x = feature_matrix_from_rows(&[vec![1., 2., 3.], vec![4., 5., 7.]]).unwrap();
        let y = target_vector(&[1., 2.]);
        assert!(matches!(fit(&x, &y), Err(RegressionError::SingularMatrix { .. })));
    }

    #[test]
    fn test_constant_target() {
        let (x, _) = simple();
        let y = target_vector(&[3., 3., 3., 3.]);
        assert_eq!(fit(&x, &y), Err(RegressionError::DegenerateTarget));
    }

    #[test]
    fn test_non_finite_input() {
        let (x, _) = simple();
        let y = target_vector(&[1., f64::NAN, 3., 4.]);
        assert_eq!(fit(&x, &y), Err(RegressionError::NonFiniteInput));
    }

    #[test]
    fn test_intercept_only() {
        let x = DMatrix::<f64>::zeros(3, 0);
        let y = target_vector(&[1., 2., 3.]);
        let res = fit(&x, &y).unwrap();
        assert!((res.intercept - 2.0).abs() < 1e-12);
        assert!(res.coefficients.is_empty());
        assert!(res.r_squared.abs() < 1e-12);
    }

    #[test]
    fn test_predictions_match_parameters() {
        let data = generate(60, 3, 0.5, 11).unwrap();
        let res = fit(&data.x, &data.y).unwrap();
        for i in 0..data.n_samples() {
            let row: Vec<f64> = data.x.row(i).iter().copied().collect();
            let manual = res.predict_row(&row).unwrap();
            assert!((res.predictions[i] - manual).abs() < 1e-9);
            assert!((res.residuals[i] - (data.y[i] - res.predictions[i])).abs() < 1e-12);
        }
    }

    #[test]
    fn test_residuals_orthogonal_to_design() {
        let data = generate(80, 4, 1.0, 5).unwrap();
        let res = fit(&data.x, &data.y).unwrap();
        let xa = design_matrix(&data.x);
        let r = DVector::from_column_slice(&res.residuals);
        let scale = data.y.norm();
        for j in 0..xa.ncols() {
            let dot = xa.column(j).dot(&r);
            assert!(dot.abs() < 1e-8 * scale * xa.column(j).norm(), "column {j}: {dot}");
        }
        let sum: f64 = res.residuals.iter().sum();
        assert!(sum.abs() < 1e-8);
    }

    #[test]
    fn test_r2_bounds() {
        let noisy = generate(50, 2, 3.0, 2).unwrap();
        let res = fit(&noisy.x, &noisy.y).unwrap();
        assert!(res.r_squared <= 1.0);
        assert!(res.r_squared < 1.0 - 1e-9);

        let exact = generate(50, 2, 0.0, 2).unwrap();
        let res = fit(&exact.x, &exact.y).unwrap();
        assert!((res.r_squared - 1.0).abs() < 1e-12);
        assert!(res.residuals.iter().all(|r| r.abs() < 1e-9));
    }

    #[test]
    fn test_noise_free_recovery() {
        let data = generate(100, 2, 0.0, 42).unwrap();
        let res = fit(&data.x, &data.y).unwrap();
        assert!((res.intercept - data.true_intercept).abs() < 1e-6);
        for (est, truth) in res.coefficients.iter().zip(&data.true_coefficients) {
            assert!((est - truth).abs() < 1e-6);
        }
    }

    #[test]
    fn test_goodness_of_fit_extras() {
        let (x, y) = simple();
        let res = fit(&x, &y).unwrap();
        let expected_rmse = (res.residual_sum_of_squares() / 4.0).sqrt();
        assert!((res.rmse - expected_rmse).abs() < 1e-12);
        assert!(res.adjusted_r_squared < res.r_squared);
        assert!(res.aic.is_some());
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = simple();
        let model = LinearRegression::new();
        assert!(!model.is_fitted());
        assert_eq!(model.predict(&x), Err(RegressionError::NotFitted));
    }

    #[test]
    fn test_predict_reproduces_fit() {
        let data = generate(40, 3, 0.2, 9).unwrap();
        let mut model = LinearRegression::new();
        let res = model.fit(&data.x, &data.y).unwrap();
        let pred = model.predict(&data.x).unwrap();
        assert_eq!(pred, res.predictions);
        assert_eq!(model.intercept(), Some(res.intercept));
        assert_eq!(model.coefficients(), Some(res.coefficients.as_slice()));
    }

    #[test]
    fn test_predict_feature_mismatch() {
        let (x, y) = simple();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let wide = DMatrix::from_element(2, 3, 1.0);
        assert!(matches!(
            model.predict(&wide),
            Err(RegressionError::DimensionMismatch { expected: 1, found: 3, .. })
        ));
    }

    #[test]
    fn test_failed_fit_keeps_model() {
        let (x, y) = simple();
        let mut model = LinearRegression::new();
        let res = model.fit(&x, &y).unwrap();

        let flat = target_vector(&[1., 1., 1., 1.]);
        assert_eq!(model.fit(&x, &flat), Err(RegressionError::DegenerateTarget));
        assert_eq!(model.predict(&x).unwrap(), res.predictions);
    }

    #[test]
    fn test_from_cached_fit() {
        let (x, y) = simple();
        let res = fit(&x, &y).unwrap();
        let model = LinearRegression::from_fit(&res);
        let new_x = feature_matrix_from_rows(&[vec![10.]]).unwrap();
        let pred = model.predict(&new_x).unwrap();
        assert!((pred[0] - (0.15 + 19.4)).abs() < 1e-9);
    }
}

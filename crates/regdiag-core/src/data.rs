use crate::regression::regerror::{RegResult, RegressionError};

use nalgebra::{DMatrix, DVector};

/// m samples x n features, one row per sample.
pub type FeatureMatrix = DMatrix<f64>;
/// One target value per sample.
pub type TargetVector = DVector<f64>;

/// Builds a feature matrix from per-sample rows. Every row must have the same
/// number of features.
pub fn feature_matrix_from_rows(rows: &[Vec<f64>]) -> RegResult<FeatureMatrix> {
    let n_features = rows.first().map_or(0, |r| r.len());
    if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
        return Err(RegressionError::DimensionMismatch {
            what: "features per row",
            expected: n_features,
            found: bad.len(),
        });
    }
    Ok(DMatrix::from_fn(rows.len(), n_features, |i, j| rows[i][j]))
}

pub fn target_vector(values: &[f64]) -> TargetVector {
    DVector::from_column_slice(values)
}

pub(crate) fn all_finite<'a>(values: impl IntoIterator<Item = &'a f64>) -> bool {
    values.into_iter().all(|v| v.is_finite())
}

/// Synthetic regression data together with the parameters that produced it.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub x: FeatureMatrix,
    pub y: TargetVector,
    pub true_intercept: f64,
    pub true_coefficients: Vec<f64>,
}

impl SyntheticData {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }
    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_samples() {
        let x = feature_matrix_from_rows(&[vec![1., 2.], vec![3., 4.], vec![5., 6.]]).unwrap();
        assert_eq!(x.nrows(), 3);
        assert_eq!(x.ncols(), 2);
        assert_eq!(x[(1, 0)], 3.);
        assert_eq!(x.row(2).iter().copied().collect::<Vec<_>>(), vec![5., 6.]);
    }

    #[test]
    fn test_ragged_rows() {
        let res = feature_matrix_from_rows(&[vec![1., 2.], vec![3.]]);
        assert_eq!(
            res,
            Err(RegressionError::DimensionMismatch {
                what: "features per row",
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_empty_rows() {
        let x = feature_matrix_from_rows(&[]).unwrap();
        assert_eq!(x.shape(), (0, 0));
    }
}

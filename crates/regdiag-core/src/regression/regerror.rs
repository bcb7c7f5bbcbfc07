use plotters::drawing::DrawingAreaErrorKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RegressionError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("dimension mismatch: {what} (expected {expected}, got {found})")]
    DimensionMismatch { what: &'static str, expected: usize, found: usize },
    #[error("normal equations matrix is singular or ill-conditioned (rcond {rcond:e})")]
    SingularMatrix { rcond: f64 },
    #[error("target has zero variance, r squared is undefined")]
    DegenerateTarget,
    #[error("model must be fitted before prediction")]
    NotFitted,
    #[error("input contains NaN or infinite values")]
    NonFiniteInput,
    #[error("not enough samples for inference: {n_samples} samples, {n_params} parameters")]
    InsufficientDegreesOfFreedom { n_samples: usize, n_params: usize },
    #[error("could not render diagnostics: {0}")]
    RenderError(String),
}

impl<E> From<DrawingAreaErrorKind<E>> for RegressionError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RegressionError::RenderError(err.to_string())
    }
}

impl From<image::ImageError> for RegressionError {
    fn from(err: image::ImageError) -> Self {
        RegressionError::RenderError(err.to_string())
    }
}

pub type RegResult<T> = Result<T, RegressionError>;

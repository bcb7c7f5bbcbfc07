pub mod fitresult;
pub mod inference;
pub mod ols;
pub mod regerror;

pub use fitresult::FitResult;
pub use inference::{coefficient_tests, CoefficientTest};
pub use ols::{fit, LinearRegression};
pub use regerror::{RegResult, RegressionError};

//! Multiple linear regression with ordinary least squares, synthetic data
//! generation and diagnostic plots.
//!
//! Data flows generator -> regression -> diag_plot. Nothing in here does I/O
//! or logging, that is left to the caller.

pub mod data;
pub mod diag_plot;
pub mod generator;
pub mod regression;
pub mod stats;

pub use data::{feature_matrix_from_rows, target_vector, FeatureMatrix, SyntheticData, TargetVector};
pub use diag_plot::render;
pub use generator::{generate, generate_with_rng, GeneratorConfig};
pub use regression::{
    coefficient_tests, fit, CoefficientTest, FitResult, LinearRegression, RegResult,
    RegressionError,
};

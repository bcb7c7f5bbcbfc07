use crate::data::SyntheticData;
use crate::regression::regerror::{RegResult, RegressionError};

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SAMPLES: usize = 100;
pub const DEFAULT_FEATURES: usize = 2;
pub const DEFAULT_NOISE: f64 = 0.1;
pub const DEFAULT_SEED: u64 = 42;

const COEFFICIENT_SCALE: f64 = 2.0;
const INTERCEPT_SCALE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub n_samples: usize,
    pub n_features: usize,
    pub noise_level: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_SAMPLES,
            n_features: DEFAULT_FEATURES,
            noise_level: DEFAULT_NOISE,
            seed: DEFAULT_SEED,
        }
    }
}

impl GeneratorConfig {
    pub fn new(n_samples: usize, n_features: usize, noise_level: f64, seed: u64) -> Self {
        Self { n_samples, n_features, noise_level, seed }
    }

    pub fn validate(&self) -> RegResult<()> {
        if self.n_samples < 1 {
            return Err(RegressionError::InvalidParameter("n_samples must be at least 1".into()));
        }
        if self.n_features < 1 {
            return Err(RegressionError::InvalidParameter("n_features must be at least 1".into()));
        }
        if !self.noise_level.is_finite() || self.noise_level < 0.0 {
            return Err(RegressionError::InvalidParameter(format!(
                "noise_level must be a finite value >= 0, got {}",
                self.noise_level
            )));
        }
        Ok(())
    }
}

/// Seeded entry point. Each call owns its generator, so equal seeds give
/// equal data regardless of what else runs in the process.
pub fn generate(
    n_samples: usize,
    n_features: usize,
    noise_level: f64,
    seed: u64,
) -> RegResult<SyntheticData> {
    let cfg = GeneratorConfig::new(n_samples, n_features, noise_level, seed);
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    generate_with_rng(&cfg, &mut rng)
}

/// Draws X ~ N(0, 1), coefficients ~ 2 N(0, 1), intercept ~ 5 N(0, 1) and
/// `y = intercept + X coef + noise_level * N(0, 1)`.
///
/// `cfg.seed` is ignored here, the caller's generator is used as is.
pub fn generate_with_rng<R: Rng>(
    cfg: &GeneratorConfig,
    rng: &mut R,
) -> RegResult<SyntheticData> {
    cfg.validate()?;
    let (m, n) = (cfg.n_samples, cfg.n_features);

    // from_fn walks column-major, draw row by row instead
    let draws: Vec<f64> = (0..m * n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
    let x = DMatrix::from_row_slice(m, n, &draws);

    let true_coefficients: Vec<f64> =
        (0..n).map(|_| rng.sample::<f64, _>(StandardNormal) * COEFFICIENT_SCALE).collect();
    let true_intercept = rng.sample::<f64, _>(StandardNormal) * INTERCEPT_SCALE;

    let coef = DVector::from_column_slice(&true_coefficients);
    let signal = &x * &coef;
    let y = DVector::from_fn(m, |i, _| {
        let noise: f64 = rng.sample(StandardNormal);
        true_intercept + signal[i] + cfg.noise_level * noise
    });

    Ok(SyntheticData { x, y, true_intercept, true_coefficients })
}

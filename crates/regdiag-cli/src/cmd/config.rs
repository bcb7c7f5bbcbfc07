use crate::table_io::{read_table, write_synthetic};

use regdiag_core::{
    coefficient_tests, generate, render, CoefficientTest, FitResult, GeneratorConfig,
    LinearRegression, RegressionError,
};

use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/* =================== Public configuration types =================== */

#[derive(Debug)]
pub struct Config {
    pub verbosity: u8,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub enum Action {
    Generate(Generate),
    Fit(Fit),
    Predict(Predict),
    Demo(Demo),
}

#[derive(Debug, Clone)]
pub struct Generate {
    pub generator: GeneratorConfig,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Fit {
    pub input: PathBuf,
    pub target: Option<String>,
    pub plot: Option<PathBuf>,
    pub tests: bool,
}

#[derive(Debug, Clone)]
pub struct Predict {
    pub input: PathBuf,
    pub new: PathBuf,
    pub target: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Demo {
    pub generator: GeneratorConfig,
    pub plot: bool,
}

/* =================== Error type (no process::exit) =================== */

#[derive(thiserror::Error, Debug)]
pub enum CmdError {
    #[error("{0}")]
    Regression(#[from] RegressionError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Msg(String),
}

/* =================== Output records =================== */

#[derive(Serialize)]
struct FitReport<'a> {
    #[serde(flatten)]
    results: &'a FitResult,
    feature_names: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    coefficient_tests: Option<Vec<CoefficientTest>>,
}

#[derive(Serialize)]
struct PredictReport<'a> {
    feature_names: &'a [String],
    predictions: Vec<f64>,
}

#[derive(Serialize)]
struct DemoReport<'a> {
    results: &'a FitResult,
    true_intercept: f64,
    true_coefficients: &'a [f64],
    plot: Option<String>,
}

/* =================== Entry point =================== */

impl Config {
    pub fn run(&self) -> Result<(), CmdError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_to(&mut out)
    }

    pub fn run_to<W: Write>(&self, out: &mut W) -> Result<(), CmdError> {
        match &self.action {
            Action::Generate(g) => self.run_generate(g, out),
            Action::Fit(f) => self.run_fit(f, out),
            Action::Predict(p) => self.run_predict(p, out),
            Action::Demo(d) => self.run_demo(d, out),
        }
    }
}

/* =================== Actions =================== */

impl Config {
    fn run_generate<W: Write>(&self, g: &Generate, out: &mut W) -> Result<(), CmdError> {
        let cfg = &g.generator;
        let data = generate(cfg.n_samples, cfg.n_features, cfg.noise_level, cfg.seed)?;
        log::info!(
            "generated {} samples with {} features (seed {})",
            cfg.n_samples,
            cfg.n_features,
            cfg.seed
        );
        log::debug!(
            "true intercept {}, coefficients {:?}",
            data.true_intercept,
            data.true_coefficients
        );

        match &g.output {
            Some(path) => {
                let file = File::create(path)?;
                write_synthetic(&data, BufWriter::new(file))?;
                log::info!("wrote {}", path.display());
            },
            None => write_synthetic(&data, out)?,
        }
        Ok(())
    }

    fn run_fit<W: Write>(&self, f: &Fit, out: &mut W) -> Result<(), CmdError> {
        let table = read_table(&f.input)?;
        let (x, y, names) = table.split_target(f.target.as_deref())?;

        let mut model = LinearRegression::new();
        let results = model.fit(&x, &y)?;
        log::info!("{}", results);

        let t_tests = if f.tests {
            match coefficient_tests(&x, &results) {
                Ok(t) => Some(t),
                Err(e) => {
                    log::warn!("skipping coefficient tests: {e}");
                    None
                },
            }
        } else {
            None
        };

        if let Some(path) = &f.plot {
            match render(&x, &y, &results) {
                Ok(uri) => {
                    fs::write(path, uri)?;
                    log::info!("wrote diagnostics plot to {}", path.display());
                },
                Err(e) => log::warn!("{e}"),
            }
        }

        let report =
            FitReport { results: &results, feature_names: &names, coefficient_tests: t_tests };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        Ok(())
    }

    fn run_predict<W: Write>(&self, p: &Predict, out: &mut W) -> Result<(), CmdError> {
        let train = read_table(&p.input)?;
        let (x, y, names) = train.split_target(p.target.as_deref())?;

        let mut model = LinearRegression::new();
        let results = model.fit(&x, &y)?;
        log::info!("{}", results);

        let new_x = read_table(&p.new)?.features(&names)?;
        let predictions = model.predict(&new_x)?;

        let report = PredictReport { feature_names: &names, predictions };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        Ok(())
    }

    fn run_demo<W: Write>(&self, d: &Demo, out: &mut W) -> Result<(), CmdError> {
        let cfg = &d.generator;
        let data = generate(cfg.n_samples, cfg.n_features, cfg.noise_level, cfg.seed)?;
        let results = LinearRegression::new().fit(&data.x, &data.y)?;
        log::info!("{}", results);

        // a failed plot still returns the fit
        let plot = if d.plot {
            render(&data.x, &data.y, &results)
                .map_err(|e| log::warn!("{e}"))
                .ok()
        } else {
            None
        };

        let report = DemoReport {
            results: &results,
            true_intercept: data.true_intercept,
            true_coefficients: &data.true_coefficients,
            plot,
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        Ok(())
    }
}

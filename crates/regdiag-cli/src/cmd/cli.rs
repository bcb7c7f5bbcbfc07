use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::cmd::config::{Action, Config, Demo, Fit, Generate, Predict};
use regdiag_core::generator::{
    GeneratorConfig, DEFAULT_FEATURES, DEFAULT_NOISE, DEFAULT_SAMPLES, DEFAULT_SEED,
};

#[derive(Debug, Parser)]
#[command(
    name = "regdiag",
    about = "Multiple linear regression with fit diagnostics",
    version,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a synthetic regression data set as CSV
    Generate(GenerateArgs),

    /// Fit a model to a CSV file and print the result as JSON
    Fit(FitArgs),

    /// Fit on one CSV file and predict the rows of another
    Predict(PredictArgs),

    /// Generate, fit and plot in one go
    Demo(DemoArgs),
}

/* --------------------- generator --------------------- */

#[derive(Debug, Args)]
pub struct GeneratorArgs {
    /// Number of samples
    #[arg(long = "samples", default_value_t = DEFAULT_SAMPLES)]
    pub n_samples: usize,

    /// Number of features
    #[arg(long = "features", default_value_t = DEFAULT_FEATURES)]
    pub n_features: usize,

    /// Standard deviation of the noise added to y
    #[arg(long = "noise", default_value_t = DEFAULT_NOISE)]
    pub noise_level: f64,

    /// Random seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

impl From<GeneratorArgs> for GeneratorConfig {
    fn from(a: GeneratorArgs) -> Self {
        GeneratorConfig::new(a.n_samples, a.n_features, a.noise_level, a.seed)
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub generator: GeneratorArgs,

    /// Output CSV file, stdout if missing
    #[arg(short = 'o', long = "output", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

/* ------------------------ fit ------------------------ */

#[derive(Debug, Args)]
pub struct FitArgs {
    /// CSV file with a header row
    #[arg(short = 'i', long = "input", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Target column, defaults to the last column
    #[arg(short = 't', long = "target")]
    pub target: Option<String>,

    /// Write the diagnostics plot as a data URI to this file
    #[arg(long = "plot", value_hint = ValueHint::FilePath)]
    pub plot: Option<PathBuf>,

    /// Include coefficient t tests in the output
    #[arg(long = "tests")]
    pub tests: bool,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// Training CSV file
    #[arg(short = 'i', long = "input", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// CSV file with the rows to predict, matched by column name
    #[arg(short = 'n', long = "new", value_hint = ValueHint::FilePath)]
    pub new: PathBuf,

    /// Target column of the training file, defaults to the last column
    #[arg(short = 't', long = "target")]
    pub target: Option<String>,
}

/* ------------------------ demo ------------------------ */

#[derive(Debug, Args)]
pub struct DemoArgs {
    #[command(flatten)]
    pub generator: GeneratorArgs,

    /// Skip rendering the diagnostics plot
    #[arg(long = "no-plot")]
    pub no_plot: bool,
}

// -------- Map CLI -> Config/Action --------

impl Cli {
    pub fn into_config(self) -> Config {
        let action = match self.command {
            Commands::Generate(args) => {
                Action::Generate(Generate { generator: args.generator.into(), output: args.output })
            },
            Commands::Fit(args) => Action::Fit(Fit {
                input: args.input,
                target: args.target,
                plot: args.plot,
                tests: args.tests,
            }),
            Commands::Predict(args) => {
                Action::Predict(Predict { input: args.input, new: args.new, target: args.target })
            },
            Commands::Demo(args) => {
                Action::Demo(Demo { generator: args.generator.into(), plot: !args.no_plot })
            },
        };
        Config { verbosity: self.verbose, action }
    }
}

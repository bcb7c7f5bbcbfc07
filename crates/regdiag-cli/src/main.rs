mod cmd;
mod table_io;

use crate::cmd::cli::Cli;
use crate::cmd::config::Config;

use clap::Parser;
use std::process;

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cfg: Config = Cli::parse().into_config();
    init_logging(cfg.verbosity);
    log::debug!("{:?}", cfg.action);
    if let Err(e) = cfg.run() {
        eprintln!("{e}");
        process::exit(1);
    }
}

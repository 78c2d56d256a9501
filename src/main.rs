// src/main.rs
use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use birdclassr::cli::{self, Cli};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp_millis()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !cli::run(cli)? {
        std::process::exit(1);
    }
    Ok(())
}

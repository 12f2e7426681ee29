//! Main entry point for the apkdelta CLI application.
//!
//! Estimates, for an old and a new APK, the size of update patches under
//! every combination of delta strategy and compression.

use anyhow::{Context, Result};
use clap::Parser;

use apkdelta::report::{render_csv, render_table};
use apkdelta::{Cli, CompressionRegistry, Estimator, StrategyRegistry, SystemTools};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let config = cli.config();
    config.validate()?;

    let strategies = StrategyRegistry::standard();
    let compressions = CompressionRegistry::standard();

    // Resolve every binary before the first strategy runs.
    let needed = Estimator::required_tools(&strategies, &compressions, &config)?;
    let tools = SystemTools::resolve(&cli.tool_paths(), &needed)
        .context("external tools are missing")?;

    let matrix = Estimator::new(&strategies, &compressions, &tools)
        .run(&config)
        .await?;

    if cli.csv {
        print!("{}", render_csv(&matrix));
    } else {
        print!("{}", render_table(&matrix));
    }

    Ok(())
}

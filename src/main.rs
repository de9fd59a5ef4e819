use std::path::Path;

use anyhow::Result;
use clap::Parser;
use gitauthors::cli::{setup, Cli, Commands};
use gitauthors::commands::{handle_analyze, init_config};
use gitauthors::progress::{ProgressConfig, ProgressManager};

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup::init_logging(cli.verbose);
    let progress = ProgressManager::new(ProgressConfig::from_env(cli.quiet, cli.verbose));

    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args, &progress),
        Commands::Init { force } => init_config(Path::new("."), force),
    }
}

// LAZYBENCH -- CONFIGURATION-MATRIX BENCHMARK DRIVER
// COMPILES, RUNS AND VERIFIES EVERY VALID VARIANT OF A BENCHMARK SUITE,
// THEN COMPARES THE RESULTS AGAINST A BASELINE
//
// run      EXECUTE THE MATRIX, APPEND ONE CSV ROW PER ATTEMPT
// analyze  BASELINE-RELATIVE COMPARISON TABLE FROM A RESULT FILE
// configs  LIST THE VALID CONFIGURATIONS OF A FAMILY

mod cli;

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::{Parser, Subcommand};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "lazybench")]
#[command(about = "LAZYBENCH -- CONFIGURATION-MATRIX BENCHMARK DRIVER")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    // COMPILE + EXECUTE + VERIFY
    Run(cli::run::RunArgs),
    // COMPARISON TABLE
    Analyze(cli::analyze::AnalyzeArgs),
    // VALID CONFIGURATIONS AND SUFFIXES
    Configs(cli::configs::ConfigsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    ctrlc::set_handler(move || {
        SHUTDOWN.store(true, Ordering::Relaxed);
    })?;

    match cli.command {
        Command::Run(args) => cli::run::run_matrix(args, &SHUTDOWN),
        Command::Analyze(args) => cli::analyze::run_analyze(args),
        Command::Configs(args) => cli::configs::run_configs(args),
    }
}

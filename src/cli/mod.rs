pub mod analyze;
pub mod configs;
pub mod run;

use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Args;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use lazybench::matrix::{Axes, Lowering, Scheduler, Toggle};

// CONFIGURATION AXES SHARED BY run AND configs
#[derive(Args, Debug, Clone)]
pub struct AxisArgs {
    // LOWERINGS: serial, lazyd2, nopoll, sigusr, uipi, lazyd0, tapir, OR all
    #[arg(long, value_delimiter = ',', default_value = "tapir")]
    pub parallel_framework: Vec<String>,

    // SCHEDULERS: PBBS, PRC, PRL, PRCPRL, DELEGATEPRC, DELEGATEPRCPRL, OPENCILKDEFAULT_FINE, OR all
    #[arg(long, value_delimiter = ',', default_value = "PBBS")]
    pub schedule_tasks: Vec<String>,

    // FINE GRAIN SIZE: true | false | both
    #[arg(long, default_value = "false")]
    pub fg: Toggle,

    // IGNORE USER GRAIN SIZE: true | false | both
    #[arg(long, default_value = "false")]
    pub noopt: Toggle,
}

fn expand<T>(values: &[String], all: &[T]) -> Result<Vec<T>>
where
    T: FromStr + Copy + PartialEq,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let mut out: Vec<T> = Vec::new();
    for v in values {
        if v.trim().eq_ignore_ascii_case("all") {
            return Ok(all.to_vec());
        }
        let parsed = v.parse::<T>()?;
        if !out.contains(&parsed) {
            out.push(parsed);
        }
    }
    Ok(out)
}

impl AxisArgs {
    pub fn axes(&self) -> Result<Axes> {
        Ok(Axes {
            schedulers: expand(&self.schedule_tasks, &Scheduler::ALL)?,
            noopt: self.noopt,
            fine_grain: self.fg,
            lowerings: expand(&self.parallel_framework, &Lowering::ALL)?,
        })
    }
}

// LOG FILE: EVERYTHING AT DEBUG. NO FILE: WARNINGS TO STDERR. RUST_LOG OVERRIDES BOTH.
pub fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let default = if log_file.is_some() { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true)
                        .with_filter(filter),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_filter(filter))
                .init();
        }
    }
    Ok(())
}

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use lazybench::matrix::LabelMap;
use lazybench::report::{ColumnFilter, Format, Mode, ReportOptions, Table};
use lazybench::results::{load_results, LoadedResults};
use lazybench::tuning::{DEFAULT_BASELINE, ICACHE_SLOTS};

use super::init_logging;

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    // RESULT FILE WRITTEN BY `lazybench run`
    #[arg(long)]
    pub ifile: PathBuf,

    // COMPARE ICACHE MISS RATES INSTEAD OF TIME
    #[arg(long)]
    pub icache: bool,

    // LATEX TABLE BODY INSTEAD OF CSV
    #[arg(long)]
    pub tex: bool,

    #[arg(long, default_value = DEFAULT_BASELINE)]
    pub baseline: String,

    // TIMINGS AVERAGED PER CELL (DEFAULT: EVERY TIME COLUMN IN THE HEADER)
    #[arg(long)]
    pub samples: Option<usize>,

    // ONLY THESE IMPLEMENTATION COLUMNS
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    // DROP LABELS WITHOUT A CURATED NAME
    #[arg(long)]
    pub curated_only: bool,

    // KEEP EVERY LABEL EVEN WITH --tex
    #[arg(long, conflicts_with = "curated_only")]
    pub all_columns: bool,

    // WRITE THE TABLE HERE INSTEAD OF STDOUT
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl AnalyzeArgs {
    fn filter(&self) -> ColumnFilter {
        if !self.only.is_empty() {
            ColumnFilter::Allowlist(self.only.iter().cloned().collect::<BTreeSet<_>>())
        } else if self.curated_only || (self.tex && !self.all_columns) {
            ColumnFilter::CuratedOnly
        } else {
            ColumnFilter::All
        }
    }

    // ICACHE PAIR FOLLOWS THE TIME COLUMNS; WITHOUT A HEADER ASSUME IT IS LAST
    fn mode(&self, loaded: &LoadedResults) -> Mode {
        if !self.icache {
            return Mode::Percent;
        }
        let misses = if loaded.timing_columns > 0 {
            loaded.timing_columns
        } else {
            loaded.sample_width.saturating_sub(ICACHE_SLOTS)
        };
        Mode::Cache { misses }
    }
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    init_logging(None)?;

    let labels = LabelMap::standard();
    let loaded = load_results(&args.ifile, &labels)
        .with_context(|| format!("reading {}", args.ifile.display()))?;
    debug!(
        "LOADED {} LABELS, {} TIME COLUMNS, {} SAMPLE CELLS",
        loaded.labels.len(),
        loaded.timing_columns,
        loaded.sample_width
    );

    let opts = ReportOptions {
        baseline: args.baseline.clone(),
        samples: args.samples.unwrap_or(loaded.timing_columns),
        mode: args.mode(&loaded),
        filter: args.filter(),
        format: if args.tex { Format::Tex } else { Format::Csv },
    };
    let table = Table::build(&loaded.store, &labels, &opts)?;
    let text = table.render();

    match &args.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", text),
    }
    Ok(())
}

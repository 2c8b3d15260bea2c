use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use lazybench::admission::{AdmissionGate, SystemLoad};
use lazybench::catalog;
use lazybench::controller::{Controller, RunPlan};
use lazybench::family::RunOptions;
use lazybench::matrix::LabelMap;
use lazybench::process::SystemShell;
use lazybench::report::{ColumnFilter, Format, Mode, ReportOptions, Table};
use lazybench::results::{LoadedResults, ResultWriter};
use lazybench::tuning::{core_sweep, DEFAULT_BASELINE, DEFAULT_LOAD_THRESHOLD};

use super::{init_logging, AxisArgs};

const RESULTS_FILE: &str = "lazybenchmark_results.csv";
const LOG_FILE: &str = "log.txt";

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    // BENCHMARK DESCRIPTOR
    #[arg(long, default_value = "lazybenchmark.csv")]
    pub ifile: PathBuf,

    // CORE COUNTS (COMMA LIST). DEFAULT: 1, 8, 16, ... UP TO THE ONLINE CPU COUNT
    #[arg(long, value_delimiter = ',')]
    pub num_cores: Vec<usize>,

    // TIMED REPETITIONS PER RUN
    #[arg(long, default_value_t = 1)]
    pub num_tests: usize,

    // COMPILE ONLY
    #[arg(long, conflicts_with = "execute")]
    pub compile: bool,

    // EXECUTE ONLY (BINARIES ALREADY BUILT)
    #[arg(long)]
    pub execute: bool,

    #[arg(long)]
    pub disable_numa: bool,

    // SAMPLE ICACHE MISSES / HITS WITH perf stat
    #[arg(long)]
    pub icache: bool,

    // COLLECT SCHEDULER PROMOTION COUNTERS
    #[arg(long)]
    pub promoted_tasks: bool,

    // SMALL DATASETS INSTEAD OF STANDARD ONES
    #[arg(long)]
    pub small: bool,

    #[command(flatten)]
    pub axes: AxisArgs,

    // 1-MINUTE LOAD AVERAGE AT OR BELOW WHICH AN ATTEMPT MAY START
    #[arg(long, default_value_t = DEFAULT_LOAD_THRESHOLD)]
    pub load_threshold: f64,

    // SECONDS TO WAIT FOR THE LOAD TO DROP BEFORE RUNNING ANYWAY (DEFAULT: FOREVER)
    #[arg(long)]
    pub max_admission_wait: Option<u64>,

    // DEFAULT: oDir/lazybenchmark_output_files_<YYYYmmdd-HHMMSS>
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    // ROOT HOLDING THE cilk5 / pbbs / pbbs_v2 TREES
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    // LD_LIBRARY_PATH FOR EVERY RUN
    #[arg(long)]
    pub lib_path: Option<String>,

    // PRINT A COMPARISON TABLE FROM THIS RUN'S RESULTS WHEN DONE
    #[arg(long)]
    pub report: bool,
}

fn online_cpus() -> usize {
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if n > 0 {
        n as usize
    } else {
        1
    }
}

fn default_output_dir() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from("oDir").join(format!("lazybenchmark_output_files_{}", stamp))
}

pub fn run_matrix(args: RunArgs, shutdown: &'static AtomicBool) -> Result<()> {
    let output_dir = args.output_dir.clone().unwrap_or_else(default_output_dir);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;
    init_logging(Some(&output_dir.join(LOG_FILE)))?;

    let benchmarks = catalog::load(&args.ifile)
        .with_context(|| format!("loading {}", args.ifile.display()))?;
    let axes = args.axes.axes()?;
    let cores = core_sweep(&args.num_cores, online_cpus());

    let plan = RunPlan {
        axes,
        cores,
        small: args.small,
        compile_only: args.compile,
        execute_only: args.execute,
        options: RunOptions {
            workdir: args.workdir.clone(),
            num_tests: args.num_tests,
            disable_numa: args.disable_numa,
            icache: args.icache,
            promoted: args.promoted_tasks,
            lib_path: args.lib_path.clone(),
        },
    };
    let layout = plan.options.layout();

    println!("LAZYBENCH");
    println!("BENCHMARKS:      {} (from {})", benchmarks.len(), args.ifile.display());
    println!("CORES:           {:?}", plan.cores);
    println!("SCHEDULERS:      {:?}", plan.axes.schedulers);
    println!("LOWERINGS:       {:?}", plan.axes.lowerings);
    println!("SAMPLES/ROW:     {}", layout.width());
    println!("OUTPUT:          {}", output_dir.display());
    println!();
    info!("PLAN: {:?}", plan);

    let results_path = output_dir.join(RESULTS_FILE);
    let mut writer = ResultWriter::append(&results_path, &layout)
        .with_context(|| format!("opening {}", results_path.display()))?;
    let mut results = LoadedResults::default();
    let labels = LabelMap::standard();
    let wait_ceiling = args.max_admission_wait.map(Duration::from_secs);
    let gate = AdmissionGate::new(args.load_threshold, wait_ceiling);

    let shell = SystemShell::interruptible(shutdown);
    let mut controller = Controller::new(shell, SystemLoad, gate, &labels, shutdown);
    let summary = controller.run(&benchmarks, &plan, &mut writer, &mut results)?;

    println!();
    if summary.cancelled {
        println!("INTERRUPTED -- PARTIAL RESULTS KEPT");
    }
    println!(
        "ROWS: {}  CORRECT: {}  INCORRECT: {}  TIMEOUT: {}  \
         COMPILE FAILURES: {}  SKIPPED DATASETS: {}",
        summary.rows,
        summary.correct,
        summary.incorrect,
        summary.timeouts,
        summary.compile_failures,
        summary.skipped_datasets,
    );
    println!("RESULTS: {}", results_path.display());

    if args.report && results.store.contains_label(DEFAULT_BASELINE) {
        let opts = ReportOptions {
            baseline: DEFAULT_BASELINE.to_string(),
            samples: args.num_tests,
            mode: Mode::Percent,
            filter: ColumnFilter::All,
            format: Format::Csv,
        };
        let table = Table::build(&results.store, &labels, &opts)?;
        println!();
        print!("{}", table.render());
    }
    Ok(())
}

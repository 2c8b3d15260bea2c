// LAZYBENCH CONTROLLER TUNABLES
// PURE-RUST MODULE: NO PROCESS OR FILESYSTEM ACCESS
// SHARED BETWEEN BINARY CRATE (cli/*) AND LIB CRATE (controller, tests)

use std::time::Duration;

// PROCESS TIMEOUTS
// ONE WALL-CLOCK BUDGET PER EXTERNAL COMMAND. PAST IT THE PROCESS GROUP IS KILLED.

pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(6 * 60);
pub const RUN_TIMEOUT: Duration = Duration::from_secs(6 * 60);
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(6 * 60);
pub const MATERIALIZE_TIMEOUT: Duration = Duration::from_secs(6 * 60);

// CHILD REAPING
pub const CHILD_POLL: Duration = Duration::from_millis(20);
// PIPE DRAIN AFTER THE GROUP IS GONE
pub const DRAIN_GRACE: Duration = Duration::from_secs(1);

// ADMISSION CONTROL (1-MINUTE LOAD AVERAGE)
// BACKOFF DOUBLES FROM MIN TO MAX BETWEEN POLLS. NEVER SPINS.

pub const DEFAULT_LOAD_THRESHOLD: f64 = 10.0;
pub const ADMISSION_POLL_MIN: Duration = Duration::from_millis(250);
pub const ADMISSION_POLL_MAX: Duration = Duration::from_secs(8);
pub const ADMISSION_LOG_EVERY: u32 = 16; // POLLS BETWEEN "STILL WAITING" LINES

// GRAIN SIZES (PFOR_MAXGRAINSIZE COLUMN)
pub const FINE_GRAINSIZE: u32 = 8;
pub const DEFAULT_GRAINSIZE: u32 = 2048;

// EXTRA SAMPLE SLOTS
pub const ICACHE_SLOTS: usize = 2;    // MISSES, HITS
pub const PROMOTED_SLOTS: usize = 3;  // PUSH SUCCESS, WORK SIZE, TOTAL TASKS

// RESULT FILE LAYOUT
// COLUMNS BEFORE THE FIRST SAMPLE CELL. ERROR MSG IS ALWAYS THE LAST CELL.

pub const BASE_COLUMNS: [&str; 10] = [
    "BENCHMARK",
    "COMPILES",
    "DATASET",
    "NUM CORES",
    "STATUS",
    "DISABLE_NUMA",
    "PARALLEL_FRAMEWORK",
    "TASK_SCHEDULER",
    "PFOR_MAXGRAINSIZE",
    "IGNORE_USERS_PFORGRAINSIZE",
];
pub const TIME_COLUMN: &str = "TIME(sec)";
pub const ICACHE_COLUMNS: [&str; ICACHE_SLOTS] = ["ICACHE_MISSES", "ICACHE_HITS"];
pub const PROMOTED_COLUMNS: [&str; PROMOTED_SLOTS] = ["PUSH_WORKCTX", "WORK_SIZE", "TOTAL_TASKS"];
pub const ERROR_COLUMN: &str = "ERROR MSG";

pub const NOT_AVAILABLE: &str = "N/A";
pub const UNAVAILABLE_SAMPLE: f64 = -1.0;

// ERROR MESSAGES WRITTEN TO THE ERROR MSG CELL
pub const MSG_RUN_FAILED: &str = "Benchmark failed to run correctly";
pub const MSG_VERIFY_FAILED: &str = "Verification failed";
pub const MSG_COMPILE_FAILED: &str = "Compilation failed";
pub const MSG_NOT_COMPILED: &str = "run without compiling benchmark";

// DEFAULT CORE SWEEP STEP: [1, 8, 16, ..., MAX]
pub const CORE_STEP: usize = 8;

// COMPARISON REPORT
pub const DEFAULT_BASELINE: &str = "OpenCilk";
pub const DEFAULT_PRECISION: usize = 2;
pub const CACHE_PRECISION: usize = 5;

// DEFAULT CORE SWEEP. EXPLICIT LIST WINS WHEN IT PARSES TO ANYTHING.
pub fn core_sweep(requested: &[usize], max_cores: usize) -> Vec<usize> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    let mut cores = vec![1];
    let mut n = CORE_STEP;
    while n <= max_cores {
        cores.push(n);
        n += CORE_STEP;
    }
    if cores.last().copied().unwrap_or(1) < max_cores {
        cores.push(max_cores);
    }
    cores
}

// EXPONENTIAL BACKOFF BETWEEN LOAD POLLS, CLAMPED TO [MIN, MAX]
pub fn next_backoff(current: Duration, min: Duration, max: Duration) -> Duration {
    current.max(min).saturating_mul(2).min(max)
}

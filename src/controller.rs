// LAZYBENCH EXECUTION CONTROLLER
// SEQUENTIAL WALK: BENCHMARK -> (COMPILE EVERY VALID CONFIG) -> DATASET -> CONFIG -> CORES
//
// ONE ATTEMPT AT A TIME. EACH ATTEMPT: ADMISSION -> RUN -> CLASSIFY -> VERIFY.
// EVERY ATTEMPT EMITS EXACTLY ONE ROW, WRITTEN AND RECORDED BEFORE THE NEXT STARTS.
// A TIMEOUT ABORTS THE REMAINING CORE COUNTS OF ITS (BENCHMARK, DATASET, CONFIG).
// A COMPILE FAILURE ABORTS THE WHOLE BENCHMARK.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::admission::{AdmissionGate, LoadProbe};
use crate::catalog::Benchmark;
use crate::error::Result;
use crate::family::RunOptions;
use crate::matrix::{generate, Axes, Configuration, LabelMap};
use crate::process::{ProcessOutcome, Shell, ShellCommand};
use crate::results::{LoadedResults, ResultRow, ResultWriter, RunStatus};
use crate::samples::{self, FailureMarkers};
use crate::tuning::{
    COMPILE_TIMEOUT, MATERIALIZE_TIMEOUT, MSG_COMPILE_FAILED, MSG_NOT_COMPILED, MSG_RUN_FAILED,
    MSG_VERIFY_FAILED, RUN_TIMEOUT, VERIFY_TIMEOUT,
};

const FAILURE_TARGET: &str = "lazybench::failures";

// WHAT TO DO WITH THE BENCHMARKS OF ONE INVOCATION
#[derive(Clone, Debug)]
pub struct RunPlan {
    pub axes: Axes,
    pub cores: Vec<usize>,
    pub small: bool,
    pub compile_only: bool,
    pub execute_only: bool,
    pub options: RunOptions,
}

// FINAL STATE OF ONE RUN ATTEMPT
#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    Correct(Vec<Option<f64>>),
    Incorrect(&'static str),
    Timeout,
}

impl AttemptOutcome {
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Correct(_) => RunStatus::Correct,
            Self::Incorrect(_) => RunStatus::Incorrect,
            Self::Timeout => RunStatus::Timeout,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub rows: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub timeouts: usize,
    pub compile_failures: usize,
    pub skipped_datasets: usize,
    pub cancelled: bool,
}

enum CompileResult {
    Built,
    Failed(&'static str),
    Interrupted,
}

// ---------------------------------------------------------------------------
// CONTROLLER
// ---------------------------------------------------------------------------

pub struct Controller<'a, S: Shell, P: LoadProbe> {
    shell: S,
    probe: P,
    gate: AdmissionGate,
    markers: FailureMarkers,
    labels: &'a LabelMap,
    shutdown: &'a AtomicBool,
}

impl<'a, S: Shell, P: LoadProbe> Controller<'a, S, P> {
    pub fn new(
        shell: S,
        probe: P,
        gate: AdmissionGate,
        labels: &'a LabelMap,
        shutdown: &'a AtomicBool,
    ) -> Self {
        Self {
            shell,
            probe,
            gate,
            markers: FailureMarkers::new(),
            labels,
            shutdown,
        }
    }

    pub fn into_parts(self) -> (S, P) {
        (self.shell, self.probe)
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    // SPAWN FAILURES ARE LOGGED AND TREATED AS A FAILED STEP
    fn exec(
        &mut self,
        cmd: &ShellCommand,
        timeout: std::time::Duration,
    ) -> Option<ProcessOutcome> {
        debug!("EXEC: {}", cmd.display());
        match self.shell.run(cmd, timeout) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn log_failure(&self, what: &str, cmd: &ShellCommand, outcome: Option<&ProcessOutcome>) {
        match outcome {
            Some(ProcessOutcome::Exited { code, stdout, stderr }) => {
                warn!(
                    target: FAILURE_TARGET,
                    "{} FAILED (exit {:?}): {}",
                    what,
                    code,
                    cmd.display()
                );
                if !stdout.is_empty() {
                    warn!(target: FAILURE_TARGET, "STDOUT:\n{}", stdout);
                }
                if !stderr.is_empty() {
                    warn!(target: FAILURE_TARGET, "STDERR:\n{}", stderr);
                }
            }
            Some(ProcessOutcome::TimedOut) => {
                warn!(target: FAILURE_TARGET, "{} TIMED OUT: {}", what, cmd.display());
            }
            Some(ProcessOutcome::Interrupted) => {
                warn!(target: FAILURE_TARGET, "{} INTERRUPTED: {}", what, cmd.display());
            }
            None => {
                warn!(target: FAILURE_TARGET, "{} COULD NOT START: {}", what, cmd.display());
            }
        }
    }

    pub fn run<W: Write>(
        &mut self,
        benchmarks: &[Benchmark],
        plan: &RunPlan,
        writer: &mut ResultWriter<W>,
        results: &mut LoadedResults,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let labels = self.labels;
        let mut emit = |row: ResultRow, summary: &mut RunSummary| -> Result<()> {
            writer.write_row(&row)?;
            results.record(&row, labels);
            summary.rows += 1;
            match row.status {
                Some(RunStatus::Correct) => summary.correct += 1,
                Some(RunStatus::Incorrect) => summary.incorrect += 1,
                Some(RunStatus::Timeout) => summary.timeouts += 1,
                None => {}
            }
            Ok(())
        };
        let width = plan.options.layout().width();

        for bench in benchmarks {
            if self.stopping() {
                summary.cancelled = true;
                break;
            }
            let configs: Vec<Configuration> = generate(bench.family.validity(), &plan.axes)
                .into_iter()
                .map(|(cfg, _)| cfg)
                .collect();
            if configs.is_empty() {
                info!("NO VALID CONFIGURATION FOR {}", bench.identity());
                continue;
            }
            println!("BENCHMARK {} ({} CONFIGURATIONS)", bench.identity(), configs.len());

            // COMPILE PHASE
            let compile_msg = if plan.execute_only { MSG_NOT_COMPILED } else { "" };
            if !plan.execute_only {
                let mut failed = false;
                for cfg in &configs {
                    match self.compile(bench, cfg, &plan.options) {
                        CompileResult::Built => {}
                        CompileResult::Failed(msg) => {
                            let row = ResultRow::compile(bench, cfg, false, width, msg);
                            emit(row, &mut summary)?;
                            summary.compile_failures += 1;
                            failed = true;
                            break;
                        }
                        // NO ROW: THE BUILD NEVER FINISHED
                        CompileResult::Interrupted => {
                            failed = true;
                            break;
                        }
                    }
                    if plan.compile_only {
                        emit(ResultRow::compile(bench, cfg, true, width, ""), &mut summary)?;
                    }
                }
                if failed || plan.compile_only {
                    continue;
                }
            }

            // EXECUTION PHASE
            let mut attempted = vec![false; configs.len()];
            for dataset in bench.datasets(plan.small) {
                if self.stopping() {
                    break;
                }
                if !self.ensure_dataset(bench, dataset, &plan.options) {
                    if self.stopping() {
                        break;
                    }
                    summary.skipped_datasets += 1;
                    continue;
                }
                for (ci, cfg) in configs.iter().enumerate() {
                    for &cores in &plan.cores {
                        if self.stopping() {
                            break;
                        }
                        let outcome =
                            match self.attempt(bench, cfg, dataset, cores, &plan.options) {
                                Some(o) => o,
                                None => break,
                            };
                        attempted[ci] = true;
                        let status = outcome.status();
                        let (samples, error) = match outcome {
                            AttemptOutcome::Correct(cells) => (cells, ""),
                            AttemptOutcome::Incorrect(msg) => (vec![None; width], msg),
                            AttemptOutcome::Timeout => (vec![None; width], ""),
                        };
                        let row = ResultRow::attempt(
                            bench,
                            cfg,
                            dataset,
                            cores,
                            plan.options.disable_numa,
                            status,
                            samples,
                            error,
                        );
                        emit(row, &mut summary)?;
                        if status == RunStatus::Timeout {
                            warn!(
                                "TIMEOUT: {} {} {} AT {} CORES -- SKIPPING REMAINING CORE COUNTS",
                                bench.identity(),
                                dataset,
                                cfg.suffix(),
                                cores
                            );
                            break;
                        }
                    }
                }
            }

            // NOTHING RAN: KEEP A RECORD OF THE BENCHMARK AND ITS COMPILE STATE
            if !self.stopping() {
                for (cfg, ran) in configs.iter().zip(&attempted) {
                    if !ran {
                        let row = ResultRow::compile(bench, cfg, true, width, compile_msg);
                        emit(row, &mut summary)?;
                    }
                }
            }
        }

        if self.stopping() {
            summary.cancelled = true;
        }
        Ok(summary)
    }

    fn compile(
        &mut self,
        bench: &Benchmark,
        cfg: &Configuration,
        opts: &RunOptions,
    ) -> CompileResult {
        let cmd = bench.family.compile(bench, cfg, opts);
        info!("COMPILING {} [{}]", bench.identity(), cfg.suffix());
        let outcome = self.exec(&cmd, COMPILE_TIMEOUT);
        match &outcome {
            Some(ProcessOutcome::TimedOut) => {
                self.log_failure("COMPILE", &cmd, outcome.as_ref());
                CompileResult::Failed("")
            }
            Some(ProcessOutcome::Interrupted) => CompileResult::Interrupted,
            Some(o) if o.success() && !self.markers.compile_failed(&o.combined()) => {
                CompileResult::Built
            }
            _ => {
                self.log_failure("COMPILE", &cmd, outcome.as_ref());
                CompileResult::Failed(MSG_COMPILE_FAILED)
            }
        }
    }

    // FALSE: DATASET IS MISSING AND COULD NOT BE MADE
    fn ensure_dataset(&mut self, bench: &Benchmark, dataset: &str, opts: &RunOptions) -> bool {
        let path = match bench.family.dataset_path(bench, &opts.workdir, dataset) {
            Some(p) => p,
            None => return true,
        };
        if path.is_file() {
            return true;
        }
        let cmd = match bench.family.materialize(bench, dataset, opts) {
            Some(c) => c,
            None => return true,
        };
        info!("CREATING INPUT {}", path.display());
        let outcome = self.exec(&cmd, MATERIALIZE_TIMEOUT);
        if outcome.as_ref().is_some_and(ProcessOutcome::success) {
            return true;
        }
        if outcome == Some(ProcessOutcome::Interrupted) {
            return false;
        }
        self.log_failure("MATERIALIZE", &cmd, outcome.as_ref());
        warn!("FAILED TO CREATE INPUT {} -- SKIPPING DATASET", dataset);
        false
    }

    // None: CANCELLED DURING ADMISSION OR WHILE RUNNING, NO ROW
    pub fn attempt(
        &mut self,
        bench: &Benchmark,
        cfg: &Configuration,
        dataset: &str,
        cores: usize,
        opts: &RunOptions,
    ) -> Option<AttemptOutcome> {
        if !self.gate.wait(&mut self.probe, self.shutdown).may_run() {
            return None;
        }

        let cmd = bench.family.run(bench, cfg, cores, dataset, opts);
        info!("RUN {} {} [{}] {} CORES", bench.identity(), dataset, cfg.suffix(), cores);
        let outcome = self.exec(&cmd, RUN_TIMEOUT);
        let (stdout, stderr) = match &outcome {
            Some(ProcessOutcome::TimedOut) => {
                self.log_failure("RUN", &cmd, outcome.as_ref());
                return Some(AttemptOutcome::Timeout);
            }
            Some(ProcessOutcome::Interrupted) => return None,
            Some(ProcessOutcome::Exited { code: Some(0), stdout, stderr })
                if !self.markers.run_failed(stdout) && !self.markers.run_failed(stderr) =>
            {
                (stdout.as_str(), stderr.as_str())
            }
            _ => {
                self.log_failure("RUN", &cmd, outcome.as_ref());
                return Some(AttemptOutcome::Incorrect(MSG_RUN_FAILED));
            }
        };

        let layout = opts.layout();
        let parsed = match samples::parse(bench.family.timing_marker(), &layout, stdout, stderr) {
            Ok(p) => p,
            Err(e) => {
                warn!("{}", e);
                self.log_failure("PARSE", &cmd, outcome.as_ref());
                return Some(AttemptOutcome::Incorrect(MSG_RUN_FAILED));
            }
        };

        if let Some(check) = bench.family.verify(bench, cores, dataset, opts) {
            let verdict = self.exec(&check, VERIFY_TIMEOUT);
            if verdict == Some(ProcessOutcome::Interrupted) {
                return None;
            }
            if !verdict.as_ref().is_some_and(ProcessOutcome::success) {
                self.log_failure("VERIFY", &check, verdict.as_ref());
                return Some(AttemptOutcome::Incorrect(MSG_VERIFY_FAILED));
            }
        }
        Some(AttemptOutcome::Correct(parsed.cells(&layout)))
    }
}

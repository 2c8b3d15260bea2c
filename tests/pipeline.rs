// LAZYBENCH END-TO-END CONTROLLER TESTS
// SCRIPTED SHELL + IDLE LOAD PROBE, REAL CSV WRITER AND READER.
//
// NOTHING IS COMPILED OR EXECUTED: THE FAKE SHELL ANSWERS BY COMMAND SHAPE.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use lazybench::admission::{AdmissionGate, LoadProbe};
use lazybench::catalog::{Benchmark, Family};
use lazybench::controller::{Controller, RunPlan, RunSummary};
use lazybench::error::Result;
use lazybench::family::RunOptions;
use lazybench::matrix::{Axes, LabelMap, Lowering, Scheduler, Toggle};
use lazybench::process::{ProcessOutcome, Shell, ShellCommand};
use lazybench::results::{read_results, LoadedResults, ResultWriter};
use lazybench::store::CellKey;

struct FakeShell<F: FnMut(&ShellCommand) -> ProcessOutcome> {
    respond: F,
    seen: Vec<ShellCommand>,
}

impl<F: FnMut(&ShellCommand) -> ProcessOutcome> Shell for FakeShell<F> {
    fn run(&mut self, cmd: &ShellCommand, _timeout: Duration) -> Result<ProcessOutcome> {
        self.seen.push(cmd.clone());
        Ok((self.respond)(cmd))
    }
}

struct Idle;

impl LoadProbe for Idle {
    fn load(&mut self) -> Option<[f64; 3]> {
        Some([0.5, 0.5, 0.5])
    }
}

fn exited(code: i32, stdout: &str) -> ProcessOutcome {
    ProcessOutcome::Exited { code: Some(code), stdout: stdout.to_string(), stderr: String::new() }
}

fn is_run(cmd: &ShellCommand) -> bool {
    cmd.env_value("NAIVE_MAPPING").is_some()
}

fn is_verify(cmd: &ShellCommand) -> bool {
    cmd.line.starts_with("./sortCheck")
}

fn sort() -> Benchmark {
    Benchmark {
        family: Family::Pbbs,
        path: "comparisonSort/sampleSort".into(),
        binary: "sort".into(),
        check_binary: "sortCheck".into(),
        data_dir: "sequenceData".into(),
        small_inputs: vec![],
        standard_inputs: vec!["rand_10M".into()],
    }
}

// BASELINE + LAZYD0: THE TWO VALID CONFIGS OF A SIMPLE-FAMILY BENCHMARK
fn two_config_plan(workdir: &std::path::Path) -> RunPlan {
    RunPlan {
        axes: Axes {
            schedulers: vec![Scheduler::Pbbs],
            noopt: Toggle::Off,
            fine_grain: Toggle::Off,
            lowerings: vec![Lowering::OpenCilk, Lowering::LazyD0],
        },
        cores: vec![1, 8],
        small: false,
        compile_only: false,
        execute_only: false,
        options: RunOptions {
            workdir: workdir.to_path_buf(),
            num_tests: 1,
            ..RunOptions::default()
        },
    }
}

fn drive<F: FnMut(&ShellCommand) -> ProcessOutcome>(
    plan: &RunPlan,
    respond: F,
) -> (RunSummary, String, LoadedResults, Vec<ShellCommand>) {
    let labels = LabelMap::standard();
    let stop = AtomicBool::new(false);
    let layout = plan.options.layout();
    let mut writer = ResultWriter::new(Vec::new(), &layout);
    writer.write_header(&layout).unwrap();
    let mut results = LoadedResults::default();

    let shell = FakeShell { respond, seen: vec![] };
    let mut ctl = Controller::new(shell, Idle, AdmissionGate::default(), &labels, &stop);
    let summary = ctl.run(&[sort()], plan, &mut writer, &mut results).unwrap();
    let (shell, _) = ctl.into_parts();
    let csv = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    (summary, csv, results, shell.seen)
}

fn data_rows(csv: &str) -> Vec<Vec<String>> {
    csv.lines()
        .skip(1)
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect()
}

// === ORDERING ===

#[test]
fn four_rows_in_config_then_core_order() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let (summary, csv, _, _) = drive(&plan, |cmd| {
        if is_run(cmd) {
            exited(0, "PBBS-time: 2.0\n")
        } else {
            exited(0, "")
        }
    });

    assert_eq!(summary.rows, 4);
    assert_eq!(summary.correct, 4);
    let rows = data_rows(&csv);
    let order: Vec<(String, String)> = rows.iter().map(|r| (r[6].clone(), r[3].clone())).collect();
    assert_eq!(
        order,
        vec![
            ("OpenCilk".to_string(), "1".to_string()),
            ("OpenCilk".to_string(), "8".to_string()),
            ("LazyD with InFrequent Polling".to_string(), "1".to_string()),
            ("LazyD with InFrequent Polling".to_string(), "8".to_string()),
        ]
    );
    for r in &rows {
        assert_eq!(r.len(), 12);
        assert_eq!(r[0], "comparisonSort/sampleSort/sort");
        assert_eq!(r[4], "Correct");
        assert_eq!(r[10], "2");
    }
}

#[test]
fn promoted_counters_fill_their_own_cells() {
    let dir = tempfile::tempdir().unwrap();
    let mut plan = two_config_plan(dir.path());
    plan.options.promoted = true;
    let (summary, csv, results, _) = drive(&plan, |cmd| {
        if is_run(cmd) {
            exited(
                0,
                "PBBS-time: 2.0\n\
                 -1,number of success push_workctx,12\n\
                 -1,work size,4096\n\
                 -1,number of total tasks,900\n",
            )
        } else {
            exited(0, "")
        }
    });

    assert_eq!(summary.correct, 4);
    let header: Vec<&str> = csv.lines().next().unwrap().split(',').collect();
    assert_eq!(header.len(), 15);
    assert_eq!(&header[11..14], &["PUSH_WORKCTX", "WORK_SIZE", "TOTAL_TASKS"]);
    for r in data_rows(&csv) {
        assert_eq!(r.len(), 15);
        assert_eq!(r[10], "2");
        assert_eq!(&r[11..14], &["12", "4096", "900"]);
        assert_eq!(r[14], "");
    }
    assert_eq!(results.sample_width, 4);
}

#[test]
fn every_config_compiles_before_any_run() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let (_, _, _, seen) = drive(&plan, |cmd| {
        if is_run(cmd) {
            exited(0, "PBBS-time: 2.0\n")
        } else {
            exited(0, "")
        }
    });
    assert!(seen[0].line.starts_with("make clean && TAPIR=1 GCILK11=1 make &&"));
    assert!(seen[1].line.contains("make ULI=1"));
    // MISSING INPUT IS MATERIALIZED ONCE BEFORE THE FIRST RUN
    assert_eq!(seen[2].line, "make rand_10M");
    assert!(is_run(&seen[3]));
    assert_eq!(seen[3].env_value("CILK_NWORKERS"), Some("1"));
    assert!(is_verify(&seen[4]));
}

// === FAILURE CLASSIFICATION ===

#[test]
fn timeout_row_and_remaining_cores_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let (summary, csv, _, _) = drive(&plan, |cmd| {
        if is_run(cmd) && cmd.line.contains(".Buco") {
            ProcessOutcome::TimedOut
        } else if is_run(cmd) {
            exited(0, "PBBS-time: 2.0\n")
        } else {
            exited(0, "")
        }
    });

    // BASELINE TIMES OUT AT 1 CORE, ITS 8-CORE ATTEMPT NEVER HAPPENS
    assert_eq!(summary.timeouts, 1);
    assert_eq!(summary.rows, 3);
    let rows = data_rows(&csv);
    assert_eq!(rows[0][4], "Timeout");
    assert_eq!(rows[0][10], "N/A");
    assert_eq!(rows[0][11], "");
    assert_eq!(rows[1][6], "LazyD with InFrequent Polling");
}

#[test]
fn verification_failure_discards_samples() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let (summary, csv, results, _) = drive(&plan, |cmd| {
        if is_run(cmd) {
            exited(0, "PBBS-time: 2.0\n")
        } else if is_verify(cmd) {
            exited(1, "mismatch at 17\n")
        } else {
            exited(0, "")
        }
    });

    assert_eq!(summary.incorrect, 4);
    for r in data_rows(&csv) {
        assert_eq!(r[4], "Incorrect");
        assert_eq!(r[10], "N/A");
        assert_eq!(r[11], "Verification failed");
    }
    let key = CellKey::new("sampleSort-sort", "rand-10M", "1");
    assert_eq!(results.store.get("OpenCilk", &key), Some(&[-1.0][..]));
}

#[test]
fn run_failure_does_not_abort_sibling_cores() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let (summary, csv, _, _) = drive(&plan, |cmd| {
        if is_run(cmd) && cmd.env_value("CILK_NWORKERS") == Some("1") {
            exited(134, "terminate called after throwing\n")
        } else if is_run(cmd) {
            exited(0, "PBBS-time: 2.0\n")
        } else {
            exited(0, "")
        }
    });
    assert_eq!(summary.rows, 4);
    assert_eq!(summary.incorrect, 2);
    let rows = data_rows(&csv);
    assert_eq!(rows[0][11], "Benchmark failed to run correctly");
    assert_eq!(rows[1][4], "Correct");
}

#[test]
fn compile_failure_skips_benchmark() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let (summary, csv, results, seen) = drive(&plan, |cmd| {
        if cmd.line.contains("ULI=1") {
            exited(2, "sort.C:1: Error: expected ';'\n")
        } else {
            exited(0, "")
        }
    });

    assert_eq!(summary.compile_failures, 1);
    assert_eq!(summary.rows, 1);
    assert!(seen.iter().all(|c| !is_run(c)));
    let rows = data_rows(&csv);
    assert_eq!(rows[0][1], "No");
    assert_eq!(rows[0][3], "");
    assert_eq!(rows[0][11], "Compilation failed");
    assert!(results.store.is_empty());
}

#[test]
fn failed_materialization_skips_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let (summary, _, _, seen) = drive(&plan, |cmd| {
        if cmd.line.starts_with("make rand") {
            exited(2, "")
        } else {
            exited(0, "")
        }
    });
    assert_eq!(summary.skipped_datasets, 1);
    assert!(seen.iter().all(|c| !is_run(c)));
    // ONE "NOTHING RAN" ROW PER CONFIGURATION
    assert_eq!(summary.rows, 2);
}

#[test]
fn present_dataset_is_not_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("pbbs/comparisonSort/sequenceData/data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::create_dir_all(dir.path().join("pbbs/comparisonSort/sampleSort")).unwrap();
    std::fs::write(data.join("rand_10M"), b"sequenceDouble\n").unwrap();
    let plan = two_config_plan(dir.path());
    let (_, _, _, seen) = drive(&plan, |cmd| {
        if is_run(cmd) {
            exited(0, "PBBS-time: 2.0\n")
        } else {
            exited(0, "")
        }
    });
    assert!(seen.iter().all(|c| c.line != "make rand_10M"));
}

// === MODES ===

#[test]
fn compile_only_writes_yes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let plan = RunPlan { compile_only: true, ..two_config_plan(dir.path()) };
    let (summary, csv, _, seen) = drive(&plan, |_| exited(0, ""));
    assert_eq!(seen.len(), 2);
    assert_eq!(summary.rows, 2);
    for r in data_rows(&csv) {
        assert_eq!(r[1], "Yes");
        assert_eq!(r[3], "");
    }
}

#[test]
fn execute_only_skips_compiling() {
    let dir = tempfile::tempdir().unwrap();
    let plan = RunPlan { execute_only: true, ..two_config_plan(dir.path()) };
    let (summary, _, _, seen) = drive(&plan, |cmd| {
        if is_run(cmd) {
            exited(0, "PBBS-time: 2.0\n")
        } else {
            exited(0, "")
        }
    });
    assert!(seen.iter().all(|c| !c.line.starts_with("make clean")));
    assert_eq!(summary.correct, 4);
}

#[test]
fn shutdown_before_start_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let labels = LabelMap::standard();
    let stop = AtomicBool::new(true);
    let layout = plan.options.layout();
    let mut writer = ResultWriter::new(Vec::new(), &layout);
    let mut results = LoadedResults::default();
    let shell = FakeShell { respond: |_: &ShellCommand| exited(0, ""), seen: vec![] };
    let mut ctl = Controller::new(shell, Idle, AdmissionGate::default(), &labels, &stop);
    let summary = ctl.run(&[sort()], &plan, &mut writer, &mut results).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.rows, 0);
}

// === RESULT FILE ROUND TRIP ===

#[test]
fn written_file_reads_back_into_same_store() {
    let dir = tempfile::tempdir().unwrap();
    let plan = two_config_plan(dir.path());
    let (_, csv, live, _) = drive(&plan, |cmd| {
        if is_run(cmd) {
            exited(0, "PBBS-time: 2.5\n")
        } else {
            exited(0, "")
        }
    });
    let reread = read_results(csv.as_bytes(), &LabelMap::standard()).unwrap();
    assert_eq!(reread.store, live.store);
    assert_eq!(reread.timing_columns, 1);
}

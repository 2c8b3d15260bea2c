// LAZYBENCH REPORT TESTS
// RESULT FILE ON DISK -> STORE -> COMPARISON TABLE
//
// USES tempfile FOR THE RESULT FILE; EVERYTHING ELSE IS IN MEMORY.

use std::io::Write;

use lazybench::catalog::{Benchmark, Family};
use lazybench::matrix::{Configuration, LabelMap, Lowering, Scheduler};
use lazybench::report::{ColumnFilter, Format, Mode, ReportOptions, Table};
use lazybench::results::{load_results, ResultRow, ResultWriter, RunStatus};
use lazybench::samples::SampleLayout;
use lazybench::tuning::DEFAULT_BASELINE;

fn sort() -> Benchmark {
    Benchmark {
        family: Family::PbbsV2,
        path: "comparisonSort/sampleSort".into(),
        binary: "sort".into(),
        check_binary: "sortCheck".into(),
        data_dir: "sequenceData".into(),
        small_inputs: vec![],
        standard_inputs: vec!["rand_10M".into()],
    }
}

fn lazyd() -> Configuration {
    Configuration::new(Scheduler::DelegatePrcPrl, false, true, Lowering::LazyD0)
}

fn options(mode: Mode, format: Format) -> ReportOptions {
    ReportOptions {
        baseline: DEFAULT_BASELINE.to_string(),
        samples: 2,
        mode,
        filter: ColumnFilter::CuratedOnly,
        format,
    }
}

// BASELINE 10s, LAZYD 8s AT 1 CORE; BASELINE FAILS AT 8 CORES
fn write_results(layout: &SampleLayout, rows: &[ResultRow]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    {
        let mut w = ResultWriter::new(file.as_file_mut(), layout);
        w.write_header(layout).unwrap();
        for r in rows {
            w.write_row(r).unwrap();
        }
    }
    file.as_file_mut().flush().unwrap();
    file
}

fn row(
    cfg: &Configuration,
    cores: usize,
    status: RunStatus,
    samples: Vec<Option<f64>>,
) -> ResultRow {
    ResultRow::attempt(&sort(), cfg, "rand_10M", cores, false, status, samples, "")
}

// === TIME MODE ===

#[test]
fn percent_table_from_file() {
    let layout = SampleLayout { num_tests: 2, icache: false, promoted: false };
    let base = Configuration::baseline();
    let file = write_results(
        &layout,
        &[
            row(&base, 1, RunStatus::Correct, vec![Some(9.0), Some(11.0)]),
            row(&base, 8, RunStatus::Incorrect, vec![None, None]),
            row(&lazyd(), 1, RunStatus::Correct, vec![Some(8.0), Some(8.0)]),
            row(&lazyd(), 8, RunStatus::Correct, vec![Some(1.0), Some(1.0)]),
        ],
    );

    let labels = LabelMap::standard();
    let loaded = load_results(file.path(), &labels).unwrap();
    assert_eq!(loaded.timing_columns, 2);
    let table = Table::build(&loaded.store, &labels, &options(Mode::Percent, Format::Csv)).unwrap();
    let text = table.render();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Benchmark, Dataset, Num Cores, OpenCilk(s), LazyD (%)");
    assert_eq!(lines[1], "sampleSort-sort, rand-10M, 1, 10.00, 20.00 %");
    assert_eq!(lines[2], "sampleSort-sort, rand-10M, 8, N/A, N/A");
    assert_eq!(lines[3], "Min, , , , 20.00 %");
    assert_eq!(lines[4], "Geomean, , , , 20.00 %");
    assert_eq!(lines[5], "Max, , , , 20.00 %");
}

#[test]
fn samples_limit_the_mean() {
    let layout = SampleLayout { num_tests: 2, icache: false, promoted: false };
    let base = Configuration::baseline();
    let file = write_results(
        &layout,
        &[
            row(&base, 1, RunStatus::Correct, vec![Some(10.0), Some(30.0)]),
            row(&lazyd(), 1, RunStatus::Correct, vec![Some(5.0), Some(30.0)]),
        ],
    );
    let labels = LabelMap::standard();
    let loaded = load_results(file.path(), &labels).unwrap();
    let mut opts = options(Mode::Percent, Format::Csv);
    opts.samples = 1;
    let table = Table::build(&loaded.store, &labels, &opts).unwrap();
    assert_eq!(table.rows[0][3], "10.00");
    assert_eq!(table.rows[0][4], "50.00 %");
}

// === CACHE MODE ===

#[test]
fn icache_table_uses_miss_rate_and_tex() {
    let layout = SampleLayout { num_tests: 1, icache: true, promoted: false };
    let base = Configuration::baseline();
    let file = write_results(
        &layout,
        &[
            row(&base, 1, RunStatus::Correct, vec![Some(1.0), Some(30.0), Some(70.0)]),
            row(&lazyd(), 1, RunStatus::Correct, vec![Some(1.0), Some(10.0), Some(90.0)]),
        ],
    );
    let labels = LabelMap::standard();
    let loaded = load_results(file.path(), &labels).unwrap();
    let opts = ReportOptions {
        samples: 1,
        ..options(Mode::Cache { misses: loaded.timing_columns }, Format::Tex)
    };
    let text = Table::build(&loaded.store, &labels, &opts).unwrap().render();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "\\toprule");
    assert_eq!(lines[1], "Benchmark & Dataset & Num Cores & OpenCilk\\% & LazyD (\\%) \\\\");
    assert_eq!(lines[2], "\\midrule");
    assert_eq!(lines[3], "sampleSort-sort & rand-10M & 1 & 30.00000 & 20.00000 \\% \\\\");
}

// === COLUMN SELECTION ===

#[test]
fn composite_labels_need_all_columns() {
    let layout = SampleLayout { num_tests: 1, icache: false, promoted: false };
    let uipi = Configuration::new(Scheduler::Prc, false, true, Lowering::Uipi);
    let file = write_results(
        &layout,
        &[
            row(&Configuration::baseline(), 1, RunStatus::Correct, vec![Some(4.0)]),
            row(&uipi, 1, RunStatus::Correct, vec![Some(2.0)]),
        ],
    );
    let labels = LabelMap::standard();
    let loaded = load_results(file.path(), &labels).unwrap();

    let curated =
        Table::build(&loaded.store, &labels, &options(Mode::Percent, Format::Csv)).unwrap();
    assert_eq!(curated.header.len(), 4);

    let all = ReportOptions { filter: ColumnFilter::All, ..options(Mode::Percent, Format::Csv) };
    let table = Table::build(&loaded.store, &labels, &all).unwrap();
    assert_eq!(table.header[4], "LazyD with UIPI Polling+PRC+8+cg (%)");
    assert_eq!(table.rows[0][4], "50.00 %");
}

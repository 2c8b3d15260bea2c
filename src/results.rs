// LAZYBENCH RESULT FILE
// ONE CSV ROW PER RUN ATTEMPT, APPENDED AND FLUSHED AS EACH ATTEMPT FINISHES.
// EVERY ROW OF ONE INVOCATION HAS THE SAME WIDTH: MISSING SAMPLES ARE "N/A".

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crate::catalog::Benchmark;
use crate::error::Result;
use crate::matrix::{composite_label, Configuration, LabelMap};
use crate::samples::SampleLayout;
use crate::store::{CellKey, ResultStore};
use crate::tuning::{
    BASE_COLUMNS, ERROR_COLUMN, ICACHE_COLUMNS, NOT_AVAILABLE, PROMOTED_COLUMNS, TIME_COLUMN,
    UNAVAILABLE_SAMPLE,
};

// COLUMN INDICES
const COL_BENCHMARK: usize = 0;
const COL_COMPILES: usize = 1;
const COL_DATASET: usize = 2;
const COL_CORES: usize = 3;
const COL_STATUS: usize = 4;
const COL_FRAMEWORK: usize = 6;
const COL_SCHEDULER: usize = 7;
const COL_GRAINSIZE: usize = 8;
const COL_NOOPT: usize = 9;
const FIRST_SAMPLE: usize = BASE_COLUMNS.len();

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunStatus {
    Correct,
    Incorrect,
    Timeout,
}

impl RunStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Correct => "Correct",
            Self::Incorrect => "Incorrect",
            Self::Timeout => "Timeout",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "Correct" => Some(Self::Correct),
            "Incorrect" => Some(Self::Incorrect),
            "Timeout" => Some(Self::Timeout),
            _ => None,
        }
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

pub fn header(layout: &SampleLayout) -> Vec<String> {
    let mut cols: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for i in 0..layout.num_tests {
        if i == 0 {
            cols.push(TIME_COLUMN.to_string());
        } else {
            cols.push(format!("{} #{}", TIME_COLUMN, i + 1));
        }
    }
    if layout.icache {
        cols.extend(ICACHE_COLUMNS.iter().map(|c| c.to_string()));
    }
    if layout.promoted {
        cols.extend(PROMOTED_COLUMNS.iter().map(|c| c.to_string()));
    }
    cols.push(ERROR_COLUMN.to_string());
    cols
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    pub benchmark: String,
    pub compiles: bool,
    pub dataset: String,
    pub cores: Option<usize>,
    pub status: Option<RunStatus>,
    pub disable_numa: bool,
    pub framework: String,
    pub scheduler: String,
    pub grainsize: u32,
    pub noopt: bool,
    pub samples: Vec<Option<f64>>,
    pub error: String,
}

impl ResultRow {
    // COMPILE-PHASE ROW: NO DATASET, NO CORES, NO STATUS
    pub fn compile(
        bench: &Benchmark,
        cfg: &Configuration,
        compiles: bool,
        width: usize,
        error: &str,
    ) -> Self {
        Self {
            benchmark: bench.identity(),
            compiles,
            dataset: String::new(),
            cores: None,
            status: None,
            disable_numa: false,
            framework: cfg.lowering.framework_label().to_string(),
            scheduler: cfg.scheduler.name().to_string(),
            grainsize: cfg.grainsize(),
            noopt: cfg.noopt,
            samples: vec![None; width],
            error: error.to_string(),
        }
    }

    pub fn attempt(
        bench: &Benchmark,
        cfg: &Configuration,
        dataset: &str,
        cores: usize,
        disable_numa: bool,
        status: RunStatus,
        samples: Vec<Option<f64>>,
        error: &str,
    ) -> Self {
        Self {
            dataset: dataset.to_string(),
            cores: Some(cores),
            status: Some(status),
            disable_numa,
            samples,
            ..Self::compile(bench, cfg, true, 0, error)
        }
    }

    pub fn composite_label(&self) -> String {
        composite_label(&self.framework, &self.scheduler, &self.grainsize.to_string(), self.noopt)
    }

    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.benchmark.clone(),
            yes_no(self.compiles).to_string(),
            self.dataset.clone(),
            self.cores.map(|c| c.to_string()).unwrap_or_default(),
            self.status.map(|s| s.label().to_string()).unwrap_or_default(),
            yes_no(self.disable_numa).to_string(),
            self.framework.clone(),
            self.scheduler.clone(),
            self.grainsize.to_string(),
            yes_no(self.noopt).to_string(),
        ];
        for s in &self.samples {
            cells.push(match s {
                Some(v) => v.to_string(),
                None => NOT_AVAILABLE.to_string(),
            });
        }
        cells.push(self.error.clone());
        cells
    }
}

// ---------------------------------------------------------------------------
// WRITER
// ---------------------------------------------------------------------------

pub struct ResultWriter<W: Write> {
    csv: csv::Writer<W>,
    width: usize,
}

impl ResultWriter<File> {
    // APPEND MODE. HEADER ONLY WHEN THE FILE IS NEW OR EMPTY.
    pub fn append(path: &Path, layout: &SampleLayout) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let fresh = file.metadata()?.len() == 0;
        let mut writer = Self::new(file, layout);
        if fresh {
            writer.write_header(layout)?;
        }
        Ok(writer)
    }
}

impl<W: Write> ResultWriter<W> {
    pub fn new(inner: W, layout: &SampleLayout) -> Self {
        let csv = csv::WriterBuilder::new().flexible(true).from_writer(inner);
        Self { csv, width: header(layout).len() }
    }

    pub fn write_header(&mut self, layout: &SampleLayout) -> Result<()> {
        self.csv.write_record(header(layout))?;
        self.csv.flush()?;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn write_row(&mut self, row: &ResultRow) -> Result<()> {
        let cells = row.cells();
        debug_assert_eq!(cells.len(), self.width, "row width drifted: {:?}", cells);
        self.csv.write_record(&cells)?;
        self.csv.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Option<W> {
        self.csv.into_inner().ok()
    }
}

// ---------------------------------------------------------------------------
// READER
// ---------------------------------------------------------------------------

// p[1]-p[2] OF "family-root/dir/sub/binary" STYLE IDENTITIES
pub fn report_name(identity: &str) -> String {
    let parts: Vec<&str> = identity.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() >= 3 {
        format!("{}-{}", parts[1], parts[2])
    } else {
        parts.join("-")
    }
}

pub fn dataset_key(dataset: &str) -> String {
    dataset.replace('_', "-")
}

fn sample_value(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.is_empty() || cell == NOT_AVAILABLE {
        return UNAVAILABLE_SAMPLE;
    }
    cell.parse::<f64>().unwrap_or(UNAVAILABLE_SAMPLE)
}

#[derive(Clone, Debug, Default)]
pub struct LoadedResults {
    pub store: ResultStore,
    pub labels: BTreeSet<String>,
    // SAMPLE CELLS PER ROW
    pub sample_width: usize,
    // TIME(sec) COLUMNS IN THE HEADER; 0 WHEN NO HEADER WAS SEEN
    pub timing_columns: usize,
}

impl LoadedResults {
    pub fn record(&mut self, row: &ResultRow, labels: &LabelMap) {
        let cores = match row.cores {
            Some(c) => c.to_string(),
            None => return,
        };
        let label = labels.display(&row.composite_label());
        let samples = if row.status == Some(RunStatus::Correct) {
            row.samples.iter().map(|s| s.unwrap_or(UNAVAILABLE_SAMPLE)).collect()
        } else {
            vec![UNAVAILABLE_SAMPLE; row.samples.len()]
        };
        self.insert(label, &row.benchmark, &row.dataset, &cores, samples);
    }

    fn insert(
        &mut self,
        label: String,
        identity: &str,
        dataset: &str,
        cores: &str,
        samples: Vec<f64>,
    ) {
        self.sample_width = self.sample_width.max(samples.len());
        let key = CellKey::new(&report_name(identity), &dataset_key(dataset), cores);
        self.store.insert(&label, key, samples);
        self.labels.insert(label);
    }
}

pub fn read_results<R: Read>(reader: R, labels: &LabelMap) -> Result<LoadedResults> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut loaded = LoadedResults::default();
    for record in rdr.records() {
        let rec = record?;
        let benchmark = rec.get(COL_BENCHMARK).unwrap_or_default().trim();
        if benchmark.is_empty() {
            continue;
        }
        if benchmark == BASE_COLUMNS[COL_BENCHMARK] {
            loaded.timing_columns = rec.iter().filter(|c| c.starts_with(TIME_COLUMN)).count();
            continue;
        }
        let cores = rec.get(COL_CORES).unwrap_or_default().trim();
        let compiled = rec.get(COL_COMPILES).unwrap_or_default().trim() == "Yes";
        if !compiled || cores.is_empty() || rec.len() <= FIRST_SAMPLE {
            continue;
        }

        let mut cells: Vec<&str> = rec.iter().collect();
        cells.pop(); // ERROR MSG
        let samples: Vec<f64> = cells[FIRST_SAMPLE.min(cells.len())..]
            .iter()
            .map(|c| sample_value(c))
            .collect();
        let status = RunStatus::from_label(rec.get(COL_STATUS).unwrap_or_default());
        let samples = if status == Some(RunStatus::Correct) {
            samples
        } else {
            vec![UNAVAILABLE_SAMPLE; samples.len()]
        };

        let composite = composite_label(
            rec.get(COL_FRAMEWORK).unwrap_or_default(),
            rec.get(COL_SCHEDULER).unwrap_or_default(),
            rec.get(COL_GRAINSIZE).unwrap_or_default(),
            rec.get(COL_NOOPT).unwrap_or_default() == "Yes",
        );
        let dataset = rec.get(COL_DATASET).unwrap_or_default();
        loaded.insert(labels.display(&composite), benchmark, dataset, cores, samples);
    }
    Ok(loaded)
}

pub fn load_results(path: &Path, labels: &LabelMap) -> Result<LoadedResults> {
    read_results(File::open(path)?, labels)
}

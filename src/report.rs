// LAZYBENCH COMPARISON REPORT
// BASELINE-RELATIVE TABLE OVER A RESULT STORE, WITH MIN / GEOMEAN / MAX ROWS.
//
// ROWS: EVERY (BENCHMARK, DATASET, CORES) KEY UNDER THE BASELINE LABEL.
// COLUMNS: BASELINE ABSOLUTE VALUE, THEN ONE IMPROVEMENT COLUMN PER ADMITTED
// LABEL IN LEXICOGRAPHIC ORDER.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::matrix::LabelMap;
use crate::store::ResultStore;
use crate::tuning::{CACHE_PRECISION, DEFAULT_PRECISION, NOT_AVAILABLE};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    // MEAN OF THE FIRST N TIMINGS; IMPROVEMENT IS PERCENT OF TIME SAVED
    Percent,
    // ICACHE MISS RATE FROM THE (MISSES, HITS) PAIR AT `misses`, `misses + 1`;
    // IMPROVEMENT IS THE ABSOLUTE RATE DIFFERENCE
    Cache { misses: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Csv,
    Tex,
}

impl Format {
    fn percent(self) -> &'static str {
        match self {
            Self::Csv => "%",
            Self::Tex => "\\%",
        }
    }
}

// WHICH NON-BASELINE LABELS GET A COLUMN
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnFilter {
    All,
    CuratedOnly,
    Allowlist(BTreeSet<String>),
}

impl ColumnFilter {
    pub fn admits(&self, label: &str, labels: &LabelMap) -> bool {
        match self {
            Self::All => true,
            Self::CuratedOnly => labels.is_curated(label),
            Self::Allowlist(names) => names.contains(label),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReportOptions {
    pub baseline: String,
    // TIMING SAMPLES AVERAGED PER CELL; 0 MEANS EVERY SAMPLE PRESENT
    pub samples: usize,
    pub mode: Mode,
    pub filter: ColumnFilter,
    pub format: Format,
}

impl ReportOptions {
    fn precision(&self) -> usize {
        match self.mode {
            Mode::Percent => DEFAULT_PRECISION,
            Mode::Cache { .. } => CACHE_PRECISION,
        }
    }
}

// ---------------------------------------------------------------------------
// ARITHMETIC
// ---------------------------------------------------------------------------

// None WHEN THE CELL CANNOT PRODUCE A VALUE (FAILED RUN, MISSING SLOT)
pub fn representative(samples: &[f64], n: usize, mode: Mode) -> Option<f64> {
    match mode {
        Mode::Percent => {
            let take = if n == 0 { samples.len() } else { n.min(samples.len()) };
            let head = &samples[..take];
            if head.is_empty() || head.iter().any(|s| *s < 0.0) {
                return None;
            }
            Some(head.iter().sum::<f64>() / head.len() as f64)
        }
        Mode::Cache { misses } => {
            let m = *samples.get(misses)?;
            let h = *samples.get(misses + 1)?;
            if m < 0.0 || h < 0.0 || m + h <= 0.0 {
                return None;
            }
            Some(100.0 * m / (m + h))
        }
    }
}

// None UNLESS BOTH SIDES ARE STRICTLY POSITIVE
pub fn improvement(baseline: Option<f64>, other: Option<f64>, mode: Mode) -> Option<f64> {
    let (b, o) = (baseline?, other?);
    if b <= 0.0 || o <= 0.0 {
        return None;
    }
    Some(match mode {
        Mode::Percent => (b - o) / b * 100.0,
        Mode::Cache { .. } => (b - o).abs(),
    })
}

// (gmean(1 + x/100) - 1) * 100. None FOR AN EMPTY COLUMN OR A NON-POSITIVE FACTOR.
pub fn geomean_improvement(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut log_sum = 0.0;
    for v in values {
        let factor = 1.0 + v / 100.0;
        if factor <= 0.0 {
            return None;
        }
        log_sum += factor.ln();
    }
    Some(((log_sum / values.len() as f64).exp() - 1.0) * 100.0)
}

fn min_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn max_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

// ---------------------------------------------------------------------------
// TABLE
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    // DATA ROWS FOLLOWED BY Min, Geomean, Max
    pub rows: Vec<Vec<String>>,
    pub format: Format,
}

impl Table {
    pub fn build(store: &ResultStore, labels: &LabelMap, opts: &ReportOptions) -> Result<Self> {
        if !store.contains_label(&opts.baseline) {
            return Err(Error::MissingBaseline(opts.baseline.clone()));
        }
        let perc = opts.format.percent();
        let prec = opts.precision();

        let columns: Vec<&str> = store
            .labels()
            .filter(|l| *l != opts.baseline && opts.filter.admits(l, labels))
            .collect();

        let mut header: Vec<String> =
            ["Benchmark", "Dataset", "Num Cores"].iter().map(|h| h.to_string()).collect();
        header.push(match opts.mode {
            Mode::Percent => format!("{}(s)", opts.baseline),
            Mode::Cache { .. } => format!("{}{}", opts.baseline, perc),
        });
        header.extend(columns.iter().map(|c| format!("{} ({})", c, perc)));

        let mut collected: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
        let mut rows = Vec::new();
        for key in store.keys(&opts.baseline) {
            let base = store
                .get(&opts.baseline, &key)
                .and_then(|s| representative(s, opts.samples, opts.mode));
            let mut row = vec![key.benchmark.clone(), key.dataset.clone(), key.cores.clone()];
            row.push(match base {
                Some(b) => format!("{:.*}", prec, b),
                None => NOT_AVAILABLE.to_string(),
            });
            for (i, col) in columns.iter().enumerate() {
                let other = store
                    .get(col, &key)
                    .and_then(|s| representative(s, opts.samples, opts.mode));
                match improvement(base, other, opts.mode) {
                    Some(v) => {
                        collected[i].push(v);
                        row.push(format!("{:.*} {}", prec, v, perc));
                    }
                    None => row.push(NOT_AVAILABLE.to_string()),
                }
            }
            rows.push(row);
        }

        let summaries: [(&str, fn(&[f64]) -> Option<f64>); 3] = [
            ("Min", min_of),
            ("Geomean", geomean_improvement),
            ("Max", max_of),
        ];
        for (name, reduce) in summaries {
            let mut row = vec![name.to_string(), String::new(), String::new(), String::new()];
            for values in &collected {
                row.push(match reduce(values) {
                    Some(v) => format!("{:.*} {}", prec, v, perc),
                    None => NOT_AVAILABLE.to_string(),
                });
            }
            rows.push(row);
        }

        Ok(Self { header, rows, format: opts.format })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        match self.format {
            Format::Csv => {
                for row in std::iter::once(&self.header).chain(&self.rows) {
                    let _ = writeln!(out, "{}", row.join(", "));
                }
            }
            Format::Tex => {
                out.push_str("\\toprule\n");
                let _ = writeln!(out, "{} \\\\", self.header.join(" & "));
                for (i, row) in self.rows.iter().enumerate() {
                    if i == 0 {
                        out.push_str("\\midrule\n");
                    }
                    let _ = writeln!(out, "{} \\\\", row.join(" & "));
                }
            }
        }
        out
    }
}

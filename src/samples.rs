// LAZYBENCH RESULT PARSER
// LINE-ORIENTED SCRAPING OF BENCHMARK OUTPUT INTO TYPED SAMPLES.
//
// UNMATCHED LINES ARE IGNORED. A LINE THAT MATCHES A MARKER BUT DOES NOT CARRY
// A NUMBER WHERE ONE IS EXPECTED FAILS THE WHOLE ATTEMPT.

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::tuning::{ICACHE_SLOTS, PROMOTED_SLOTS};

const ICACHE_MARKER: &str = "icache";
const PROMOTED_SENTINEL: &str = "-1,";

// LABEL SUBSTRING -> PROMOTED SLOT
const PROMOTED_LABELS: [(&str, usize); PROMOTED_SLOTS] = [
    ("number of success push_workctx", 0),
    ("work size", 1),
    ("number of total tasks", 2),
];

// WHAT A RUN IS EXPECTED TO PRINT, AND WHERE EXTRA SAMPLES GO
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleLayout {
    pub num_tests: usize,
    pub icache: bool,
    pub promoted: bool,
}

impl SampleLayout {
    pub fn width(&self) -> usize {
        self.num_tests
            + if self.icache { ICACHE_SLOTS } else { 0 }
            + if self.promoted { PROMOTED_SLOTS } else { 0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedSamples {
    pub timings: Vec<f64>,
    pub icache: Vec<f64>,
    pub promoted: [Option<f64>; PROMOTED_SLOTS],
}

impl ParsedSamples {
    // EXACTLY layout.width() CELLS. MISSING VALUES ARE None, SURPLUS TIMINGS DROPPED.
    pub fn cells(&self, layout: &SampleLayout) -> Vec<Option<f64>> {
        let mut cells = Vec::with_capacity(layout.width());
        for i in 0..layout.num_tests {
            cells.push(self.timings.get(i).copied());
        }
        if layout.icache {
            for i in 0..ICACHE_SLOTS {
                cells.push(self.icache.get(i).copied());
            }
        }
        if layout.promoted {
            cells.extend(self.promoted.iter().copied());
        }
        cells
    }
}

fn number(line: &str, field: Option<&str>) -> Result<f64> {
    let raw = field.map(str::trim).unwrap_or_default();
    raw.parse::<f64>().map_err(|e| Error::Sample {
        line: line.to_string(),
        reason: format!("{:?}: {}", raw, e),
    })
}

// `<marker...>: <seconds>` LINES, IN ORDER
pub fn parse_timings(marker: &str, text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for line in text.lines().filter(|l| l.contains(marker)) {
        let mut fields = line.split(':');
        let head = fields.next().unwrap_or_default();
        if !head.contains(marker) {
            continue;
        }
        out.push(number(line, fields.next())?);
    }
    Ok(out)
}

// perf stat -x, OUTPUT: FIRST FIELD IS THE COUNT
pub fn parse_icache(text: &str) -> Result<Vec<f64>> {
    text.lines()
        .filter(|l| l.contains(ICACHE_MARKER))
        .map(|line| number(line, line.split(',').next()))
        .collect()
}

// `...-1,<label>,<value>` RUNTIME COUNTER LINES
pub fn parse_promoted(text: &str) -> Result<[Option<f64>; PROMOTED_SLOTS]> {
    let mut slots = [None; PROMOTED_SLOTS];
    for line in text.lines().filter(|l| l.contains(PROMOTED_SENTINEL)) {
        let fields: Vec<&str> = line.split(',').collect();
        let label = match fields.get(1) {
            Some(l) => *l,
            None => continue,
        };
        let slot = match PROMOTED_LABELS.iter().find(|(needle, _)| label.contains(needle)) {
            Some((_, slot)) => *slot,
            None => continue,
        };
        if slots[slot].is_some() {
            debug!("DUPLICATE COUNTER LINE IGNORED: {}", line);
            continue;
        }
        slots[slot] = Some(number(line, fields.get(2).copied())?);
    }
    Ok(slots)
}

pub fn parse(
    marker: &str,
    layout: &SampleLayout,
    stdout: &str,
    stderr: &str,
) -> Result<ParsedSamples> {
    let mut parsed = ParsedSamples {
        timings: parse_timings(marker, stdout)?,
        ..ParsedSamples::default()
    };
    if layout.icache {
        // perf stat REPORTS ON STDERR
        parsed.icache = parse_icache(stdout)?;
        parsed.icache.extend(parse_icache(stderr)?);
    }
    if layout.promoted {
        parsed.promoted = parse_promoted(stdout)?;
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// FAILURE MARKERS
// ---------------------------------------------------------------------------

// COMPILED ONCE PER CONTROLLER
#[derive(Clone, Debug)]
pub struct FailureMarkers {
    compile: Regex,
    run: Regex,
}

impl FailureMarkers {
    pub fn new() -> Self {
        Self {
            compile: Regex::new(r"Error").expect("static regex"),
            run: Regex::new(
                r"(?m)(Segmentation fault|core dumped|terminate called|Assertion .* failed|^Error\b)",
            )
            .expect("static regex"),
        }
    }

    pub fn compile_failed(&self, output: &str) -> bool {
        self.compile.is_match(output)
    }

    pub fn run_failed(&self, output: &str) -> bool {
        self.run.is_match(output)
    }
}

impl Default for FailureMarkers {
    fn default() -> Self {
        Self::new()
    }
}

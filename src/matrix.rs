// LAZYBENCH CONFIGURATION MATRIX
// CROSS PRODUCT: SCHEDULER x GRAIN x NO-OPT x LOWERING, FILTERED PER FAMILY.
//
// EVERY VALID TUPLE GETS A FIXED-WIDTH 4-CHARACTER SUFFIX (ONE CODE PER AXIS),
// SO DISTINCT TUPLES NEVER SHARE A BINARY NAME.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::tuning::{DEFAULT_GRAINSIZE, FINE_GRAINSIZE};

// ---------------------------------------------------------------------------
// AXES
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Scheduler {
    Pbbs,
    Prc,
    Prl,
    PrcPrl,
    DelegatePrc,
    DelegatePrcPrl,
    OpenCilkDefaultFine,
}

impl Scheduler {
    pub const ALL: [Scheduler; 7] = [
        Self::Pbbs,
        Self::Prc,
        Self::Prl,
        Self::PrcPrl,
        Self::DelegatePrc,
        Self::DelegatePrcPrl,
        Self::OpenCilkDefaultFine,
    ];

    // TASK_SCHEDULER COLUMN AND MAKE VARIABLE NAME
    pub fn name(self) -> &'static str {
        match self {
            Self::Pbbs => "PBBS",
            Self::Prc => "PRC",
            Self::Prl => "PRL",
            Self::PrcPrl => "PRCPRL",
            Self::DelegatePrc => "DELEGATEPRC",
            Self::DelegatePrcPrl => "DELEGATEPRCPRL",
            Self::OpenCilkDefaultFine => "OPENCILKDEFAULT_FINE",
        }
    }

    fn code(self) -> char {
        match self {
            Self::Pbbs => 'B',
            Self::Prc => 'C',
            Self::Prl => 'L',
            Self::PrcPrl => 'M',
            Self::DelegatePrc => 'D',
            Self::DelegatePrcPrl => 'E',
            Self::OpenCilkDefaultFine => 'F',
        }
    }

    pub fn is_baseline(self) -> bool {
        self == Self::Pbbs
    }

    pub fn is_delegate(self) -> bool {
        matches!(self, Self::DelegatePrc | Self::DelegatePrcPrl)
    }
}

impl FromStr for Scheduler {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        let alias = match wanted.as_str() {
            "DELPRC" => "DELEGATEPRC",
            "DELPRCPRL" => "DELEGATEPRCPRL",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|sched| sched.name() == alias)
            .ok_or_else(|| Error::Axis { axis: "scheduler", value: s.to_string() })
    }
}

impl fmt::Display for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Lowering {
    Serial,
    LazyD2,
    Nopoll,
    Sigusr,
    Uipi,
    LazyD0,
    OpenCilk,
}

impl Lowering {
    pub const ALL: [Lowering; 7] = [
        Self::Serial,
        Self::LazyD2,
        Self::Nopoll,
        Self::Sigusr,
        Self::Uipi,
        Self::LazyD0,
        Self::OpenCilk,
    ];

    // COMMAND-LINE NAME
    pub fn name(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::LazyD2 => "lazyd2",
            Self::Nopoll => "nopoll",
            Self::Sigusr => "sigusr",
            Self::Uipi => "uipi",
            Self::LazyD0 => "lazyd0",
            Self::OpenCilk => "tapir",
        }
    }

    // PARALLEL_FRAMEWORK COLUMN
    pub fn framework_label(self) -> &'static str {
        match self {
            Self::Serial => "Serial",
            Self::LazyD2 => "LazyD with Frequent Polling",
            Self::Nopoll => "LazyD with No Polling",
            Self::Sigusr => "LazyD with Signal Polling",
            Self::Uipi => "LazyD with UIPI Polling",
            Self::LazyD0 => "LazyD with InFrequent Polling",
            Self::OpenCilk => "OpenCilk",
        }
    }

    fn code(self) -> char {
        match self {
            Self::Serial => 's',
            Self::LazyD2 => '2',
            Self::Nopoll => 'n',
            Self::Sigusr => 'g',
            Self::Uipi => 'u',
            Self::LazyD0 => '0',
            Self::OpenCilk => 'o',
        }
    }

    pub fn is_reference(self) -> bool {
        self == Self::OpenCilk
    }

    pub fn is_polling(self) -> bool {
        matches!(self, Self::LazyD2 | Self::LazyD0 | Self::Nopoll)
    }
}

impl FromStr for Lowering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let alias = match wanted.as_str() {
            "opencilk" | "cilkplus" => "tapir",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|lower| lower.name() == alias)
            .ok_or_else(|| Error::Axis { axis: "lowering", value: s.to_string() })
    }
}

impl fmt::Display for Lowering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// BOOLEAN AXIS: "both" EXPANDS TO [false, true]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Toggle {
    #[default]
    Off,
    On,
    Both,
}

impl Toggle {
    pub fn values(self) -> &'static [bool] {
        match self {
            Self::Off => &[false],
            Self::On => &[true],
            Self::Both => &[false, true],
        }
    }
}

impl FromStr for Toggle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "false" | "no" | "off" | "0" => Ok(Self::Off),
            "true" | "yes" | "on" | "1" => Ok(Self::On),
            "both" => Ok(Self::Both),
            _ => Err(Error::Axis { axis: "toggle", value: s.to_string() }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Axes {
    pub schedulers: Vec<Scheduler>,
    pub noopt: Toggle,
    pub fine_grain: Toggle,
    pub lowerings: Vec<Lowering>,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            schedulers: vec![Scheduler::Pbbs],
            noopt: Toggle::Off,
            fine_grain: Toggle::Off,
            lowerings: vec![Lowering::OpenCilk],
        }
    }
}

// ---------------------------------------------------------------------------
// CONFIGURATION
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Configuration {
    pub scheduler: Scheduler,
    pub noopt: bool,
    pub fine_grain: bool,
    pub lowering: Lowering,
}

impl Configuration {
    pub fn new(scheduler: Scheduler, noopt: bool, fine_grain: bool, lowering: Lowering) -> Self {
        Self { scheduler, noopt, fine_grain, lowering }
    }

    pub fn baseline() -> Self {
        Self::new(Scheduler::Pbbs, false, false, Lowering::OpenCilk)
    }

    // ORDER: SCHEDULER, NO-OPT, FINE-GRAIN, LOWERING
    pub fn suffix(&self) -> String {
        let mut s = String::with_capacity(4);
        s.push(self.scheduler.code());
        s.push(if self.noopt { 'n' } else { 'u' });
        s.push(if self.fine_grain { 'f' } else { 'c' });
        s.push(self.lowering.code());
        s
    }

    pub fn grainsize(&self) -> u32 {
        if self.fine_grain {
            FINE_GRAINSIZE
        } else {
            DEFAULT_GRAINSIZE
        }
    }

    // IMPLEMENTATION KEY BEFORE DISPLAY-NAME REMAP
    pub fn composite_label(&self) -> String {
        composite_label(
            self.lowering.framework_label(),
            self.scheduler.name(),
            &self.grainsize().to_string(),
            self.noopt,
        )
    }
}

pub fn composite_label(framework: &str, scheduler: &str, grainsize: &str, noopt: bool) -> String {
    let cg = if noopt { "nocg" } else { "cg" };
    format!("{}+{}+{}+{}", framework, scheduler, grainsize, cg)
}

// ---------------------------------------------------------------------------
// VALIDITY
// ---------------------------------------------------------------------------

// WHICH RULE SET APPLIES TO A BENCHMARK FAMILY
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Validity {
    Simple,
    Extended,
}

pub fn is_valid(validity: Validity, cfg: &Configuration) -> bool {
    match validity {
        Validity::Simple => cfg.scheduler.is_baseline() && !cfg.fine_grain && !cfg.noopt,
        Validity::Extended => {
            if cfg.scheduler == Scheduler::OpenCilkDefaultFine
                && !(cfg.lowering.is_reference() && cfg.fine_grain)
            {
                return false;
            }
            if cfg.noopt
                && cfg.scheduler != Scheduler::DelegatePrcPrl
                && !cfg.scheduler.is_baseline()
            {
                return false;
            }
            if cfg.scheduler.is_baseline() && (cfg.fine_grain || cfg.lowering.is_polling()) {
                return false;
            }
            if cfg.lowering.is_reference() && cfg.scheduler.is_delegate() {
                return false;
            }
            true
        }
    }
}

fn dedup<T: PartialEq + Copy>(values: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(values.len());
    for &v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

// VALID (CONFIGURATION, SUFFIX) PAIRS IN AXIS ORDER. INVALID TUPLES ARE DROPPED SILENTLY.
pub fn generate(validity: Validity, axes: &Axes) -> Vec<(Configuration, String)> {
    let mut out = Vec::new();
    for scheduler in dedup(&axes.schedulers) {
        for &fine_grain in axes.fine_grain.values() {
            for &noopt in axes.noopt.values() {
                for lowering in dedup(&axes.lowerings) {
                    let cfg = Configuration::new(scheduler, noopt, fine_grain, lowering);
                    if is_valid(validity, &cfg) {
                        out.push((cfg, cfg.suffix()));
                    }
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// DISPLAY NAMES
// ---------------------------------------------------------------------------

const CURATED_LABELS: [(&str, &str); 13] = [
    ("LazyD with Frequent Polling+DELEGATEPRCPRL+8+cg", "LazyD"),
    ("LazyD with InFrequent Polling+DELEGATEPRCPRL+8+cg", "LazyD"),
    ("LazyD with InFrequent Polling+PRCPRL+8+cg", "LazyD-EF"),
    ("LazyD with Frequent Polling+PRCPRL+8+cg", "LazyD-EF"),
    ("LazyD with InFrequent Polling+DELEGATEPRC+8+cg", "LazyD-PRL"),
    ("LazyD with Frequent Polling+DELEGATEPRC+8+cg", "LazyD-PRL"),
    ("OpenCilk+OPENCILKDEFAULT_FINE+8+cg", "OpenCilk.fine"),
    ("LazyD with Frequent Polling+DELEGATEPRCPRL+8+nocg", "LazyD-cg"),
    ("LazyD with InFrequent Polling+DELEGATEPRCPRL+8+nocg", "LazyD-cg"),
    ("OpenCilk+PBBS+2048+nocg", "OpenCilk-cg"),
    ("OpenCilk+PBBS+2048+cg", "OpenCilk"),
    ("LazyD with No Polling+PRL+8+cg", "LazyD-poll"),
    ("Serial+PBBS+2048+cg", "Serial"),
];

// COMPOSITE KEY -> CURATED COLUMN NAME. BUILT ONCE, PASSED BY REFERENCE.
#[derive(Clone, Debug)]
pub struct LabelMap {
    names: HashMap<String, String>,
}

impl LabelMap {
    pub fn standard() -> Self {
        let names = CURATED_LABELS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { names }
    }

    pub fn empty() -> Self {
        Self { names: HashMap::new() }
    }

    pub fn with(mut self, composite: &str, display: &str) -> Self {
        self.names.insert(composite.to_string(), display.to_string());
        self
    }

    // UNMAPPED KEYS PASS THROUGH UNCHANGED
    pub fn display(&self, composite: &str) -> String {
        self.names
            .get(composite)
            .cloned()
            .unwrap_or_else(|| composite.to_string())
    }

    pub fn is_curated(&self, label: &str) -> bool {
        self.names.values().any(|v| v == label)
    }
}

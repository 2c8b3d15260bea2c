// LAZYBENCH RESULT STORE
// IMPLEMENTATION -> BENCHMARK -> DATASET -> CORES -> SAMPLES
// KEYS ARE CREATED ON FIRST INSERT AND NEVER REMOVED. -1 MEANS UNAVAILABLE.

use std::cmp::Ordering;
use std::collections::BTreeMap;

type Cores = BTreeMap<String, Vec<f64>>;
type Datasets = BTreeMap<String, Cores>;
type Benchmarks = BTreeMap<String, Datasets>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultStore {
    impls: BTreeMap<String, Benchmarks>,
}

// ONE (BENCHMARK, DATASET, CORES) KEY
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellKey {
    pub benchmark: String,
    pub dataset: String,
    pub cores: String,
}

impl CellKey {
    pub fn new(benchmark: &str, dataset: &str, cores: &str) -> Self {
        Self {
            benchmark: benchmark.to_string(),
            dataset: dataset.to_string(),
            cores: cores.to_string(),
        }
    }
}

// CORE COUNTS COMPARE NUMERICALLY WHEN BOTH PARSE
fn cmp_cores(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.benchmark
            .cmp(&other.benchmark)
            .then_with(|| self.dataset.cmp(&other.dataset))
            .then_with(|| cmp_cores(&self.cores, &other.cores))
    }
}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A REPEATED KEY REPLACES THE SAMPLES (LAST ROW WINS)
    pub fn insert(&mut self, label: &str, key: CellKey, samples: Vec<f64>) {
        self.impls
            .entry(label.to_string())
            .or_default()
            .entry(key.benchmark)
            .or_default()
            .entry(key.dataset)
            .or_default()
            .insert(key.cores, samples);
    }

    pub fn get(&self, label: &str, key: &CellKey) -> Option<&[f64]> {
        self.impls
            .get(label)?
            .get(&key.benchmark)?
            .get(&key.dataset)?
            .get(&key.cores)
            .map(Vec::as_slice)
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.impls.contains_key(label)
    }

    // SORTED LEXICOGRAPHICALLY
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.impls.keys().map(String::as_str)
    }

    // EVERY KEY UNDER ONE LABEL, BENCHMARK/DATASET LEXICOGRAPHIC, CORES NUMERIC
    pub fn keys(&self, label: &str) -> Vec<CellKey> {
        let mut keys = Vec::new();
        if let Some(benches) = self.impls.get(label) {
            for (bench, datasets) in benches {
                for (dataset, cores) in datasets {
                    for core in cores.keys() {
                        keys.push(CellKey::new(bench, dataset, core));
                    }
                }
            }
        }
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.impls.is_empty()
    }
}

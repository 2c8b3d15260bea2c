// LAZYBENCH BENCHMARK CATALOG
// ONE RECORD PER DESCRIPTOR ROW. IMMUTABLE AFTER LOAD.
//
// DESCRIPTOR COLUMNS:
//   FAMILY, PATH, BINARY, CHECK BINARY, DATA DIR, SMALL INPUTS, STANDARD INPUTS
// THE LAST TWO ARE COMMA-SEPARATED LISTS INSIDE ONE (QUOTED) CELL.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::matrix::Validity;

const DESCRIPTOR_FIELDS: usize = 7;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Family {
    Cilk5,
    Pbbs,
    PbbsV2,
}

impl Family {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "cilk5" => Some(Self::Cilk5),
            "pbbs" => Some(Self::Pbbs),
            "pbbs_v2" => Some(Self::PbbsV2),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Cilk5 => "cilk5",
            Self::Pbbs => "pbbs",
            Self::PbbsV2 => "pbbs_v2",
        }
    }

    // ONLY PBBS_V2 UNDERSTANDS SCHEDULER / GRAIN / NO-OPT KNOBS
    pub fn validity(self) -> Validity {
        match self {
            Self::Cilk5 | Self::Pbbs => Validity::Simple,
            Self::PbbsV2 => Validity::Extended,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Benchmark {
    pub family: Family,
    pub path: String,
    pub binary: String,
    pub check_binary: String,
    pub data_dir: String,
    pub small_inputs: Vec<String>,
    pub standard_inputs: Vec<String>,
}

impl Benchmark {
    // BENCHMARK COLUMN OF THE RESULT FILE
    pub fn identity(&self) -> String {
        format!("{}/{}", self.path, self.binary)
    }

    pub fn datasets(&self, small: bool) -> &[String] {
        if small {
            &self.small_inputs
        } else {
            &self.standard_inputs
        }
    }
}

fn split_list(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_record(record: &csv::StringRecord) -> Option<Benchmark> {
    let tag = record.get(0)?.trim();
    if tag.is_empty() || tag.starts_with('#') {
        return None;
    }
    if record.len() < DESCRIPTOR_FIELDS {
        warn!("SKIPPING DESCRIPTOR ROW WITH {} FIELDS: {:?}", record.len(), record);
        return None;
    }
    let family = match Family::from_tag(tag) {
        Some(f) => f,
        None => {
            warn!("SKIPPING DESCRIPTOR ROW WITH UNKNOWN FAMILY {:?}", tag);
            return None;
        }
    };
    let field = |i: usize| record.get(i).unwrap_or_default().trim().to_string();
    Some(Benchmark {
        family,
        path: field(1),
        binary: field(2),
        check_binary: field(3),
        data_dir: field(4),
        small_inputs: split_list(&field(5)),
        standard_inputs: split_list(&field(6)),
    })
}

pub fn load_from_reader<R: Read>(reader: R) -> Vec<Benchmark> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut benchmarks = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        match record {
            Ok(rec) => {
                if let Some(bench) = parse_record(&rec) {
                    debug!("LOADED {} ({})", bench.identity(), bench.family.tag());
                    benchmarks.push(bench);
                }
            }
            Err(e) => warn!("SKIPPING UNREADABLE DESCRIPTOR ROW {}: {}", i + 1, e),
        }
    }
    benchmarks
}

pub fn load(path: &Path) -> Result<Vec<Benchmark>> {
    let file = File::open(path).map_err(|e| Error::Descriptor {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    Ok(load_from_reader(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = "\
family,name,binary,check,data,small,standard
pbbs_v2,benchmarks/comparisonSort/sampleSort,sort,sortCheck,sequenceData,\"rand_10K,exp_10K\",\"rand_10M\"
# pbbs_v2,benchmarks/skipped/disabled,x,y,z,a,b

cilk5,fib,fib,,,30,42
bogus,a,b,c,d,e,f
pbbs,short,row
";

    #[test]
    fn loads_valid_rows_only() {
        let benches = load_from_reader(DESCRIPTOR.as_bytes());
        assert_eq!(benches.len(), 2);

        let sort = &benches[0];
        assert_eq!(sort.family, Family::PbbsV2);
        assert_eq!(sort.identity(), "benchmarks/comparisonSort/sampleSort/sort");
        assert_eq!(sort.small_inputs, vec!["rand_10K", "exp_10K"]);
        assert_eq!(sort.datasets(false), &["rand_10M".to_string()]);

        let fib = &benches[1];
        assert_eq!(fib.family, Family::Cilk5);
        assert_eq!(fib.check_binary, "");
        assert_eq!(fib.datasets(true), &["30".to_string()]);
    }

    #[test]
    fn family_validity_classes() {
        assert_eq!(Family::Cilk5.validity(), Validity::Simple);
        assert_eq!(Family::Pbbs.validity(), Validity::Simple);
        assert_eq!(Family::PbbsV2.validity(), Validity::Extended);
        assert_eq!(Family::from_tag(" pbbs_v2 "), Some(Family::PbbsV2));
    }

    #[test]
    fn missing_file_is_descriptor_error() {
        let err = load(Path::new("/nonexistent/lazybenchmark.csv")).unwrap_err();
        assert!(matches!(err, Error::Descriptor { .. }));
    }
}

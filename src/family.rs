// LAZYBENCH FAMILY CAPABILITIES
// COMPILE / RUN / VERIFY / MATERIALIZE COMMANDS PER BENCHMARK FAMILY.
// THE FAMILY IS FIXED WHEN THE DESCRIPTOR ROW IS LOADED; NOTHING HERE
// RE-DISPATCHES ON THE TAG STRING.

use std::path::{Path, PathBuf};

use crate::catalog::{Benchmark, Family};
use crate::matrix::{Configuration, Lowering, Scheduler};
use crate::process::ShellCommand;
use crate::samples::SampleLayout;

const NUMA_WRAPPER: &str = "numactl --interleave=all";
const ICACHE_WRAPPER: &str = "perf stat -x, -e icache.misses,icache.hit -a";

// KNOBS PASSED THROUGH TO EVERY RUN COMMAND
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub workdir: PathBuf,
    pub num_tests: usize,
    pub disable_numa: bool,
    pub icache: bool,
    pub promoted: bool,
    pub lib_path: Option<String>,
}

impl RunOptions {
    pub fn layout(&self) -> SampleLayout {
        SampleLayout { num_tests: self.num_tests, icache: self.icache, promoted: self.promoted }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            num_tests: 1,
            disable_numa: false,
            icache: false,
            promoted: false,
            lib_path: None,
        }
    }
}

pub fn output_file(dataset: &str, cores: usize) -> String {
    format!("{}_{}cores_out_file", dataset, cores)
}

pub fn suffixed_binary(bench: &Benchmark, suffix: &str) -> String {
    format!("{}.{}", bench.binary, suffix)
}

// ---------------------------------------------------------------------------
// MAKE FLAGS
// ---------------------------------------------------------------------------

fn v2_scheduler_flag(s: Scheduler) -> Option<&'static str> {
    match s {
        Scheduler::Pbbs => None,
        Scheduler::Prc => Some("PRC=1"),
        Scheduler::Prl => Some("PRL=1"),
        Scheduler::PrcPrl => Some("PRCPRL=1"),
        Scheduler::DelegatePrc => Some("DELEGATEPRC=1"),
        Scheduler::DelegatePrcPrl => Some("DELEGATEPRCPRL=1"),
        Scheduler::OpenCilkDefaultFine => Some("OPENCILKDEFAULT_FINE=1"),
    }
}

fn v2_build(cfg: &Configuration) -> String {
    let mut knobs: Vec<&str> = Vec::new();
    knobs.extend(v2_scheduler_flag(cfg.scheduler));
    if cfg.noopt {
        knobs.push("NOOPT=1");
    }
    if cfg.fine_grain {
        knobs.push("GRAINSIZE8=1");
    }
    let knobs = knobs.join(" ");
    let with = |flag: &str| {
        if knobs.is_empty() {
            format!("{} make", flag)
        } else {
            format!("{} {} make", knobs, flag)
        }
    };
    match cfg.lowering {
        Lowering::Serial => "SEQUENTIAL=1 make".to_string(),
        Lowering::LazyD2 => with("POLL2=1"),
        Lowering::Nopoll => with("NOPOLL=1"),
        Lowering::Sigusr => "TAPIR=1 GCILK11=1 make SIGUSR=1".to_string(),
        Lowering::Uipi => "UIPI=1 make".to_string(),
        Lowering::LazyD0 => with("POLL0=1"),
        Lowering::OpenCilk => with("OPENCILK=1"),
    }
}

fn v1_build(lowering: Lowering) -> String {
    let target = match lowering {
        Lowering::Serial => " SERIAL=1",
        Lowering::LazyD2 => " LAZYD=1",
        Lowering::Nopoll => " EAGERD=1",
        Lowering::Sigusr => " SIGUSR=1",
        Lowering::Uipi => " UIPI=1",
        Lowering::LazyD0 => " ULI=1",
        Lowering::OpenCilk => "",
    };
    format!("TAPIR=1 GCILK11=1 make{}", target)
}

fn cilk5_flag(lowering: Lowering) -> &'static str {
    match lowering {
        Lowering::Serial => "-s",
        Lowering::LazyD2 => "-lf",
        Lowering::Nopoll => "-ef",
        Lowering::Sigusr => "-sf",
        Lowering::Uipi => "-uif",
        Lowering::LazyD0 => "-uf",
        Lowering::OpenCilk => "-t",
    }
}

// ---------------------------------------------------------------------------
// CAPABILITIES
// ---------------------------------------------------------------------------

impl Family {
    pub fn timing_marker(self) -> &'static str {
        match self {
            Self::Cilk5 | Self::Pbbs => "PBBS-time",
            Self::PbbsV2 => "Parlay time",
        }
    }

    // DIRECTORY THE BINARY IS BUILT IN AND RUN FROM
    pub fn bench_dir(self, bench: &Benchmark, workdir: &Path) -> PathBuf {
        match self {
            Self::Cilk5 => workdir.join(self.tag()),
            Self::Pbbs | Self::PbbsV2 => workdir.join(self.tag()).join(&bench.path),
        }
    }

    pub fn data_dir(self, bench: &Benchmark, workdir: &Path) -> Option<PathBuf> {
        match self {
            Self::Cilk5 => None,
            Self::Pbbs | Self::PbbsV2 => Some(
                self.bench_dir(bench, workdir)
                    .join("..")
                    .join(&bench.data_dir)
                    .join("data"),
            ),
        }
    }

    // None: THE DATASET IS AN ARGUMENT, NOT A FILE
    pub fn dataset_path(self, bench: &Benchmark, workdir: &Path, dataset: &str) -> Option<PathBuf> {
        self.data_dir(bench, workdir).map(|d| d.join(dataset))
    }

    pub fn compile(
        self,
        bench: &Benchmark,
        cfg: &Configuration,
        opts: &RunOptions,
    ) -> ShellCommand {
        let suffix = cfg.suffix();
        let bin = suffixed_binary(bench, &suffix);
        match self {
            Self::Cilk5 => {
                let line = format!(
                    "bash ./testCilk.sh {} -x=0 -w=0 {} && cp {tag}/{b} {tag}/{bin}",
                    cilk5_flag(cfg.lowering),
                    bench.path,
                    tag = self.tag(),
                    b = bench.binary,
                    bin = bin,
                );
                ShellCommand::new(line, &opts.workdir)
            }
            Self::Pbbs | Self::PbbsV2 => {
                let build =
                    if self == Self::PbbsV2 { v2_build(cfg) } else { v1_build(cfg.lowering) };
                let line = format!("make clean && {} && cp {} {}", build, bench.binary, bin);
                ShellCommand::new(line, self.bench_dir(bench, &opts.workdir))
            }
        }
    }

    pub fn run(
        self,
        bench: &Benchmark,
        cfg: &Configuration,
        cores: usize,
        dataset: &str,
        opts: &RunOptions,
    ) -> ShellCommand {
        let bin = suffixed_binary(bench, &cfg.suffix());
        let mut prefix = String::new();
        if !opts.disable_numa {
            prefix.push_str(NUMA_WRAPPER);
            prefix.push(' ');
        }
        if opts.icache {
            prefix.push_str(ICACHE_WRAPPER);
            prefix.push(' ');
        }

        let line = match self {
            Self::Cilk5 => format!("{}./{} {} {}", prefix, bin, dataset, opts.num_tests),
            Self::Pbbs | Self::PbbsV2 => {
                let out = output_file(dataset, cores);
                format!(
                    "touch {out} && {}./{} -o {out} -r {} ../{}/data/{}",
                    prefix,
                    bin,
                    opts.num_tests,
                    bench.data_dir,
                    dataset,
                    out = out,
                )
            }
        };

        let mut cmd = ShellCommand::new(line, self.bench_dir(bench, &opts.workdir))
            .env("NAIVE_MAPPING", "1")
            .env("CILK_NWORKERS", cores.to_string());
        if let Some(lib) = &opts.lib_path {
            cmd = cmd.env("LD_LIBRARY_PATH", lib.clone());
        }
        cmd
    }

    // None: FAMILY HAS NO CHECKER, VERIFICATION ALWAYS PASSES
    pub fn verify(
        self,
        bench: &Benchmark,
        cores: usize,
        dataset: &str,
        opts: &RunOptions,
    ) -> Option<ShellCommand> {
        let checker_dir = match self {
            Self::Cilk5 => return None,
            Self::Pbbs => "common",
            Self::PbbsV2 => "bench",
        };
        let bench_dir = self.bench_dir(bench, &opts.workdir);
        let data = self.dataset_path(bench, &opts.workdir, dataset)?;
        let out = bench_dir.join(output_file(dataset, cores));
        let line = format!("./{} {} {}", bench.check_binary, data.display(), out.display());
        let check_dir = bench_dir.join("..").join(checker_dir);
        Some(ShellCommand::new(line, check_dir).env("CILK_NWORKERS", "1"))
    }

    pub fn materialize(
        self,
        bench: &Benchmark,
        dataset: &str,
        opts: &RunOptions,
    ) -> Option<ShellCommand> {
        let dir = self.data_dir(bench, &opts.workdir)?;
        Some(ShellCommand::new(format!("make {}", dataset), dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn opts() -> RunOptions {
        RunOptions { workdir: PathBuf::from("/w"), num_tests: 3, ..RunOptions::default() }
    }

    #[test]
    fn v2_compile_carries_all_knobs() {
        let cfg = Configuration::new(Scheduler::DelegatePrcPrl, true, true, Lowering::LazyD0);
        let cmd = Family::PbbsV2.compile(&sort(), &cfg, &opts());
        assert_eq!(
            cmd.line,
            "make clean && DELEGATEPRCPRL=1 NOOPT=1 GRAINSIZE8=1 POLL0=1 make && cp sort sort.Enf0"
        );
        assert_eq!(cmd.dir, PathBuf::from("/w/pbbs_v2/comparisonSort/sampleSort"));
    }

    #[test]
    fn v2_baseline_compile() {
        let cmd = Family::PbbsV2.compile(&sort(), &Configuration::baseline(), &opts());
        assert_eq!(cmd.line, "make clean && OPENCILK=1 make && cp sort sort.Buco");
    }

    #[test]
    fn run_command_shape() {
        let cmd = Family::PbbsV2.run(&sort(), &Configuration::baseline(), 8, "rand_10M", &opts());
        assert_eq!(
            cmd.line,
            "touch rand_10M_8cores_out_file && numactl --interleave=all ./sort.Buco \
             -o rand_10M_8cores_out_file -r 3 ../sequenceData/data/rand_10M"
        );
        assert_eq!(cmd.env_value("CILK_NWORKERS"), Some("8"));
        assert_eq!(cmd.env_value("LD_LIBRARY_PATH"), None);
    }

    #[test]
    fn run_without_numa_with_icache_and_libpath() {
        let o = RunOptions {
            disable_numa: true,
            icache: true,
            lib_path: Some("/opt/cheetah/lib".into()),
            ..opts()
        };
        let cmd = Family::PbbsV2.run(&sort(), &Configuration::baseline(), 1, "rand_10M", &o);
        assert!(cmd.line.contains("&& perf stat -x, -e icache.misses,icache.hit -a ./sort.Buco"));
        assert!(!cmd.line.contains("numactl"));
        assert_eq!(cmd.env_value("LD_LIBRARY_PATH"), Some("/opt/cheetah/lib"));
    }

    #[test]
    fn verify_uses_family_checker_dir() {
        let cmd = Family::PbbsV2.verify(&sort(), 4, "rand_10M", &opts()).unwrap();
        assert_eq!(cmd.dir, PathBuf::from("/w/pbbs_v2/comparisonSort/sampleSort/../bench"));
        assert!(cmd.line.starts_with("./sortCheck "));
        assert!(cmd.line.ends_with("sampleSort/rand_10M_4cores_out_file"));
        assert_eq!(cmd.env_value("CILK_NWORKERS"), Some("1"));
    }

    #[test]
    fn cilk5_has_no_checker_or_datasets() {
        let fib = Benchmark {
            family: Family::Cilk5,
            path: "fib".into(),
            binary: "fib".into(),
            ..sort()
        };
        assert!(Family::Cilk5.verify(&fib, 1, "30", &opts()).is_none());
        assert!(Family::Cilk5.materialize(&fib, "30", &opts()).is_none());
        let run = Family::Cilk5.run(&fib, &Configuration::baseline(), 2, "30", &opts());
        assert_eq!(run.line, "numactl --interleave=all ./fib.Buco 30 3");
        assert_eq!(run.dir, PathBuf::from("/w/cilk5"));
    }
}

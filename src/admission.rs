// LAZYBENCH ADMISSION CONTROL
// A RUN ATTEMPT STARTS ONLY WHEN THE 1-MINUTE LOAD AVERAGE IS AT OR BELOW THE
// THRESHOLD. THE CONTROLLER SLEEPS BETWEEN POLLS WITH DOUBLING BACKOFF SO THE
// WAIT ITSELF DOES NOT ADD LOAD.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::tuning::{
    next_backoff, ADMISSION_LOG_EVERY, ADMISSION_POLL_MAX, ADMISSION_POLL_MIN,
    DEFAULT_LOAD_THRESHOLD,
};

pub trait LoadProbe {
    // (1, 5, 15)-MINUTE LOAD AVERAGES. None WHEN UNAVAILABLE.
    fn load(&mut self) -> Option<[f64; 3]>;
}

#[derive(Default)]
pub struct SystemLoad;

impl LoadProbe for SystemLoad {
    fn load(&mut self) -> Option<[f64; 3]> {
        let mut avg = [0f64; 3];
        let n = unsafe { libc::getloadavg(avg.as_mut_ptr(), 3) };
        if n == 3 {
            Some(avg)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Admission {
    Admitted { load1: f64, polls: u32 },
    // CEILING HIT: ADMITTED ANYWAY WITH A WARNING
    Forced { load1: f64, waited: Duration },
    // LOAD AVERAGE UNREADABLE: ADMITTED WITHOUT GATING
    Ungated,
    Cancelled,
}

impl Admission {
    pub fn may_run(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

#[derive(Clone, Debug)]
pub struct AdmissionGate {
    pub threshold: f64,
    pub poll_min: Duration,
    pub poll_max: Duration,
    pub max_wait: Option<Duration>,
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOAD_THRESHOLD,
            poll_min: ADMISSION_POLL_MIN,
            poll_max: ADMISSION_POLL_MAX,
            max_wait: None,
        }
    }
}

impl AdmissionGate {
    pub fn new(threshold: f64, max_wait: Option<Duration>) -> Self {
        Self { threshold, max_wait, ..Self::default() }
    }

    pub fn wait(&self, probe: &mut dyn LoadProbe, shutdown: &AtomicBool) -> Admission {
        let start = Instant::now();
        let mut backoff = Duration::ZERO;
        let mut polls = 0u32;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Admission::Cancelled;
            }
            let [load1, load5, load15] = match probe.load() {
                Some(l) => l,
                None => {
                    warn!("LOAD AVERAGE UNAVAILABLE -- ADMITTING WITHOUT GATE");
                    return Admission::Ungated;
                }
            };
            if load1 <= self.threshold {
                debug!(
                    "LOAD AVERAGE: 1M {:.2}  5M {:.2}  15M {:.2} (ADMITTED AFTER {} POLLS)",
                    load1, load5, load15, polls
                );
                return Admission::Admitted { load1, polls };
            }
            let waited = start.elapsed();
            if let Some(ceiling) = self.max_wait {
                if waited >= ceiling {
                    warn!(
                        "LOAD {:.2} STILL ABOVE {:.2} AFTER {:?} -- ADMITTING",
                        load1, self.threshold, waited
                    );
                    return Admission::Forced { load1, waited };
                }
            }
            if polls % ADMISSION_LOG_EVERY == 0 {
                info!("WAITING FOR LOAD AVERAGE {:.2} TO DROP BELOW {:.2}", load1, self.threshold);
            }
            polls += 1;
            backoff = next_backoff(backoff, self.poll_min, self.poll_max);
            let mut nap = backoff;
            if let Some(ceiling) = self.max_wait {
                nap = nap.min(ceiling.saturating_sub(waited));
            }
            std::thread::sleep(nap);
        }
    }
}

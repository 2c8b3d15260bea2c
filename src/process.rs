// LAZYBENCH EXTERNAL COMMANDS
// EVERY BENCHMARK STEP IS A `sh -c` LINE IN ITS OWN PROCESS GROUP.
// ON TIMEOUT OR INTERRUPT THE WHOLE GROUP IS SIGKILLED AND ITS OUTPUT DISCARDED.
// ON A NORMAL EXIT LEFTOVER GROUP MEMBERS ARE KILLED BEFORE THE PIPES ARE DRAINED.

use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::{Error, Result};
use crate::tuning::{CHILD_POLL, DRAIN_GRACE};

#[derive(Clone, Debug, PartialEq)]
pub struct ShellCommand {
    pub line: String,
    pub dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl ShellCommand {
    pub fn new(line: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self { line: line.into(), dir: dir.into(), env: Vec::new() }
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    // FOR LOGS: ENV PREFIX + LINE, AS IT WOULD BE TYPED
    pub fn display(&self) -> String {
        let mut s = format!("cd {} &&", self.dir.display());
        for (k, v) in &self.env {
            s.push_str(&format!(" {}={}", k, v));
        }
        s.push(' ');
        s.push_str(&self.line);
        s
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProcessOutcome {
    Exited { code: Option<i32>, stdout: String, stderr: String },
    TimedOut,
    // SHUTDOWN REQUESTED WHILE THE COMMAND WAS RUNNING
    Interrupted,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited { code: Some(0), .. })
    }

    // STDOUT FOLLOWED BY STDERR. EMPTY FOR A TIMEOUT OR INTERRUPT.
    pub fn combined(&self) -> String {
        match self {
            Self::Exited { stdout, stderr, .. } => {
                let mut s = String::with_capacity(stdout.len() + stderr.len() + 1);
                s.push_str(stdout);
                if !stdout.is_empty() && !stdout.ends_with('\n') && !stderr.is_empty() {
                    s.push('\n');
                }
                s.push_str(stderr);
                s
            }
            Self::TimedOut | Self::Interrupted => String::new(),
        }
    }
}

pub trait Shell {
    fn run(&mut self, cmd: &ShellCommand, timeout: Duration) -> Result<ProcessOutcome>;
}

// ---------------------------------------------------------------------------
// PROCESS GROUP GUARD
// ---------------------------------------------------------------------------

// KILLS THE GROUP IF DROPPED WHILE THE CHILD IS STILL OWNED
struct ProcGuard {
    child: Option<Child>,
    pgid: i32,
}

impl ProcGuard {
    fn new(child: Child) -> Self {
        let pgid = child.id() as i32;
        Self { child: Some(child), pgid }
    }

    // POLL UNTIL EXIT, DEADLINE OR INTERRUPT
    fn wait_until(
        &mut self,
        deadline: Instant,
        interrupt: Option<&AtomicBool>,
    ) -> std::io::Result<Wait> {
        let child = match self.child.as_mut() {
            Some(c) => c,
            None => return Ok(Wait::Deadline),
        };
        loop {
            if let Some(status) = child.try_wait()? {
                self.child = None;
                return Ok(Wait::Exited(status));
            }
            if interrupt.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Ok(Wait::Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Wait::Deadline);
            }
            std::thread::sleep(CHILD_POLL.min(deadline - now));
        }
    }

    // BACKGROUND DESCENDANTS OUTLIVE sh AND HOLD THE PIPES OPEN
    fn kill_stragglers(&self) {
        // ESRCH WHEN THE GROUP IS ALREADY EMPTY
        unsafe {
            libc::killpg(self.pgid, libc::SIGKILL);
        }
    }

    fn kill(&mut self) {
        let child = match self.child.as_mut() {
            Some(c) => c,
            None => return,
        };
        unsafe {
            libc::killpg(self.pgid, libc::SIGKILL);
        }
        let _ = child.kill();
        let _ = child.wait();
        self.child = None;
    }
}

enum Wait {
    Exited(ExitStatus),
    Deadline,
    Interrupted,
}

impl Drop for ProcGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut p| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = p.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

// A READER STILL BLOCKED AT THE DEADLINE IS LEFT DETACHED
fn collect(handle: Option<JoinHandle<String>>, deadline: Instant) -> String {
    let handle = match handle {
        Some(h) => h,
        None => return String::new(),
    };
    while !handle.is_finished() {
        let now = Instant::now();
        if now >= deadline {
            warn!("OUTPUT PIPE STILL OPEN AFTER EXIT -- DROPPING ITS OUTPUT");
            return String::new();
        }
        std::thread::sleep(CHILD_POLL.min(deadline - now));
    }
    handle.join().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// SYSTEM SHELL
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SystemShell {
    interrupt: Option<&'static AtomicBool>,
}

impl SystemShell {
    pub fn new() -> Self {
        Self::default()
    }

    // KILL THE RUNNING GROUP AS SOON AS `flag` IS SET
    pub fn interruptible(flag: &'static AtomicBool) -> Self {
        Self { interrupt: Some(flag) }
    }
}

impl Shell for SystemShell {
    fn run(&mut self, cmd: &ShellCommand, timeout: Duration) -> Result<ProcessOutcome> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&cmd.line)
            .current_dir(&cmd.dir)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn { command: cmd.display(), source })?;

        let out = drain(child.stdout.take());
        let err = drain(child.stderr.take());
        let mut guard = ProcGuard::new(child);
        let deadline = Instant::now() + timeout;

        match guard.wait_until(deadline, self.interrupt)? {
            Wait::Exited(status) => {
                guard.kill_stragglers();
                let drain_by = deadline.max(Instant::now() + DRAIN_GRACE);
                Ok(ProcessOutcome::Exited {
                    code: status.code(),
                    stdout: collect(out, drain_by),
                    stderr: collect(err, drain_by),
                })
            }
            Wait::Deadline => {
                warn!("TIMED OUT AFTER {:?}: {}", timeout, cmd.display());
                guard.kill();
                // READERS SEE EOF ONCE THE GROUP IS GONE. OUTPUT IS NOT TRUSTED.
                let drain_by = Instant::now() + DRAIN_GRACE;
                let _ = collect(out, drain_by);
                let _ = collect(err, drain_by);
                Ok(ProcessOutcome::TimedOut)
            }
            Wait::Interrupted => {
                warn!("INTERRUPTED: {}", cmd.display());
                guard.kill();
                let drain_by = Instant::now() + DRAIN_GRACE;
                let _ = collect(out, drain_by);
                let _ = collect(err, drain_by);
                Ok(ProcessOutcome::Interrupted)
            }
        }
    }
}

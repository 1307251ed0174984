//! Experiment Runner - sequential, timed execution of external inference runs
//!
//! Each experiment is one blocking child process. Failures of any kind are
//! captured in the returned [`ExperimentResult`]; the runner never aborts the
//! registry loop.

use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::command::InvocationCommand;
use super::registry::Registry;
use super::result::{ExperimentOutcome, ExperimentResult};
use super::spec::ExperimentSpec;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Extra time allowed for pipe readers once the outcome is known.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Fixed prefix of every invocation: interpreter, entry script, optional timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    interpreter: PathBuf,
    entry_script: String,
    timeout: Option<Duration>,
}

impl Launcher {
    /// Create a launcher without a timeout.
    #[must_use]
    pub fn new(interpreter: impl Into<PathBuf>, entry_script: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            entry_script: entry_script.into(),
            timeout: None,
        }
    }

    /// Kill and classify as [`ExperimentOutcome::Timeout`] any run exceeding `limit`.
    #[must_use]
    pub const fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Get the interpreter path.
    #[must_use]
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Get the entry script.
    #[must_use]
    pub fn entry_script(&self) -> &str {
        &self.entry_script
    }

    /// Get the per-experiment timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Build the full command for a spec.
    #[must_use]
    pub fn command_for(&self, spec: &ExperimentSpec) -> InvocationCommand {
        InvocationCommand::for_spec(&self.interpreter, &self.entry_script, spec)
    }
}

enum Waited {
    Exited(ExitStatus),
    TimedOut(Duration),
}

/// Runs experiments one at a time, in registry order.
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    launcher: Launcher,
}

impl ExperimentRunner {
    /// Create a runner for the given launcher.
    #[must_use]
    pub const fn new(launcher: Launcher) -> Self {
        Self { launcher }
    }

    /// Get the launcher.
    #[must_use]
    pub const fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    /// Run every experiment in `registry`, returning one result per spec.
    ///
    /// Each experiment is attempted exactly once, even if earlier ones failed.
    #[must_use]
    pub fn run_all(&self, registry: &Registry) -> Vec<ExperimentResult> {
        registry.iter().map(|spec| self.run_one(spec)).collect()
    }

    /// Run a single experiment and classify its outcome.
    #[must_use]
    pub fn run_one(&self, spec: &ExperimentSpec) -> ExperimentResult {
        let name = spec.name();
        let command = self.launcher.command_for(spec);

        info!("{}", "=".repeat(80));
        let started_at = Utc::now();
        info!(experiment = name, started_at = %started_at.to_rfc3339(), "Running experiment");
        info!(command = %command, "Command");
        debug!(args = ?command.args(), "Argument vector");

        let start = Instant::now();

        let child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                let elapsed = start.elapsed().as_secs_f64();
                warn!(experiment = name, error = %e, "FAILED to launch");
                return ExperimentResult::new(
                    name,
                    ExperimentOutcome::LaunchFailure {
                        message: e.to_string(),
                    },
                    elapsed,
                )
                .with_started_at(started_at);
            }
        };

        let (waited, elapsed, stdout, stderr) =
            match wait_capturing(child, start, self.launcher.timeout) {
                Ok(captured) => captured,
                Err(e) => {
                    warn!(experiment = name, error = %e, "Lost track of child process");
                    return ExperimentResult::new(
                        name,
                        ExperimentOutcome::LaunchFailure {
                            message: format!("failed to wait for process: {e}"),
                        },
                        start.elapsed().as_secs_f64(),
                    )
                    .with_started_at(started_at);
                }
            };

        let outcome = match waited {
            Waited::Exited(status) if status.success() => ExperimentOutcome::Success,
            Waited::Exited(status) => ExperimentOutcome::ExecutionFailure {
                code: status.code(),
            },
            Waited::TimedOut(limit) => ExperimentOutcome::Timeout { limit },
        };

        if outcome.is_success() {
            info!(experiment = name, seconds = elapsed, "finished successfully");
        } else {
            warn!(
                experiment = name,
                error = %outcome.error_text(),
                seconds = elapsed,
                "FAILED"
            );
            warn!(experiment = name, "---- STDOUT ----\n{stdout}");
            warn!(experiment = name, "---- STDERR ----\n{stderr}");
        }

        ExperimentResult::new(name, outcome, elapsed)
            .with_output(stdout, stderr)
            .with_started_at(started_at)
    }
}

/// Output gathered from one pipe by a background reader.
struct StreamCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl StreamCapture {
    fn spawn<R: Read + Send + 'static>(mut stream: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            let mut chunk = [0_u8; 8192];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buf, handle }
    }

    /// Wait for end-of-stream until `deadline`, then return what has been
    /// read. A grandchild holding the pipe open past the deadline leaves the
    /// reader detached.
    fn collect(self, deadline: Instant) -> String {
        while !self.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        if self.handle.is_finished() {
            let _ = self.handle.join();
        }
        let bytes = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn collect_stream(capture: Option<StreamCapture>, deadline: Instant) -> String {
    capture.map(|c| c.collect(deadline)).unwrap_or_default()
}

/// Wait for `child`, draining both pipes so a chatty process cannot block.
///
/// Returns the seconds elapsed since `start` at the moment the outcome was
/// decided. Pipe draining stops `DRAIN_GRACE` after the outcome, so a
/// grandchild that inherited the pipes cannot stall the run.
fn wait_capturing(
    mut child: Child,
    start: Instant,
    timeout: Option<Duration>,
) -> io::Result<(Waited, f64, String, String)> {
    let stdout = child.stdout.take().map(StreamCapture::spawn);
    let stderr = child.stderr.take().map(StreamCapture::spawn);

    let (waited, drain_deadline) = match timeout {
        None => {
            let status = child.wait()?;
            (Waited::Exited(status), Instant::now() + DRAIN_GRACE)
        }
        Some(limit) => {
            let deadline = start + limit;
            loop {
                if let Some(status) = child.try_wait()? {
                    break (Waited::Exited(status), Instant::now() + DRAIN_GRACE);
                }
                if Instant::now() >= deadline {
                    // already-exited children make kill fail; the wait below reaps either way
                    let _ = child.kill();
                    child.wait()?;
                    break (Waited::TimedOut(limit), Instant::now() + DRAIN_GRACE);
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    Ok((
        waited,
        elapsed,
        collect_stream(stdout, drain_deadline),
        collect_stream(stderr, drain_deadline),
    ))
}

/// Render the post-run console summary, one line per result.
///
/// ```text
/// kitti_pointpillars_000123       OK    12.34 s
/// kitti_3dssd_000123              FAIL  0.51 s  returncode=1
/// ```
#[must_use]
pub fn render_run_summary(results: &[ExperimentResult]) -> String {
    let mut out = String::new();
    for r in results {
        let status = if r.success() { "OK" } else { "FAIL" };
        let _ = writeln!(
            out,
            "{:<30}  {:<4}  {:.2} s  {}",
            r.name(),
            status,
            r.seconds(),
            r.error()
        );
    }
    out
}

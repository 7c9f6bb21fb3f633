//! Encoder process supervision
//!
//! A [`ProcessSupervisor`] runs one encoder process from spawn to terminal
//! outcome:
//!
//! ```text
//! Idle -> Starting -> Running -> Succeeded | Failed | Cancelled
//! ```
//!
//! The process is driven on a tokio task. Its stderr is decoded line by line;
//! status lines become `ProgressEvent`s, everything else feeds a bounded
//! diagnostic tail used in failure reports.

use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::model::{FailureKind, Job, JobOutcome};
use crate::engine::diagnostics::{DiagnosticTail, LineDecoder};
use crate::engine::progress::{parse_progress_line, ProgressSink, ProgressTracker};
use crate::error::{CutterError, CutterResult};

const READ_CHUNK: usize = 4096;

/// Lifecycle state of a supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Idle,
    Starting,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl SupervisorState {
    fn of(outcome: &JobOutcome) -> Self {
        match outcome {
            JobOutcome::Succeeded { .. } => SupervisorState::Succeeded,
            JobOutcome::Failed { .. } => SupervisorState::Failed,
            JobOutcome::Cancelled => SupervisorState::Cancelled,
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Succeeded => "succeeded",
            SupervisorState::Failed => "failed",
            SupervisorState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Supervisor tuning
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Wait after the stop request before killing the process
    pub grace_period: Duration,
    /// Diagnostic lines kept for failure reports
    pub diagnostic_tail_lines: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            diagnostic_tail_lines: 20,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: SupervisorState,
    cancel_requested: bool,
    cancel_tx: Option<watch::Sender<bool>>,
    outcome: Option<JobOutcome>,
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State stays consistent across a panic elsewhere; keep going
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Back to `Idle` after a failed launch
    fn reset(&self) {
        let mut inner = self.lock();
        inner.state = SupervisorState::Idle;
        inner.cancel_tx = None;
        inner.cancel_requested = false;
    }

    /// Record the terminal outcome and hand it to `sink`, once per run
    ///
    /// Returns the outcome that was recorded first.
    fn conclude(&self, outcome: JobOutcome, sink: &dyn ProgressSink) -> JobOutcome {
        {
            let mut inner = self.lock();
            if let Some(recorded) = &inner.outcome {
                return recorded.clone();
            }
            inner.outcome = Some(outcome.clone());
            inner.state = SupervisorState::of(&outcome);
            inner.cancel_tx = None;
        }
        sink.on_outcome(&outcome);
        outcome
    }
}

/// Runs a single encoder process
///
/// Clones share the same run, so one clone can `cancel` while another owns
/// the [`RunHandle`]. A supervisor runs at most once; create a new one per job.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    program: PathBuf,
    leading_args: Vec<String>,
    config: SupervisorConfig,
    shared: Arc<Shared>,
}

impl ProcessSupervisor {
    pub fn new(program: impl Into<PathBuf>, config: SupervisorConfig) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: SupervisorState::Idle,
                    cancel_requested: false,
                    cancel_tx: None,
                    outcome: None,
                }),
            }),
        }
    }

    /// Arguments placed before every job argument list
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.shared.lock().state
    }

    /// Spawn the encoder with `args` and start supervising it
    ///
    /// Must be called inside a tokio runtime. Fails with `Launch` (state back
    /// to `Idle`) when the process cannot be spawned.
    pub fn start(
        &self,
        job: Arc<Job>,
        args: Vec<String>,
        sink: Arc<dyn ProgressSink>,
    ) -> CutterResult<RunHandle> {
        {
            let mut inner = self.shared.lock();
            match inner.state {
                SupervisorState::Idle => inner.state = SupervisorState::Starting,
                SupervisorState::Starting | SupervisorState::Running => {
                    return Err(CutterError::AlreadyRunning)
                }
                state => {
                    return Err(CutterError::AlreadyTerminal {
                        state: state.to_string(),
                    })
                }
            }
        }

        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.shared.reset();
                error!(program = %self.program.display(), error = %e, "Failed to launch encoder");
                return Err(CutterError::Launch {
                    message: format!("{}: {}", self.program.display(), e),
                });
            }
        };

        let Some(stderr) = child.stderr.take() else {
            let _ = child.start_kill();
            self.shared.reset();
            return Err(CutterError::Launch {
                message: "encoder diagnostic stream is not available".to_string(),
            });
        };
        let stdin = child.stdin.take();

        let cancel_rx = {
            let mut inner = self.shared.lock();
            let (tx, rx) = watch::channel(inner.cancel_requested);
            inner.cancel_tx = Some(tx);
            inner.state = SupervisorState::Running;
            rx
        };

        info!(
            pid = ?child.id(),
            input = %job.input().display(),
            output = %job.output().display(),
            start = %job.start(),
            end = %job.end(),
            "Encoder running"
        );
        debug!(program = %self.program.display(), args = ?args, "Encoder command");

        let run = Run {
            child,
            stdin,
            stderr,
            cancel_rx,
            job,
            sink: Arc::clone(&sink),
            shared: Arc::clone(&self.shared),
            config: self.config.clone(),
        };
        let task = tokio::spawn(run.drive());

        Ok(RunHandle {
            task,
            sink,
            supervisor: self.clone(),
        })
    }

    /// Request graceful termination of the running process
    ///
    /// Safe from any task. Repeated calls while running are accepted.
    pub fn cancel(&self) -> CutterResult<()> {
        let mut inner = self.shared.lock();
        match inner.state {
            SupervisorState::Idle => Err(CutterError::NotRunning),
            SupervisorState::Starting | SupervisorState::Running => {
                inner.cancel_requested = true;
                if let Some(tx) = &inner.cancel_tx {
                    let _ = tx.send(true);
                }
                info!("Cancellation requested");
                Ok(())
            }
            state => Err(CutterError::AlreadyTerminal {
                state: state.to_string(),
            }),
        }
    }
}

/// Handle to a started run
pub struct RunHandle {
    task: JoinHandle<JobOutcome>,
    sink: Arc<dyn ProgressSink>,
    supervisor: ProcessSupervisor,
}

impl fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunHandle")
            .field("task", &self.task)
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

impl RunHandle {
    pub fn cancel(&self) -> CutterResult<()> {
        self.supervisor.cancel()
    }

    pub fn state(&self) -> SupervisorState {
        self.supervisor.state()
    }

    /// Wait for the terminal outcome
    ///
    /// If the worker task dies first, the run ends as `Failed(Interrupted)`
    /// and the sink still receives exactly one outcome.
    pub async fn wait(self) -> CutterResult<JobOutcome> {
        match self.task.await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(error = %e, "Supervisor task ended abnormally");
                let outcome = JobOutcome::Failed {
                    failure: FailureKind::Interrupted {
                        message: e.to_string(),
                    },
                    diagnostics: String::new(),
                };
                Ok(self.supervisor.shared.conclude(outcome, self.sink.as_ref()))
            }
        }
    }
}

/// Everything the worker task owns for one run
struct Run {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: ChildStderr,
    cancel_rx: watch::Receiver<bool>,
    job: Arc<Job>,
    sink: Arc<dyn ProgressSink>,
    shared: Arc<Shared>,
    config: SupervisorConfig,
}

impl Run {
    async fn drive(mut self) -> JobOutcome {
        let mut decoder = LineDecoder::new();
        let mut tail = DiagnosticTail::new(self.config.diagnostic_tail_lines);
        let mut tracker = ProgressTracker::new(self.job.output_duration());
        let mut buf = vec![0u8; READ_CHUNK];
        let mut stderr_open = true;
        let mut cancel_live = true;
        let mut cancelled = *self.cancel_rx.borrow_and_update();

        let exit = loop {
            if cancelled {
                break None;
            }
            tokio::select! {
                biased;
                changed = self.cancel_rx.changed(), if cancel_live => match changed {
                    Ok(()) => cancelled = *self.cancel_rx.borrow_and_update(),
                    Err(_) => cancel_live = false,
                },
                read = self.stderr.read(&mut buf), if stderr_open => match read {
                    Ok(0) => {
                        stderr_open = false;
                        if let Some(line) = decoder.finish() {
                            self.handle_line(line, &mut tracker, &mut tail);
                        }
                    }
                    Ok(n) => {
                        for line in decoder.push(&buf[..n]) {
                            self.handle_line(line, &mut tracker, &mut tail);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Lost encoder diagnostic stream");
                        stderr_open = false;
                    }
                },
                status = self.child.wait(), if !stderr_open => break Some(status),
            }
        };

        let outcome = match exit {
            None => {
                self.stop_gracefully(&mut buf, stderr_open).await;
                info!(output = %self.job.output().display(), "Encoder cancelled, partial output kept");
                JobOutcome::Cancelled
            }
            Some(Ok(status)) => self.judge(status, &tail).await,
            Some(Err(e)) => {
                error!(error = %e, "Failed to collect encoder exit status");
                tail.push(format!("wait failed: {}", e));
                JobOutcome::Failed {
                    failure: FailureKind::NonZeroExit { code: None },
                    diagnostics: tail.text(),
                }
            }
        };

        self.shared.conclude(outcome, self.sink.as_ref())
    }

    fn handle_line(&self, line: String, tracker: &mut ProgressTracker, tail: &mut DiagnosticTail) {
        match parse_progress_line(&line) {
            Some(marker) => {
                if *self.cancel_rx.borrow() {
                    return;
                }
                if let Some(event) = tracker.observe(marker) {
                    self.sink.on_progress(&event);
                }
            }
            None => {
                debug!(target: "videocutter::encoder", "{}", line);
                tail.push(line);
            }
        }
    }

    /// Send `q`, close stdin, then kill after the grace period
    async fn stop_gracefully(&mut self, buf: &mut [u8], mut stderr_open: bool) {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.write_all(b"q").await;
            let _ = stdin.shutdown().await;
        }

        let child = &mut self.child;
        let stderr = &mut self.stderr;
        let exited = tokio::time::timeout(self.config.grace_period, async {
            loop {
                tokio::select! {
                    status = child.wait() => break status,
                    read = stderr.read(buf), if stderr_open => {
                        if !matches!(read, Ok(n) if n > 0) {
                            stderr_open = false;
                        }
                    }
                }
            }
        })
        .await;

        if exited.is_err() {
            warn!(grace = ?self.config.grace_period, "Encoder ignored stop request, killing");
            if let Err(e) = self.child.kill().await {
                warn!(error = %e, "Failed to kill encoder");
            }
        }
    }

    async fn judge(&self, status: ExitStatus, tail: &DiagnosticTail) -> JobOutcome {
        if !status.success() {
            error!(status = %status, "Encoder failed");
            return JobOutcome::Failed {
                failure: FailureKind::NonZeroExit {
                    code: status.code(),
                },
                diagnostics: tail.text(),
            };
        }

        let output = self.job.output();
        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => {
                info!(output = %output.display(), bytes = meta.len(), "Encoder finished");
                JobOutcome::Succeeded {
                    output: output.to_path_buf(),
                }
            }
            _ => {
                error!(output = %output.display(), "Encoder exited cleanly but output is missing or empty");
                JobOutcome::Failed {
                    failure: FailureKind::IncompleteOutput,
                    diagnostics: tail.text(),
                }
            }
        }
    }
}

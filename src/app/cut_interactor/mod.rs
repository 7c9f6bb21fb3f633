// Cut interactor - Orchestrates the probe, job, command and encoder steps of a cut

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::app::probe_with_retry;
use crate::app::report::RunReport;
use crate::domain::model::{FilterOp, Job, MediaInfo, Overlay, SubtitleSpec, DEFAULT_PROFILE};
use crate::domain::timecode::Timecode;
use crate::engine::{ProcessSupervisor, ProgressSink, RunHandle, SupervisorConfig};
use crate::error::{CutterError, CutterResult};
use crate::planner::CommandBuilder;
use crate::ports::ProbePort;
use crate::utils::path::default_output_path;

/// What the user asked to cut
///
/// Timecodes stay as text until the interactor parses them, so the
/// `MM:SS` and plain-seconds forms are accepted here.
#[derive(Debug, Clone)]
pub struct CutRequest {
    pub input: PathBuf,
    /// Generated next to the input when absent
    pub output: Option<PathBuf>,
    pub start: String,
    pub end: String,
    pub profile: String,
    pub filters: Vec<FilterOp>,
    pub overlays: Vec<Overlay>,
    pub subtitles: Option<SubtitleSpec>,
    pub speed: f64,
    pub strip_audio: bool,
}

impl CutRequest {
    pub fn new(input: impl Into<PathBuf>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: None,
            start: start.into(),
            end: end.into(),
            profile: DEFAULT_PROFILE.to_string(),
            filters: Vec::new(),
            overlays: Vec::new(),
            subtitles: None,
            speed: 1.0,
            strip_audio: false,
        }
    }
}

/// A validated job with its encoder arguments, ready to launch
#[derive(Debug, Clone)]
pub struct PreparedCut {
    pub job: Arc<Job>,
    pub media: MediaInfo,
    pub args: Vec<String>,
}

/// Which encoder to run and how to supervise it
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub program: PathBuf,
    /// Placed before the job's arguments (wrappers such as `nice -n 10`)
    pub leading_args: Vec<String>,
    pub supervisor: SupervisorConfig,
}

impl EncoderSettings {
    pub fn new(program: impl Into<PathBuf>, supervisor: SupervisorConfig) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            supervisor,
        }
    }
}

/// Interactor for the cut use case
pub struct CutInteractor {
    probe_port: Arc<dyn ProbePort>,
    command_builder: Arc<CommandBuilder>,
    encoder: EncoderSettings,
}

impl CutInteractor {
    /// Create new cut interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        command_builder: Arc<CommandBuilder>,
        encoder: EncoderSettings,
    ) -> Self {
        Self {
            probe_port,
            command_builder,
            encoder,
        }
    }

    /// Parse, probe and validate the request, then build the encoder arguments
    pub async fn prepare(&self, request: CutRequest) -> CutterResult<PreparedCut> {
        let start = Timecode::parse_lenient(&request.start)?;
        let end = Timecode::parse_lenient(&request.end)?;

        match tokio::fs::metadata(&request.input).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                return Err(CutterError::invalid_job(format!(
                    "input file does not exist: {}",
                    request.input.display()
                )))
            }
        }

        let media = probe_with_retry(self.probe_port.as_ref(), &request.input).await?;
        let output = request
            .output
            .unwrap_or_else(|| default_output_path(&request.input, start, end));

        let mut builder = Job::builder(request.input, output, start, end)
            .profile(request.profile)
            .speed(request.speed)
            .with_media_info(&media);
        for op in request.filters {
            builder = builder.filter(op);
        }
        for overlay in request.overlays {
            builder = builder.overlay(overlay);
        }
        if let Some(spec) = request.subtitles {
            builder = builder.subtitles(spec);
        }
        if request.strip_audio || !media.has_audio() {
            if !request.strip_audio {
                debug!("Source has no audio stream, encoding video only");
            }
            builder = builder.strip_audio();
        }

        let job = builder.build()?;
        let args = self.command_builder.build_arguments(&job)?;
        info!(
            input = %job.input().display(),
            output = %job.output().display(),
            start = %job.start(),
            end = %job.end(),
            profile = job.profile(),
            "Cut prepared"
        );

        Ok(PreparedCut {
            job: Arc::new(job),
            media,
            args,
        })
    }

    /// Start the encoder for a prepared cut on a fresh supervisor
    pub fn launch(&self, prepared: PreparedCut, sink: Arc<dyn ProgressSink>) -> CutterResult<CutRun> {
        let supervisor = ProcessSupervisor::new(&self.encoder.program, self.encoder.supervisor.clone())
            .with_leading_args(self.encoder.leading_args.iter().cloned());
        let started_at = Utc::now();
        let handle = supervisor.start(Arc::clone(&prepared.job), prepared.args, sink)?;
        Ok(CutRun {
            job: prepared.job,
            supervisor,
            handle,
            started_at,
        })
    }

    /// Prepare and launch in one step
    pub async fn execute(&self, request: CutRequest, sink: Arc<dyn ProgressSink>) -> CutterResult<CutRun> {
        let prepared = self.prepare(request).await?;
        self.launch(prepared, sink)
    }
}

/// A cut whose encoder is running
#[derive(Debug)]
pub struct CutRun {
    job: Arc<Job>,
    supervisor: ProcessSupervisor,
    handle: RunHandle,
    started_at: DateTime<Utc>,
}

impl CutRun {
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Supervisor clone that can cancel this run from another task
    pub fn canceller(&self) -> ProcessSupervisor {
        self.supervisor.clone()
    }

    pub fn cancel(&self) -> CutterResult<()> {
        self.handle.cancel()
    }

    /// Wait for the encoder and summarise the run
    pub async fn finish(self) -> CutterResult<RunReport> {
        let outcome = self.handle.wait().await?;
        let report = RunReport::new(&self.job, outcome, self.started_at, Utc::now());
        info!(elapsed_ms = report.elapsed_ms, success = report.is_success(), "Cut finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests;

// Run report - Summary of a finished cut

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::model::{Job, JobOutcome};
use crate::domain::timecode::Timecode;
use crate::utils::format_duration;

/// What was asked for, what happened, and when
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start: Timecode,
    pub end: Timecode,
    pub profile: String,
    pub speed: f64,
    /// Length of the produced clip after speed adjustment
    pub clip_duration: Timecode,
    pub outcome: JobOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl RunReport {
    pub fn new(
        job: &Job,
        outcome: JobOutcome,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            input: job.input().to_path_buf(),
            output: job.output().to_path_buf(),
            start: job.start(),
            end: job.end(),
            profile: job.profile().to_string(),
            speed: job.speed(),
            clip_duration: job.output_duration(),
            outcome,
            started_at,
            finished_at,
            elapsed_ms: (finished_at - started_at).num_milliseconds().max(0),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        let took = format_duration(Duration::from_millis(u64::try_from(self.elapsed_ms).unwrap_or(0)));
        match &self.outcome {
            JobOutcome::Succeeded { output } => format!(
                "Cut {} [{} - {}] -> {} ({} profile, took {})",
                self.input.display(),
                self.start,
                self.end,
                output.display(),
                self.profile,
                took
            ),
            JobOutcome::Failed { failure, .. } => format!(
                "Cut of {} failed after {}: {}",
                self.input.display(),
                took,
                failure
            ),
            JobOutcome::Cancelled => format!(
                "Cut of {} cancelled after {}",
                self.input.display(),
                took
            ),
        }
    }
}

//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json` as a bounded child process and decodes
//! its output into [`MediaInfo`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::adapters::binary_locator::BinaryLocator;
use crate::domain::model::{MediaInfo, StreamInfo, StreamKind};
use crate::domain::timecode::{FrameRate, Timecode};
use crate::error::{CutterError, CutterResult};
use crate::ports::ProbePort;

/// Default probe time budget
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeAdapter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Resolve the ffprobe binary through `locator`
    pub fn from_locator(locator: &BinaryLocator, tool: &str, timeout: Duration) -> CutterResult<Self> {
        Ok(Self::new(locator.locate(tool)?, timeout))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path);
        command
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, path: &Path) -> CutterResult<MediaInfo> {
        debug!(program = %self.program.display(), path = %path.display(), "Probing media");
        let output = run_bounded(self.command(path), self.timeout, path).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CutterError::ProbeParse {
                message: format!(
                    "ffprobe exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info = parse_probe_output(path, &stdout)?;
        info!(
            path = %path.display(),
            duration = %info.duration,
            frame_rate = %info.frame_rate,
            streams = info.streams.len(),
            "Probe complete"
        );
        Ok(info)
    }
}

/// Run `command` to completion, killing it if `timeout` elapses first
///
/// `path` only labels the timeout error.
pub async fn run_bounded(mut command: Command, timeout: Duration, path: &Path) -> CutterResult<Output> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| CutterError::ProbeUnavailable {
        message: e.to_string(),
    })?;

    // Dropping the wait future on timeout drops the child, which kills it
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(path = %path.display(), ?timeout, "Probe timed out");
            Err(CutterError::ProbeTimeout {
                path: path.to_path_buf(),
                timeout,
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    disposition: HashMap<String, i64>,
}

impl FfprobeStream {
    fn is_attached_picture(&self) -> bool {
        self.disposition.get("attached_pic").copied().unwrap_or(0) != 0
    }

    fn frame_rate(&self) -> Option<FrameRate> {
        [&self.r_frame_rate, &self.avg_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|text| FrameRate::parse(text).ok())
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    size: Option<String>,
}

fn parse_error(message: impl Into<String>) -> CutterError {
    CutterError::ProbeParse {
        message: message.into(),
    }
}

/// Decode ffprobe JSON into a [`MediaInfo`]
pub fn parse_probe_output(path: &Path, json: &str) -> CutterResult<MediaInfo> {
    let raw: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| parse_error(format!("invalid JSON: {}", e)))?;

    let video = raw
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .find(|s| !s.is_attached_picture())
        .ok_or_else(|| parse_error("no video stream"))?;

    let frame_rate = video.frame_rate().ok_or_else(|| {
        parse_error(format!(
            "unusable frame rate (r_frame_rate={}, avg_frame_rate={})",
            video.r_frame_rate.as_deref().unwrap_or("none"),
            video.avg_frame_rate.as_deref().unwrap_or("none")
        ))
    })?;

    let duration_text = raw
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .ok_or_else(|| parse_error("missing duration"))?;
    let seconds: f64 = duration_text
        .trim()
        .parse()
        .map_err(|_| parse_error(format!("non-numeric duration '{}'", duration_text)))?;
    if seconds < 0.0 {
        return Err(parse_error(format!("negative duration {}", seconds)));
    }
    let duration = Timecode::from_seconds(seconds)
        .map_err(|e| parse_error(format!("duration: {}", e)))?;

    let mut streams = Vec::with_capacity(raw.streams.len());
    for stream in &raw.streams {
        let kind = match stream.codec_type.as_deref() {
            Some("video") => StreamKind::Video,
            Some("audio") => StreamKind::Audio,
            Some("subtitle") => StreamKind::Subtitle,
            other => {
                warn!(index = stream.index, codec_type = ?other, "Skipping stream");
                continue;
            }
        };
        streams.push(StreamInfo {
            index: stream.index,
            kind,
            codec: stream
                .codec_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            width: stream.width,
            height: stream.height,
            channels: stream.channels,
            sample_rate: stream.sample_rate.as_deref().and_then(|s| s.parse().ok()),
            language: stream.tags.get("language").cloned(),
        });
    }

    let format = raw.format.as_ref();
    Ok(MediaInfo {
        path: path.to_path_buf(),
        duration,
        frame_rate,
        streams,
        format_name: format.and_then(|f| f.format_name.clone()),
        bit_rate: format
            .and_then(|f| f.bit_rate.as_deref())
            .and_then(|s| s.parse().ok()),
        size_bytes: format
            .and_then(|f| f.size.as_deref())
            .and_then(|s| s.parse().ok()),
    })
}

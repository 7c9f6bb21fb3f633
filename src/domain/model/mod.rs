// Domain models - Job aggregate, media description and run outcomes

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::timecode::{FrameRate, Timecode};
use crate::error::{CutterError, CutterResult};

/// Slowest accepted playback speed
pub const MIN_SPEED: f64 = 0.5;
/// Fastest accepted playback speed
pub const MAX_SPEED: f64 = 3.0;
/// Profile used when the caller does not pick one
pub const DEFAULT_PROFILE: &str = "balanced";

/// Kind of elementary stream in a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// One stream of a probed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Absolute stream index inside the container
    pub index: u32,
    pub kind: StreamKind,
    pub codec: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
    pub language: Option<String>,
}

/// Read-only snapshot of a probed media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub duration: Timecode,
    pub frame_rate: FrameRate,
    /// Streams in container order
    pub streams: Vec<StreamInfo>,
    pub format_name: Option<String>,
    pub bit_rate: Option<u64>,
    pub size_bytes: Option<u64>,
}

impl MediaInfo {
    /// Streams of one kind, in container order
    pub fn streams_of(&self, kind: StreamKind) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(move |s| s.kind == kind)
    }

    pub fn video_stream(&self) -> Option<&StreamInfo> {
        self.streams_of(StreamKind::Video).next()
    }

    pub fn has_audio(&self) -> bool {
        self.streams_of(StreamKind::Audio).next().is_some()
    }

    pub fn subtitle_count(&self) -> usize {
        self.streams_of(StreamKind::Subtitle).count()
    }
}

/// A single named filter with ordered parameters
///
/// A parameter with an empty key is positional (`scale=1280:720`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterOp {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl FilterOp {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a `key=value` parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Resize to `width`x`height`; `-1`/`-2` keep the aspect ratio
    pub fn scale(width: i32, height: i32) -> Self {
        Self::new("scale").param("w", width).param("h", height)
    }

    pub fn crop(width: u32, height: u32, x: u32, y: u32) -> Self {
        Self::new("crop")
            .param("w", width)
            .param("h", height)
            .param("x", x)
            .param("y", y)
    }

    /// Colour adjustment; neutral values are 0, 1, 1
    pub fn eq(brightness: f64, contrast: f64, saturation: f64) -> Self {
        Self::new("eq")
            .param("brightness", brightness)
            .param("contrast", contrast)
            .param("saturation", saturation)
    }

    /// Parse `name`, `name=k=v:k=v` or `name=v1:v2`
    pub fn parse(text: &str) -> CutterResult<Self> {
        let text = text.trim();
        let (name, rest) = match text.split_once('=') {
            Some((name, rest)) => (name, Some(rest)),
            None => (text, None),
        };
        let mut op = FilterOp::new(name);
        if let Some(rest) = rest {
            for part in rest.split(':') {
                match part.split_once('=') {
                    Some((key, value)) => op.params.push((key.to_string(), value.to_string())),
                    None => op.params.push((String::new(), part.to_string())),
                }
            }
        }
        op.validate()?;
        Ok(op)
    }

    fn validate(&self) -> CutterResult<()> {
        if !is_identifier(&self.name) {
            return Err(CutterError::invalid_job(format!(
                "filter name '{}' must be a non-empty identifier",
                self.name
            )));
        }
        for (key, value) in &self.params {
            if !key.is_empty() && !is_identifier(key) {
                return Err(CutterError::invalid_job(format!(
                    "filter '{}' has an invalid option name '{}'",
                    self.name, key
                )));
            }
            if value.is_empty() {
                return Err(CutterError::invalid_job(format!(
                    "filter '{}' has an empty value",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Ordered filter operations; order is application order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChain {
    ops: Vec<FilterOp>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: FilterOp) {
        self.ops.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterOp> {
        self.ops.iter()
    }
}

impl From<Vec<FilterOp>> for FilterChain {
    fn from(ops: Vec<FilterOp>) -> Self {
        Self { ops }
    }
}

/// Clip-relative interval during which an overlay is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Timecode,
    pub end: Timecode,
}

impl TimeWindow {
    pub fn new(start: Timecode, end: Timecode) -> Self {
        Self { start, end }
    }
}

/// What an overlay draws
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverlayKind {
    Image {
        path: PathBuf,
    },
    Text {
        text: String,
        font_size: u32,
        font_color: String,
        font_file: Option<PathBuf>,
    },
}

/// Positioned image or text element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub x: i32,
    pub y: i32,
    /// 0.0 (transparent) to 1.0 (opaque)
    pub opacity: f64,
    /// Active for the whole clip when absent
    pub window: Option<TimeWindow>,
}

impl Overlay {
    pub fn image(path: impl Into<PathBuf>, x: i32, y: i32) -> Self {
        Self {
            kind: OverlayKind::Image { path: path.into() },
            x,
            y,
            opacity: 1.0,
            window: None,
        }
    }

    pub fn text(text: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            kind: OverlayKind::Text {
                text: text.into(),
                font_size: 24,
                font_color: "white".to_string(),
                font_file: None,
            },
            x,
            y,
            opacity: 1.0,
            window: None,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_window(mut self, start: Timecode, end: Timecode) -> Self {
        self.window = Some(TimeWindow::new(start, end));
        self
    }

    /// Font size and colour; no effect on image overlays
    pub fn with_font(mut self, size: u32, color: impl Into<String>) -> Self {
        if let OverlayKind::Text {
            font_size,
            font_color,
            ..
        } = &mut self.kind
        {
            *font_size = size;
            *font_color = color.into();
        }
        self
    }

    pub fn with_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        if let OverlayKind::Text { font_file, .. } = &mut self.kind {
            *font_file = Some(path.into());
        }
        self
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, OverlayKind::Image { .. })
    }

    fn validate(&self, clip: Timecode) -> CutterResult<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(CutterError::invalid_job(format!(
                "overlay opacity {} is outside [0, 1]",
                self.opacity
            )));
        }
        match &self.kind {
            OverlayKind::Image { path } if path.as_os_str().is_empty() => {
                return Err(CutterError::invalid_job("image overlay path is empty"));
            }
            OverlayKind::Text {
                text, font_size, ..
            } => {
                if text.is_empty() {
                    return Err(CutterError::invalid_job("text overlay is empty"));
                }
                if *font_size == 0 {
                    return Err(CutterError::invalid_job("text overlay font size must be positive"));
                }
            }
            _ => {}
        }
        if let Some(window) = &self.window {
            if window.start >= window.end {
                return Err(CutterError::invalid_job(format!(
                    "overlay window {} - {} is empty",
                    window.start, window.end
                )));
            }
            if window.end > clip {
                return Err(CutterError::invalid_job(format!(
                    "overlay window ends at {} but the clip lasts {}",
                    window.end, clip
                )));
            }
        }
        Ok(())
    }
}

/// Where subtitles come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleSource {
    /// External subtitle file
    File(PathBuf),
    /// N-th subtitle stream of the input
    Embedded(u32),
}

/// Burn-in styling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub font_size: Option<u32>,
    /// ASS colour, e.g. `&H00FFFFFF`
    pub primary_colour: Option<String>,
    /// Character encoding of a text subtitle file
    pub charset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleMode {
    BurnIn,
    Passthrough,
}

/// Subtitle source plus how it reaches the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleSpec {
    source: SubtitleSource,
    mode: SubtitleMode,
    style: Option<SubtitleStyle>,
}

impl SubtitleSpec {
    /// Render subtitles into the picture
    pub fn burn_in(source: SubtitleSource, style: Option<SubtitleStyle>) -> Self {
        Self {
            source,
            mode: SubtitleMode::BurnIn,
            style,
        }
    }

    /// Carry subtitles as a separate output stream
    pub fn passthrough(source: SubtitleSource) -> Self {
        Self {
            source,
            mode: SubtitleMode::Passthrough,
            style: None,
        }
    }

    pub fn source(&self) -> &SubtitleSource {
        &self.source
    }

    pub fn mode(&self) -> SubtitleMode {
        self.mode
    }

    pub fn style(&self) -> Option<&SubtitleStyle> {
        self.style.as_ref()
    }
}

/// Validated, immutable trim/re-encode request
///
/// Built through [`JobBuilder`]; there are no setters, so a running
/// supervisor can hold an `Arc<Job>` without coordination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    input: PathBuf,
    output: PathBuf,
    start: Timecode,
    end: Timecode,
    profile: String,
    filters: FilterChain,
    overlays: Vec<Overlay>,
    subtitles: Option<SubtitleSpec>,
    speed: f64,
    strip_audio: bool,
}

impl Job {
    pub fn builder(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        start: Timecode,
        end: Timecode,
    ) -> JobBuilder {
        JobBuilder::new(input, output, start, end)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn start(&self) -> Timecode {
        self.start
    }

    pub fn end(&self) -> Timecode {
        self.end
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn subtitles(&self) -> Option<&SubtitleSpec> {
        self.subtitles.as_ref()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn strip_audio(&self) -> bool {
        self.strip_audio
    }

    /// Length of the selected source range
    pub fn duration(&self) -> Timecode {
        self.end - self.start
    }

    /// Length of the produced clip after the speed change
    pub fn output_duration(&self) -> Timecode {
        let millis = self.duration().as_millis() as f64 / self.speed;
        Timecode::from_millis(millis.round() as u64)
    }
}

/// Collects job parameters and validates them in [`JobBuilder::build`]
#[derive(Debug, Clone)]
pub struct JobBuilder {
    input: PathBuf,
    output: PathBuf,
    start: Timecode,
    end: Timecode,
    profile: String,
    filters: FilterChain,
    overlays: Vec<Overlay>,
    subtitles: Option<SubtitleSpec>,
    speed: f64,
    strip_audio: bool,
    source_duration: Option<Timecode>,
    subtitle_streams: Option<usize>,
}

impl JobBuilder {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        start: Timecode,
        end: Timecode,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            start,
            end,
            profile: DEFAULT_PROFILE.to_string(),
            filters: FilterChain::new(),
            overlays: Vec::new(),
            subtitles: None,
            speed: 1.0,
            strip_audio: false,
            source_duration: None,
            subtitle_streams: None,
        }
    }

    pub fn profile(mut self, name: impl Into<String>) -> Self {
        self.profile = name.into();
        self
    }

    pub fn filter(mut self, op: FilterOp) -> Self {
        self.filters.push(op);
        self
    }

    pub fn filters(mut self, chain: FilterChain) -> Self {
        self.filters = chain;
        self
    }

    /// Overlays are drawn in insertion order, later ones on top
    pub fn overlay(mut self, overlay: Overlay) -> Self {
        self.overlays.push(overlay);
        self
    }

    pub fn subtitles(mut self, spec: SubtitleSpec) -> Self {
        self.subtitles = Some(spec);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn strip_audio(mut self) -> Self {
        self.strip_audio = true;
        self
    }

    /// Bound the range by a probed source
    pub fn with_media_info(mut self, info: &MediaInfo) -> Self {
        self.source_duration = Some(info.duration);
        self.subtitle_streams = Some(info.subtitle_count());
        self
    }

    pub fn build(self) -> CutterResult<Job> {
        if self.input.as_os_str().is_empty() {
            return Err(CutterError::invalid_job("input path is empty"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(CutterError::invalid_job("output path is empty"));
        }
        if self.start >= self.end {
            return Err(CutterError::invalid_job(format!(
                "start {} must be before end {}",
                self.start, self.end
            )));
        }
        if let Some(duration) = self.source_duration {
            if self.end > duration {
                return Err(CutterError::invalid_job(format!(
                    "end {} is past the end of the source ({})",
                    self.end, duration
                )));
            }
        }
        if !self.speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(CutterError::invalid_job(format!(
                "speed {} is outside [{}, {}]",
                self.speed, MIN_SPEED, MAX_SPEED
            )));
        }
        if self.profile.is_empty() {
            return Err(CutterError::invalid_job("profile name is empty"));
        }

        for op in self.filters.iter() {
            op.validate()?;
        }

        let clip = self.end - self.start;
        for overlay in &self.overlays {
            overlay.validate(clip)?;
        }

        if let Some(spec) = &self.subtitles {
            match spec.source() {
                SubtitleSource::File(path) if path.as_os_str().is_empty() => {
                    return Err(CutterError::invalid_job("subtitle file path is empty"));
                }
                SubtitleSource::Embedded(index) => {
                    if let Some(count) = self.subtitle_streams {
                        if *index as usize >= count {
                            return Err(CutterError::invalid_job(format!(
                                "subtitle stream {} requested but the source has {}",
                                index, count
                            )));
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Job {
            input: self.input,
            output: self.output,
            start: self.start,
            end: self.end,
            profile: self.profile,
            filters: self.filters,
            overlays: self.overlays,
            subtitles: self.subtitles,
            speed: self.speed,
            strip_audio: self.strip_audio,
        })
    }
}

/// Progress marker decoded from the encoder's diagnostic stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Output time processed so far
    pub elapsed: Timecode,
    /// `elapsed / output duration`, clamped to [0, 1]
    pub fraction: f64,
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    pub size_bytes: Option<u64>,
    pub bitrate_kbps: Option<f64>,
    /// Encoding speed relative to real time
    pub speed: Option<f64>,
}

/// Why a finished run did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Exit status was success but the output is missing or empty
    IncompleteOutput,
    /// Exit status was not success; `code` is absent when killed by a signal
    NonZeroExit { code: Option<i32> },
    /// Supervision stopped before the encoder's exit was judged
    Interrupted { message: String },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::IncompleteOutput => write!(f, "encoder produced no output"),
            FailureKind::NonZeroExit { code: Some(code) } => {
                write!(f, "encoder exited with status {}", code)
            }
            FailureKind::NonZeroExit { code: None } => write!(f, "encoder was terminated"),
            FailureKind::Interrupted { message } => write!(f, "supervision interrupted: {}", message),
        }
    }
}

/// Terminal result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded {
        output: PathBuf,
    },
    Failed {
        failure: FailureKind,
        /// Last diagnostic lines from the encoder
        diagnostics: String,
    },
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }
}

/// What an external player needs to preview the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewTarget {
    pub input: PathBuf,
    pub start: Option<Timecode>,
}

impl PreviewTarget {
    pub fn new(input: impl Into<PathBuf>, start: Option<Timecode>) -> Self {
        Self {
            input: input.into(),
            start,
        }
    }

    pub fn from_job(job: &Job) -> Self {
        Self::new(job.input(), Some(job.start()))
    }
}

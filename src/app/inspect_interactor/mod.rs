// Inspect interactor - Media inspection and preview targets

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::app::probe_with_retry;
use crate::domain::model::{MediaInfo, PreviewTarget, StreamKind};
use crate::domain::timecode::Timecode;
use crate::error::{CutterError, CutterResult};
use crate::ports::ProbePort;
use crate::utils::format_file_size;

/// Interactor for media file inspection
pub struct InspectInteractor {
    probe_port: Arc<dyn ProbePort>,
}

impl InspectInteractor {
    pub fn new(probe_port: Arc<dyn ProbePort>) -> Self {
        Self { probe_port }
    }

    /// Probe a file, retrying once on a retryable failure
    pub async fn inspect(&self, path: &Path) -> CutterResult<MediaInfo> {
        info!(path = %path.display(), "Inspecting media file");
        let media = probe_with_retry(self.probe_port.as_ref(), path).await?;
        info!(
            duration = %media.duration,
            frame_rate = %media.frame_rate,
            streams = media.streams.len(),
            "Media file probed"
        );
        Ok(media)
    }
}

/// Resolve the input and optional start offset handed to an external player
///
/// The start accepts the lenient timecode forms.
pub fn preview_target(input: &Path, start: Option<&str>) -> CutterResult<PreviewTarget> {
    if !input.is_file() {
        return Err(CutterError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file does not exist: {}", input.display()),
        )));
    }
    let start = start.map(Timecode::parse_lenient).transpose()?;
    let input: PathBuf = std::fs::canonicalize(input)?;
    Ok(PreviewTarget::new(input, start))
}

/// Plain-text description of probed media
pub fn format_media_summary(media: &MediaInfo) -> String {
    let mut lines = vec![
        format!("File:       {}", media.path.display()),
        format!("Duration:   {}", media.duration),
        format!("Frame rate: {} ({:.3} fps)", media.frame_rate, media.frame_rate.as_f64()),
    ];
    if let Some(format) = &media.format_name {
        lines.push(format!("Container:  {}", format));
    }
    if let Some(bit_rate) = media.bit_rate {
        lines.push(format!("Bitrate:    {} kbit/s", bit_rate / 1000));
    }
    if let Some(size) = media.size_bytes {
        lines.push(format!("Size:       {}", format_file_size(size)));
    }
    for stream in &media.streams {
        let detail = match stream.kind {
            StreamKind::Video => match (stream.width, stream.height) {
                (Some(w), Some(h)) => format!("{}x{}", w, h),
                _ => String::new(),
            },
            StreamKind::Audio => match (stream.channels, stream.sample_rate) {
                (Some(ch), Some(rate)) => format!("{} ch, {} Hz", ch, rate),
                (Some(ch), None) => format!("{} ch", ch),
                _ => String::new(),
            },
            StreamKind::Subtitle => String::new(),
        };
        let mut line = format!("  #{} {}: {}", stream.index, stream.kind, stream.codec);
        if !detail.is_empty() {
            line.push_str(&format!(" ({})", detail));
        }
        if let Some(language) = &stream.language {
            line.push_str(&format!(" [{}]", language));
        }
        lines.push(line);
    }
    lines.join("\n")
}

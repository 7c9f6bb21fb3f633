//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::app::CutRequest;
use crate::domain::model::{
    FilterOp, Overlay, SubtitleSource, SubtitleSpec, SubtitleStyle, DEFAULT_PROFILE,
};
use crate::domain::timecode::Timecode;
use crate::error::{CutterError, CutterResult};

/// Arguments for the cut command
#[derive(Args, Debug, Clone)]
pub struct CutArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start time (HH:MM:SS.mmm, MM:SS.mmm, or seconds)
    #[arg(short, long)]
    pub start: String,

    /// End time (HH:MM:SS.mmm, MM:SS.mmm, or seconds)
    #[arg(short, long)]
    pub end: String,

    /// Output file path (default: <input>_cut_<start>-<end>.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Encoding profile: fast, balanced or high_quality
    #[arg(short, long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Video filter, e.g. `hflip` or `scale=w=1280:h=-2` (repeatable, applied in order)
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Resize to WIDTHxHEIGHT (-2 keeps the aspect ratio)
    #[arg(long, value_name = "WxH")]
    pub scale: Option<String>,

    /// Brightness adjustment (-1.0 to 1.0)
    #[arg(long, allow_negative_numbers = true)]
    pub brightness: Option<f64>,

    /// Contrast multiplier
    #[arg(long)]
    pub contrast: Option<f64>,

    /// Saturation multiplier
    #[arg(long)]
    pub saturation: Option<f64>,

    /// Text drawn over the video
    #[arg(long)]
    pub text: Option<String>,

    /// Text position as X,Y in pixels
    #[arg(long, value_name = "X,Y", default_value = "10,10", allow_hyphen_values = true)]
    pub text_pos: String,

    /// Text font size
    #[arg(long, default_value_t = 24)]
    pub font_size: u32,

    /// Text colour (ffmpeg colour name or 0xRRGGBB)
    #[arg(long, default_value = "white")]
    pub font_color: String,

    /// Font file for the text overlay
    #[arg(long)]
    pub font_file: Option<PathBuf>,

    /// Image drawn over the video
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Image position as X,Y in pixels
    #[arg(long, value_name = "X,Y", default_value = "10,10", allow_hyphen_values = true)]
    pub image_pos: String,

    /// Image opacity (0.0 to 1.0)
    #[arg(long, default_value_t = 1.0)]
    pub image_opacity: f64,

    /// Show overlays only from this clip-relative time
    #[arg(long)]
    pub overlay_from: Option<String>,

    /// Show overlays only until this clip-relative time
    #[arg(long)]
    pub overlay_until: Option<String>,

    /// External subtitle file
    #[arg(long, conflicts_with = "subtitle_stream")]
    pub subtitles: Option<PathBuf>,

    /// Subtitle stream of the input (0 = first subtitle stream)
    #[arg(long)]
    pub subtitle_stream: Option<u32>,

    /// Render subtitles into the picture instead of keeping a subtitle track
    #[arg(long)]
    pub burn_subs: bool,

    /// Burned-in subtitle font size
    #[arg(long)]
    pub subtitle_size: Option<u32>,

    /// Burned-in subtitle colour in ASS notation (&HAABBGGRR)
    #[arg(long)]
    pub subtitle_color: Option<String>,

    /// Character encoding of the subtitle file
    #[arg(long)]
    pub subtitle_charset: Option<String>,

    /// Playback speed (0.5 to 3.0)
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Remove audio
    #[arg(long)]
    pub no_audio: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Show fps and bitrate with the progress bar
    #[arg(short, long)]
    pub verbose: bool,
}

impl CutArgs {
    /// Translate the flags into a cut request
    pub fn to_request(&self) -> CutterResult<CutRequest> {
        let mut request = CutRequest::new(&self.input, &self.start, &self.end);
        request.output = self.output.clone();
        request.profile = self.profile.clone();
        request.speed = self.speed;
        request.strip_audio = self.no_audio;
        request.filters = self.filter_ops()?;
        request.overlays = self.overlays()?;
        request.subtitles = self.subtitle_spec();
        Ok(request)
    }

    fn filter_ops(&self) -> CutterResult<Vec<FilterOp>> {
        let mut ops = Vec::new();
        if let Some(scale) = &self.scale {
            let (width, height) = parse_pair(scale, 'x', "--scale")?;
            ops.push(FilterOp::scale(width, height));
        }
        if self.brightness.is_some() || self.contrast.is_some() || self.saturation.is_some() {
            ops.push(FilterOp::eq(
                self.brightness.unwrap_or(0.0),
                self.contrast.unwrap_or(1.0),
                self.saturation.unwrap_or(1.0),
            ));
        }
        for text in &self.filters {
            ops.push(FilterOp::parse(text)?);
        }
        Ok(ops)
    }

    fn overlays(&self) -> CutterResult<Vec<Overlay>> {
        let window = match (&self.overlay_from, &self.overlay_until) {
            (None, None) => None,
            (from, until) => {
                let from = from
                    .as_deref()
                    .map(Timecode::parse_lenient)
                    .transpose()?
                    .unwrap_or(Timecode::ZERO);
                let until = match until {
                    Some(text) => Timecode::parse_lenient(text)?,
                    None => return Err(CutterError::invalid_job("--overlay-from needs --overlay-until")),
                };
                Some((from, until))
            }
        };

        let mut overlays = Vec::new();
        if let Some(text) = &self.text {
            let (x, y) = parse_pair(&self.text_pos, ',', "--text-pos")?;
            let mut overlay = Overlay::text(text.clone(), x, y).with_font(self.font_size, &self.font_color);
            if let Some(path) = &self.font_file {
                overlay = overlay.with_font_file(path);
            }
            overlays.push(overlay);
        }
        if let Some(path) = &self.image {
            let (x, y) = parse_pair(&self.image_pos, ',', "--image-pos")?;
            overlays.push(Overlay::image(path, x, y).with_opacity(self.image_opacity));
        }
        if let Some((from, until)) = window {
            overlays = overlays
                .into_iter()
                .map(|o| o.with_window(from, until))
                .collect();
        }
        Ok(overlays)
    }

    fn subtitle_spec(&self) -> Option<SubtitleSpec> {
        let source = match (&self.subtitles, self.subtitle_stream) {
            (Some(path), _) => SubtitleSource::File(path.clone()),
            (None, Some(index)) => SubtitleSource::Embedded(index),
            (None, None) => return None,
        };
        let styled = self.subtitle_size.is_some()
            || self.subtitle_color.is_some()
            || self.subtitle_charset.is_some();
        if self.burn_subs || styled {
            let style = styled.then(|| SubtitleStyle {
                font_size: self.subtitle_size,
                primary_colour: self.subtitle_color.clone(),
                charset: self.subtitle_charset.clone(),
            });
            Some(SubtitleSpec::burn_in(source, style))
        } else {
            Some(SubtitleSpec::passthrough(source))
        }
    }
}

/// `"1280x720"` or `"10,-20"` into two integers
fn parse_pair(text: &str, separator: char, flag: &str) -> CutterResult<(i32, i32)> {
    let invalid = || {
        CutterError::invalid_job(format!(
            "{} expects two integers separated by '{}', got '{}'",
            flag, separator, text
        ))
    };
    let (a, b) = text.split_once(separator).ok_or_else(invalid)?;
    let a = a.trim().parse().map_err(|_| invalid())?;
    let b = b.trim().parse().map_err(|_| invalid())?;
    Ok((a, b))
}

/// Arguments for the probe command
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Input media file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the preview command
#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// Input media file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Offset to start playback at
    #[arg(short, long)]
    pub start: Option<String>,
}

//! Progress markers, progress sinks and console reporting

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::domain::model::{JobOutcome, ProgressEvent};
use crate::domain::timecode::Timecode;

/// Receives progress and, exactly once, the terminal outcome of a run
///
/// Called from the supervisor's worker task; implementations must not block.
pub trait ProgressSink: Send + Sync {
    /// Called for each accepted progress marker, in non-decreasing time order
    fn on_progress(&self, event: &ProgressEvent);

    /// Called once when the run ends; no progress follows
    fn on_outcome(&self, outcome: &JobOutcome);
}

/// Fields decoded from one encoder status line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressMarker {
    pub elapsed: Timecode,
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    pub size_bytes: Option<u64>,
    pub bitrate_kbps: Option<f64>,
    pub speed: Option<f64>,
}

/// Value of `key=` in a status line, where `key` starts a token
///
/// ffmpeg pads values after `=` with spaces (`frame=  150`).
fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("{}=", key);
    for (idx, _) in line.match_indices(&pattern) {
        let at_boundary = line[..idx]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        if !at_boundary {
            continue;
        }
        let rest = line[idx + pattern.len()..].trim_start();
        let value = rest.split_whitespace().next()?;
        return Some(value);
    }
    None
}

fn parse_elapsed(value: &str) -> Option<Timecode> {
    // ffmpeg prints hundredths; tolerate finer precision by truncating
    match value.split_once('.') {
        Some((whole, fraction)) => {
            if !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let fraction = fraction.get(..3).unwrap_or(fraction);
            Timecode::parse(&format!("{}.{}", whole, fraction)).ok()
        }
        None => Timecode::parse(value).ok(),
    }
}

fn parse_size(value: &str) -> Option<u64> {
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: u64 = number.parse().ok()?;
    let multiplier = match unit {
        "" | "B" => 1,
        "kB" | "KiB" => 1024,
        "mB" | "MB" | "MiB" => 1024 * 1024,
        "gB" | "GB" | "GiB" => 1024 * 1024 * 1024,
        _ => return None,
    };
    number.checked_mul(multiplier)
}

/// Decode an ffmpeg status line such as
/// `frame=  150 fps=30 q=28.0 size=  512kB time=00:00:05.00 bitrate= 838.9kbits/s speed=2.00x`
///
/// Returns `None` for anything without a usable `time=` field (including
/// `time=N/A` and negative times).
pub fn parse_progress_line(line: &str) -> Option<ProgressMarker> {
    let elapsed = parse_elapsed(field(line, "time")?)?;
    Some(ProgressMarker {
        elapsed,
        frame: field(line, "frame").and_then(|v| v.parse().ok()),
        fps: field(line, "fps").and_then(|v| v.parse().ok()),
        size_bytes: field(line, "size")
            .or_else(|| field(line, "Lsize"))
            .and_then(parse_size),
        bitrate_kbps: field(line, "bitrate")
            .and_then(|v| v.strip_suffix("kbits/s"))
            .and_then(|v| v.parse().ok()),
        speed: field(line, "speed")
            .and_then(|v| v.strip_suffix('x'))
            .and_then(|v| v.trim().parse().ok()),
    })
}

/// Turns markers into events against the clip length, dropping regressions
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Timecode,
    last: Option<Timecode>,
}

impl ProgressTracker {
    pub fn new(total: Timecode) -> Self {
        Self { total, last: None }
    }

    /// Event for `marker`, or `None` if it goes back in time
    pub fn observe(&mut self, marker: ProgressMarker) -> Option<ProgressEvent> {
        if let Some(last) = self.last {
            if marker.elapsed < last {
                return None;
            }
        }
        self.last = Some(marker.elapsed);

        let fraction = if self.total.as_millis() == 0 {
            1.0
        } else {
            (marker.elapsed.as_millis() as f64 / self.total.as_millis() as f64).clamp(0.0, 1.0)
        };
        Some(ProgressEvent {
            elapsed: marker.elapsed,
            fraction,
            frame: marker.frame,
            fps: marker.fps,
            size_bytes: marker.size_bytes,
            bitrate_kbps: marker.bitrate_kbps,
            speed: marker.speed,
        })
    }
}

/// Event forwarded by [`ChannelSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    Progress(ProgressEvent),
    Finished(JobOutcome),
}

/// Sink that forwards everything into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SupervisorEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, event: &ProgressEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(SupervisorEvent::Progress(event.clone()));
    }

    fn on_outcome(&self, outcome: &JobOutcome) {
        let _ = self.tx.send(SupervisorEvent::Finished(outcome.clone()));
    }
}

/// Sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _event: &ProgressEvent) {}
    fn on_outcome(&self, _outcome: &JobOutcome) {}
}

/// Progress bar on stderr
pub struct ConsoleProgressSink {
    verbose: bool,
    last_percent: Mutex<Option<u32>>,
}

impl ConsoleProgressSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            last_percent: Mutex::new(None),
        }
    }
}

/// `[████░░░░]`-style bar for a fraction in [0, 1]
pub fn render_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64) as usize).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

impl ProgressSink for ConsoleProgressSink {
    fn on_progress(&self, event: &ProgressEvent) {
        let percent = (event.fraction * 100.0).round() as u32;
        {
            let mut last = self
                .last_percent
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !self.verbose && *last == Some(percent) {
                return;
            }
            *last = Some(percent);
        }

        let mut line = format!(
            "\r[{}] {:>3}% {}",
            render_bar(event.fraction, 30),
            percent,
            event.elapsed.format_short()
        );
        if let Some(speed) = event.speed {
            line.push_str(&format!(" {:.2}x", speed));
        }
        if self.verbose {
            if let Some(fps) = event.fps {
                line.push_str(&format!(" {:.0} fps", fps));
            }
            if let Some(kbps) = event.bitrate_kbps {
                line.push_str(&format!(" {:.0} kbit/s", kbps));
            }
        }
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "{}", line);
        let _ = stderr.flush();
    }

    fn on_outcome(&self, outcome: &JobOutcome) {
        let message = match outcome {
            JobOutcome::Succeeded { output } => format!("Done: {}", output.display()),
            JobOutcome::Failed { failure, .. } => format!("Failed: {}", failure),
            JobOutcome::Cancelled => "Cancelled".to_string(),
        };
        eprintln!("\n{}", message);
    }
}

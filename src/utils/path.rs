//! Output file naming

use std::path::{Path, PathBuf};

use crate::domain::timecode::Timecode;

/// Extension used when the input has none
const FALLBACK_EXTENSION: &str = "mp4";

/// `01h02m03s`-style stamp, safe in file names on every platform
pub fn file_stamp(tc: Timecode) -> String {
    let total = tc.as_millis() / 1000;
    format!("{:02}h{:02}m{:02}s", total / 3600, (total % 3600) / 60, total % 60)
}

/// Default output path: `<stem>_cut_<start>-<end>.<ext>` next to the input
pub fn default_output_path(input: &Path, start: Timecode, end: Timecode) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    let name = format!(
        "{}_cut_{}-{}.{}",
        stem,
        file_stamp(start),
        file_stamp(end),
        extension
    );
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stamp() {
        assert_eq!(file_stamp(Timecode::from_millis(3_723_900)), "01h02m03s");
        assert_eq!(file_stamp(Timecode::ZERO), "00h00m00s");
    }

    #[test]
    fn test_default_output_next_to_input() {
        let path = default_output_path(
            Path::new("videos/holiday.mov"),
            Timecode::from_millis(10_000),
            Timecode::from_millis(95_500),
        );
        assert_eq!(path, Path::new("videos/holiday_cut_00h00m10s-00h01m35s.mov"));
    }

    #[test]
    fn test_default_output_without_extension() {
        let path = default_output_path(
            Path::new("capture"),
            Timecode::ZERO,
            Timecode::from_millis(1_000),
        );
        assert_eq!(path, Path::new("capture_cut_00h00m00s-00h00m01s.mp4"));
    }
}

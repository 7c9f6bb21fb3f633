//! Resolution of the external ffmpeg/ffprobe executables
//!
//! The bundled directory is searched first, then `PATH`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CutterError, CutterResult};

/// Name of the bundled tools directory next to the executable
pub const BUNDLED_DIR_NAME: &str = "ffmpeg";

/// Locates external tools by base name
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    bundled_dir: Option<PathBuf>,
}

impl BinaryLocator {
    /// Search `bundled_dir` (if any) before `PATH`
    pub fn new(bundled_dir: Option<PathBuf>) -> Self {
        Self { bundled_dir }
    }

    /// Locator using `ffmpeg/` next to the running executable
    pub fn from_current_exe() -> Self {
        Self::new(default_bundled_dir())
    }

    pub fn bundled_dir(&self) -> Option<&Path> {
        self.bundled_dir.as_deref()
    }

    /// Resolve `tool` (without extension) to an executable path
    pub fn locate(&self, tool: &str) -> CutterResult<PathBuf> {
        // Configured absolute or relative paths are taken as-is
        let as_path = Path::new(tool);
        if as_path.components().count() > 1 {
            if as_path.is_file() {
                return Ok(as_path.to_path_buf());
            }
            return Err(CutterError::BinaryNotFound {
                tool: tool.to_string(),
                searched: as_path.display().to_string(),
            });
        }

        let mut searched = Vec::new();
        if let Some(dir) = &self.bundled_dir {
            let candidate = dir.join(executable_name(tool));
            if candidate.is_file() {
                debug!(tool, path = %candidate.display(), "Using bundled binary");
                return Ok(candidate);
            }
            searched.push(dir.display().to_string());
        }

        match which::which(tool) {
            Ok(path) => {
                debug!(tool, path = %path.display(), "Using binary from PATH");
                Ok(path)
            }
            Err(_) => {
                searched.push("PATH".to_string());
                Err(CutterError::BinaryNotFound {
                    tool: tool.to_string(),
                    searched: searched.join(", "),
                })
            }
        }
    }
}

impl Default for BinaryLocator {
    fn default() -> Self {
        Self::from_current_exe()
    }
}

/// `ffmpeg/` beside the running executable
pub fn default_bundled_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(BUNDLED_DIR_NAME)))
}

fn executable_name(tool: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool)
    } else {
        tool.to_string()
    }
}

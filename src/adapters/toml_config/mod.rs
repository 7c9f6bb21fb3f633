// TOML config adapter - Configuration file and environment overrides

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::binary_locator::{default_bundled_dir, BinaryLocator};
use crate::domain::profiles::{ProfileOverride, ProfileTable};
use crate::error::{CutterError, CutterResult};
use crate::utils::logging::LoggingConfig;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "videocutter.toml";

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "VIDEOCUTTER_";

/// Where the external tools live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinariesConfig {
    /// Searched before `PATH`; defaults to `ffmpeg/` next to the executable
    pub bundled_dir: Option<PathBuf>,
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for BinariesConfig {
    fn default() -> Self {
        Self {
            bundled_dir: None,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_ms: 15_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Wait after a graceful stop request before killing the encoder
    pub grace_period_ms: u64,
    /// Diagnostic lines kept for failure reports
    pub diagnostic_tail_lines: usize,
    /// Replace an existing output file (`-y`) instead of refusing (`-n`)
    pub overwrite: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5_000,
            diagnostic_tail_lines: 20,
            overwrite: true,
        }
    }
}

/// Whole application configuration; every field has a default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub binaries: BinariesConfig,
    pub probe: ProbeConfig,
    pub encoder: EncoderConfig,
    pub logging: LoggingConfig,
    pub profiles: BTreeMap<String, ProfileOverride>,
}

impl AppConfig {
    /// Parse configuration text
    pub fn from_toml_str(content: &str) -> CutterResult<Self> {
        toml::from_str(content).map_err(|e| CutterError::Config {
            message: format!("failed to parse TOML config: {}", e),
        })
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> CutterResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CutterError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Load `explicit`, else `videocutter.toml` in the working directory, else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> CutterResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply `VIDEOCUTTER_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> CutterResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let mut applied = 0;

        if let Some(value) = var("LOG_LEVEL") {
            self.logging.level = value.parse()?;
            applied += 1;
        }
        if let Some(value) = var("LOG_FORMAT") {
            self.logging.format = value.parse()?;
            applied += 1;
        }
        if let Some(value) = var("BUNDLED_DIR") {
            self.binaries.bundled_dir = Some(PathBuf::from(value));
            applied += 1;
        }
        if let Some(value) = var("PROBE_TIMEOUT_MS") {
            self.probe.timeout_ms = parse_millis("PROBE_TIMEOUT_MS", &value)?;
            applied += 1;
        }
        if let Some(value) = var("GRACE_PERIOD_MS") {
            self.encoder.grace_period_ms = parse_millis("GRACE_PERIOD_MS", &value)?;
            applied += 1;
        }

        if applied > 0 {
            debug!(applied, "Applied environment overrides");
        }
        Ok(applied)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe.timeout_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.encoder.grace_period_ms)
    }

    /// Built-in presets with the `[profiles.*]` overrides applied
    pub fn profile_table(&self) -> CutterResult<ProfileTable> {
        ProfileTable::with_overrides(&self.profiles)
    }

    /// Locator for the configured bundled directory
    pub fn binary_locator(&self) -> BinaryLocator {
        let dir = self.binaries.bundled_dir.clone().or_else(default_bundled_dir);
        BinaryLocator::new(dir)
    }
}

fn parse_millis(name: &str, value: &str) -> CutterResult<u64> {
    value.trim().parse().map_err(|_| CutterError::Config {
        message: format!("{}{} must be a whole number of milliseconds, got '{}'", ENV_PREFIX, name, value),
    })
}

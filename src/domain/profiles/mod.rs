// Encoding presets - named, read-only encoder parameter sets

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CutterError, CutterResult};

/// Names of the built-in presets, fastest first
pub const PROFILE_NAMES: [&str; 3] = ["fast", "balanced", "high_quality"];

/// Fixed encoder parameters for one preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingProfile {
    pub name: String,
    pub video_codec: String,
    /// x264 speed preset
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl EncodingProfile {
    fn builtin(name: &str, preset: &str, crf: u8, audio_bitrate: &str) -> Self {
        Self {
            name: name.to_string(),
            video_codec: "libx264".to_string(),
            preset: preset.to_string(),
            crf,
            audio_codec: "aac".to_string(),
            audio_bitrate: audio_bitrate.to_string(),
        }
    }

    /// Encoder arguments; audio options are skipped when audio is dropped
    pub fn to_args(&self, with_audio: bool) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
        ];
        if with_audio {
            args.extend([
                "-c:a".to_string(),
                self.audio_codec.clone(),
                "-b:a".to_string(),
                self.audio_bitrate.clone(),
            ]);
        }
        args
    }
}

/// Partial override of a built-in preset, as read from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOverride {
    pub video_codec: Option<String>,
    pub preset: Option<String>,
    pub crf: Option<u8>,
    pub audio_codec: Option<String>,
    pub audio_bitrate: Option<String>,
}

/// Lookup of the three known presets
///
/// Built once at startup and shared as `Arc<ProfileTable>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTable {
    profiles: BTreeMap<String, EncodingProfile>,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileTable {
    pub fn builtin() -> Self {
        let profiles = [
            EncodingProfile::builtin("fast", "ultrafast", 23, "128k"),
            EncodingProfile::builtin("balanced", "medium", 20, "192k"),
            EncodingProfile::builtin("high_quality", "slow", 18, "256k"),
        ]
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect();
        Self { profiles }
    }

    /// Built-in presets with configured fields replaced
    pub fn with_overrides(overrides: &BTreeMap<String, ProfileOverride>) -> CutterResult<Self> {
        let mut table = Self::builtin();
        for (name, patch) in overrides {
            let profile = table
                .profiles
                .get_mut(name)
                .ok_or_else(|| CutterError::UnsupportedProfile { name: name.clone() })?;
            if let Some(crf) = patch.crf {
                if crf > 51 {
                    return Err(CutterError::Config {
                        message: format!("profile '{}': crf {} is above 51", name, crf),
                    });
                }
                profile.crf = crf;
            }
            if let Some(codec) = &patch.video_codec {
                profile.video_codec = codec.clone();
            }
            if let Some(preset) = &patch.preset {
                profile.preset = preset.clone();
            }
            if let Some(codec) = &patch.audio_codec {
                profile.audio_codec = codec.clone();
            }
            if let Some(bitrate) = &patch.audio_bitrate {
                profile.audio_bitrate = bitrate.clone();
            }
        }
        Ok(table)
    }

    pub fn get(&self, name: &str) -> CutterResult<&EncodingProfile> {
        self.profiles
            .get(name)
            .ok_or_else(|| CutterError::UnsupportedProfile {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

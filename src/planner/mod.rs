//! Command building: a validated job plus an encoding profile becomes ffmpeg arguments
//!
//! The result is an argument vector handed straight to the process API, so
//! paths and overlay text never meet a shell.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::domain::model::{Job, SubtitleMode, SubtitleSource};
use crate::domain::profiles::ProfileTable;
use crate::error::{CutterError, CutterResult};

pub mod filter_graph;

pub use filter_graph::{atempo_chain, build_video_graph};

/// Containers that store subtitles as `mov_text` and support faststart
const MP4_FAMILY: [&str; 3] = ["mp4", "mov", "m4v"];

/// Builds encoder argument lists from jobs
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    profiles: Arc<ProfileTable>,
    overwrite: bool,
}

impl CommandBuilder {
    pub fn new(profiles: Arc<ProfileTable>) -> Self {
        Self {
            profiles,
            overwrite: true,
        }
    }

    /// `true` passes `-y`, `false` passes `-n`
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Argument list (without the program name) for `job`
    ///
    /// Deterministic: equal jobs always give identical lists.
    pub fn build_arguments(&self, job: &Job) -> CutterResult<Vec<String>> {
        let profile = self.profiles.get(job.profile())?;
        if job.output() == job.input() {
            return Err(CutterError::invalid_job(format!(
                "output path {} is the input file",
                job.output().display()
            )));
        }

        let start = job.start().format_hms();
        let duration = job.duration().format_hms();
        let mut args: Vec<String> = vec!["-hide_banner".into()];
        args.push(if self.overwrite { "-y" } else { "-n" }.into());

        args.extend(["-ss".into(), start.clone(), "-t".into(), duration.clone()]);
        args.extend(["-i".into(), path_arg(job.input())]);

        let passthrough = job
            .subtitles()
            .filter(|spec| spec.mode() == SubtitleMode::Passthrough);
        if let Some(SubtitleSource::File(path)) = passthrough.map(|s| s.source()) {
            args.extend(["-ss".into(), start, "-t".into(), duration]);
            args.extend(["-i".into(), path_arg(path)]);
        }

        if let Some(graph) = build_video_graph(job) {
            args.extend(["-vf".into(), graph]);
        }

        if job.strip_audio() {
            args.push("-an".into());
        } else if let Some(chain) = atempo_chain(job.speed()) {
            args.extend(["-af".into(), chain]);
        }

        if let Some(spec) = passthrough {
            args.extend(["-map".into(), "0:v:0".into()]);
            if !job.strip_audio() {
                args.extend(["-map".into(), "0:a?".into()]);
            }
            let subtitle_map = match spec.source() {
                SubtitleSource::Embedded(index) => format!("0:s:{}", index),
                SubtitleSource::File(_) => "1:0".to_string(),
            };
            args.extend(["-map".into(), subtitle_map]);
            let codec = if is_mp4_family(job.output()) { "mov_text" } else { "copy" };
            args.extend(["-c:s".into(), codec.into()]);
        }

        if is_mp4_family(job.output()) {
            args.extend(["-movflags".into(), "+faststart".into()]);
        }

        args.extend(profile.to_args(!job.strip_audio()));
        args.push(path_arg(job.output()));

        debug!(profile = %profile.name, args = ?args, "Built encoder arguments");
        Ok(args)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn is_mp4_family(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MP4_FAMILY.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FilterOp, Overlay, SubtitleSpec};
    use crate::domain::timecode::Timecode;

    fn tc(text: &str) -> Timecode {
        Timecode::parse(text).unwrap()
    }

    fn builder() -> CommandBuilder {
        CommandBuilder::new(Arc::new(ProfileTable::builtin()))
    }

    fn job() -> crate::domain::model::JobBuilder {
        Job::builder("a.mp4", "out.mp4", tc("00:00:10.000"), tc("00:00:20.000")).profile("fast")
    }

    #[test]
    fn test_minimal_arguments() {
        let args = builder().build_arguments(&job().build().unwrap()).unwrap();
        assert_eq!(
            args,
            vec![
                "-hide_banner", "-y", "-ss", "00:00:10.000", "-t", "00:00:10.000", "-i", "a.mp4",
                "-movflags", "+faststart", "-c:v", "libx264", "-preset", "ultrafast", "-crf", "23",
                "-c:a", "aac", "-b:a", "128k", "out.mp4",
            ]
        );
    }

    #[test]
    fn test_unknown_profile() {
        let job = job().profile("extreme").build().unwrap();
        assert!(matches!(
            builder().build_arguments(&job),
            Err(CutterError::UnsupportedProfile { .. })
        ));
    }

    #[test]
    fn test_output_equals_input() {
        let job = Job::builder("a.mp4", "a.mp4", tc("00:00:01.000"), tc("00:00:02.000"))
            .build()
            .unwrap();
        assert!(matches!(
            builder().build_arguments(&job),
            Err(CutterError::InvalidJob { .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let make = || {
            job()
                .filter(FilterOp::scale(1280, 720))
                .overlay(Overlay::text("one", 0, 0))
                .build()
                .unwrap()
        };
        let b = builder();
        assert_eq!(b.build_arguments(&make()).unwrap(), b.build_arguments(&make()).unwrap());
    }

    #[test]
    fn test_overlay_order_only_changes_graph() {
        let first = Overlay::text("first", 0, 0);
        let second = Overlay::text("second", 50, 50).with_opacity(0.5);
        let ab = job().overlay(first.clone()).overlay(second.clone()).build().unwrap();
        let ba = job().overlay(second).overlay(first).build().unwrap();

        let b = builder();
        let args_ab = b.build_arguments(&ab).unwrap();
        let args_ba = b.build_arguments(&ba).unwrap();
        assert_eq!(args_ab.len(), args_ba.len());

        let graph_pos = args_ab.iter().position(|a| a == "-vf").unwrap() + 1;
        for (i, (x, y)) in args_ab.iter().zip(&args_ba).enumerate() {
            if i != graph_pos {
                assert_eq!(x, y);
            }
        }
        let graph_ab: Vec<&str> = args_ab[graph_pos].split(',').collect();
        let graph_ba: Vec<&str> = args_ba[graph_pos].split(',').collect();
        assert_ne!(graph_ab, graph_ba);
        assert!(args_ab[graph_pos].starts_with("drawtext=text=first"));
        assert!(args_ba[graph_pos].starts_with("drawtext=text=second"));
    }

    #[test]
    fn test_profile_arguments_come_last() {
        let job = job()
            .filter(FilterOp::eq(0.1, 1.2, 1.0))
            .profile("high_quality")
            .build()
            .unwrap();
        let args = builder().build_arguments(&job).unwrap();
        let tail: Vec<&str> = args[args.len() - 11..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec!["-c:v", "libx264", "-preset", "slow", "-crf", "18", "-c:a", "aac", "-b:a", "256k", "out.mp4"]
        );
    }

    #[test]
    fn test_speed_and_no_audio() {
        let args = builder()
            .build_arguments(&job().speed(2.0).build().unwrap())
            .unwrap();
        let af = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[af + 1], "atempo=2");

        let args = builder()
            .build_arguments(&job().speed(2.0).strip_audio().build().unwrap())
            .unwrap();
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"-af".to_string()));
        assert!(!args.contains(&"-c:a".to_string()));
    }

    #[test]
    fn test_embedded_passthrough_maps_stream() {
        let job = job()
            .subtitles(SubtitleSpec::passthrough(SubtitleSource::Embedded(2)))
            .build()
            .unwrap();
        let args = builder().build_arguments(&job).unwrap();
        let joined = args.join(" ");
        assert!(joined.contains("-map 0:v:0 -map 0:a? -map 0:s:2 -c:s mov_text"));
        assert!(!args.contains(&"-vf".to_string()));
    }

    #[test]
    fn test_external_passthrough_adds_input() {
        let job = Job::builder("a.mkv", "out.mkv", tc("00:00:10.000"), tc("00:00:20.000"))
            .subtitles(SubtitleSpec::passthrough(SubtitleSource::File("subs.srt".into())))
            .build()
            .unwrap();
        let joined = builder().build_arguments(&job).unwrap().join(" ");
        assert!(joined.contains(
            "-i a.mkv -ss 00:00:10.000 -t 00:00:10.000 -i subs.srt -map 0:v:0 -map 0:a? -map 1:0 -c:s copy"
        ));
        assert!(!joined.contains("faststart"));
    }

    #[test]
    fn test_burn_in_never_maps() {
        let job = job()
            .subtitles(SubtitleSpec::burn_in(SubtitleSource::File("subs.srt".into()), None))
            .build()
            .unwrap();
        let args = builder().build_arguments(&job).unwrap();
        assert!(!args.contains(&"-map".to_string()));
        assert!(args.contains(&"-vf".to_string()));
    }

    #[test]
    fn test_paths_are_single_tokens() {
        let job = Job::builder(
            "my clip; rm -rf ~.mp4",
            "out $(whoami).mkv",
            tc("00:00:00.000"),
            tc("00:00:01.000"),
        )
        .build()
        .unwrap();
        let args = builder().overwrite(false).build_arguments(&job).unwrap();
        assert!(args.contains(&"my clip; rm -rf ~.mp4".to_string()));
        assert_eq!(args.last().unwrap(), "out $(whoami).mkv");
        assert_eq!(args[1], "-n");
    }
}

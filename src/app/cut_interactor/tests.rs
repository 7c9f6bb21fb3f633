// Unit tests for the cut interactor

#[cfg(test)]
mod tests {
    use crate::app::cut_interactor::*;
    use crate::domain::model::{JobOutcome, StreamInfo, StreamKind};
    use crate::domain::profiles::ProfileTable;
    use crate::domain::timecode::FrameRate;
    use crate::engine::{NullSink, ProgressSink};
    use crate::error::CutterError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn media(path: &Path, with_audio: bool) -> MediaInfo {
        let mut streams = vec![StreamInfo {
            index: 0,
            kind: StreamKind::Video,
            codec: "h264".into(),
            width: Some(1280),
            height: Some(720),
            channels: None,
            sample_rate: None,
            language: None,
        }];
        if with_audio {
            streams.push(StreamInfo {
                index: 1,
                kind: StreamKind::Audio,
                codec: "aac".into(),
                width: None,
                height: None,
                channels: Some(2),
                sample_rate: Some(44100),
                language: None,
            });
        }
        MediaInfo {
            path: path.to_path_buf(),
            duration: Timecode::from_millis(30_000),
            frame_rate: FrameRate::new(25, 1).unwrap(),
            streams,
            format_name: None,
            bit_rate: None,
            size_bytes: None,
        }
    }

    /// Replays scripted results; succeeds once the script runs out
    struct ScriptedProbe {
        calls: AtomicUsize,
        script: Mutex<VecDeque<CutterError>>,
        with_audio: bool,
    }

    impl ScriptedProbe {
        fn new(errors: Vec<CutterError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(errors.into()),
                with_audio: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProbePort for ScriptedProbe {
        async fn probe(&self, path: &Path) -> CutterResult<MediaInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(error) => Err(error),
                None => Ok(media(path, self.with_audio)),
            }
        }
    }

    fn timeout_error() -> CutterError {
        CutterError::ProbeTimeout {
            path: "a.mp4".into(),
            timeout: Duration::from_millis(10),
        }
    }

    fn interactor(probe: Arc<ScriptedProbe>, encoder: EncoderSettings) -> CutInteractor {
        CutInteractor::new(
            probe as Arc<dyn ProbePort>,
            Arc::new(CommandBuilder::new(Arc::new(ProfileTable::builtin()))),
            encoder,
        )
    }

    fn ffmpeg() -> EncoderSettings {
        EncoderSettings::new("ffmpeg", SupervisorConfig::default())
    }

    fn source() -> tempfile::NamedTempFile {
        tempfile::Builder::new().suffix(".mp4").tempfile().unwrap()
    }

    #[tokio::test]
    async fn test_retryable_probe_failure_retried_once() {
        let file = source();
        let probe = ScriptedProbe::new(vec![timeout_error()]);
        let cut = interactor(Arc::clone(&probe), ffmpeg());

        let prepared = cut
            .prepare(CutRequest::new(file.path(), "5", "0:15"))
            .await
            .unwrap();
        assert_eq!(probe.calls(), 2);
        assert_eq!(prepared.job.start(), Timecode::from_millis(5_000));
        assert_eq!(prepared.job.end(), Timecode::from_millis(15_000));
    }

    #[tokio::test]
    async fn test_second_probe_failure_surfaces() {
        let file = source();
        let probe = ScriptedProbe::new(vec![timeout_error(), timeout_error()]);
        let cut = interactor(Arc::clone(&probe), ffmpeg());

        let result = cut.prepare(CutRequest::new(file.path(), "5", "15")).await;
        assert!(matches!(result, Err(CutterError::ProbeTimeout { .. })));
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_probe_not_retried() {
        let file = source();
        let probe = ScriptedProbe::new(vec![CutterError::ProbeUnavailable {
            message: "no such file".into(),
        }]);
        let cut = interactor(Arc::clone(&probe), ffmpeg());

        let result = cut.prepare(CutRequest::new(file.path(), "5", "15")).await;
        assert!(matches!(result, Err(CutterError::ProbeUnavailable { .. })));
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn test_bad_timecode_fails_before_probing() {
        let probe = ScriptedProbe::new(Vec::new());
        let cut = interactor(Arc::clone(&probe), ffmpeg());

        let result = cut.prepare(CutRequest::new("a.mp4", "later", "15")).await;
        assert!(matches!(result, Err(CutterError::TimecodeFormat { .. })));
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_input_is_invalid() {
        let probe = ScriptedProbe::new(Vec::new());
        let cut = interactor(Arc::clone(&probe), ffmpeg());

        let result = cut
            .prepare(CutRequest::new("/no/such/input.mp4", "1", "2"))
            .await;
        assert!(matches!(result, Err(CutterError::InvalidJob { .. })));
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn test_end_past_source_rejected() {
        let file = source();
        let cut = interactor(ScriptedProbe::new(Vec::new()), ffmpeg());
        let result = cut.prepare(CutRequest::new(file.path(), "10", "45")).await;
        assert!(matches!(result, Err(CutterError::InvalidJob { .. })));
    }

    #[tokio::test]
    async fn test_default_output_and_silent_source() {
        let file = source();
        let probe = Arc::new(ScriptedProbe {
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            with_audio: false,
        });
        let cut = interactor(probe, ffmpeg());

        let prepared = cut
            .prepare(CutRequest::new(file.path(), "00:00:01", "00:00:02.5"))
            .await
            .unwrap();
        let name = prepared.job.output().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_cut_00h00m01s-00h00m02s.mp4"));
        assert_eq!(prepared.job.output().parent(), file.path().parent());
        assert!(prepared.job.strip_audio());
        assert!(prepared.args.contains(&"-an".to_string()));
        assert_eq!(
            prepared.args.last().unwrap().as_str(),
            prepared.job.output().to_str().unwrap()
        );
    }

    #[tokio::test]
    async fn test_unknown_profile_rejected() {
        let file = source();
        let cut = interactor(ScriptedProbe::new(Vec::new()), ffmpeg());
        let mut request = CutRequest::new(file.path(), "1", "2");
        request.profile = "lossless".into();
        assert!(matches!(
            cut.prepare(request).await,
            Err(CutterError::UnsupportedProfile { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_runs_encoder_and_reports() {
        let file = source();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");

        let mut encoder = EncoderSettings::new("/bin/sh", SupervisorConfig::default());
        encoder.leading_args = vec![
            "-c".into(),
            "for last; do :; done; \
             printf 'frame=  125 fps=25 q=28.0 size=  256kB time=00:00:05.00 bitrate= 419.4kbits/s speed=5.0x\\r' >&2; \
             printf 'clip' > \"$last\""
                .into(),
            "stub".into(),
        ];
        let cut = interactor(ScriptedProbe::new(Vec::new()), encoder);

        let mut request = CutRequest::new(file.path(), "00:00:10", "00:00:20");
        request.output = Some(out.clone());
        request.profile = "fast".into();
        let sink: Arc<dyn ProgressSink> = Arc::new(NullSink);
        let run = cut.execute(request, sink).await.unwrap();
        assert_eq!(run.job().profile(), "fast");

        let report = run.finish().await.unwrap();
        assert_eq!(report.outcome, JobOutcome::Succeeded { output: out.clone() });
        assert_eq!(report.clip_duration, Timecode::from_millis(10_000));
        assert!(report.finished_at >= report.started_at);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "clip");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_canceller_stops_run() {
        let file = source();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");

        let mut encoder = EncoderSettings::new(
            "/bin/sh",
            SupervisorConfig {
                grace_period: Duration::from_millis(200),
                diagnostic_tail_lines: 5,
            },
        );
        encoder.leading_args = vec!["-c".into(), "exec sleep 30".into(), "stub".into()];
        let cut = interactor(ScriptedProbe::new(Vec::new()), encoder);

        let mut request = CutRequest::new(file.path(), "1", "2");
        request.output = Some(out);
        let run = cut.execute(request, Arc::new(NullSink)).await.unwrap();
        run.canceller().cancel().unwrap();
        let report = run.finish().await.unwrap();
        assert_eq!(report.outcome, JobOutcome::Cancelled);
    }
}

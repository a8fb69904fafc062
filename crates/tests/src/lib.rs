//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 → Supervisor → CaptureUnit → ChunkWriter 全链路
//! - 合成设备 e2e 测试（无需硬件）
//! - 时间按比例缩小的会话场景

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::SensorRole::ALL.len(), 5);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{SensorRole, SessionBlueprint, SessionDuration, Termination};
    use devices::BackendRegistry;
    use supervisor::{SessionPhase, Supervisor};
    use tokio_util::sync::CancellationToken;

    fn blueprint(output_root: &Path, sensors: &str) -> SessionBlueprint {
        let content = format!(
            r#"
[session]
name = "e2e"
warmup_secs = 0.2
drain_grace_secs = 2.0
output_root = "{}"

{sensors}
"#,
            output_root.display()
        );
        ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap()
    }

    /// Chunk files of one role directory, in name order
    fn chunk_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
    }

    /// First pixel of every page of a float TIFF stack
    fn first_pixels(path: &Path) -> Vec<f32> {
        let file = fs::File::open(path).unwrap();
        let mut decoder = tiff::decoder::Decoder::new(file).unwrap();
        let mut pixels = Vec::new();
        loop {
            match decoder.read_image().unwrap() {
                tiff::decoder::DecodingResult::F32(page) => pixels.push(page[0]),
                other => panic!("unexpected sample type: {other:?}"),
            }
            if !decoder.more_images() {
                break;
            }
            decoder.next_image().unwrap();
        }
        pixels
    }

    /// Thermal scenario with time scaled down 10x: 0.2 s chunks over 0.5 s.
    ///
    /// Expect at least two periodic chunks plus the final partial flush, each
    /// a contiguous slice of the frame sequence.
    #[tokio::test]
    async fn test_e2e_thermal_chunks_are_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(
            dir.path(),
            r#"
[sensors.thermal]
fps = 20.0
resolution = { width = 8, height = 6 }
chunk_duration_secs = 0.2
"#,
        );

        let report = Supervisor::new(bp, Arc::new(BackendRegistry))
            .with_duration(SessionDuration::Bounded(Duration::from_millis(500)))
            .run(CancellationToken::new())
            .await
            .unwrap();

        let outcome = report.outcome(SensorRole::Thermal).unwrap();
        assert!(matches!(outcome.termination, Termination::DurationElapsed));
        assert_eq!(outcome.write_failures, 0);

        let files = chunk_files(&dir.path().join("thermal"));
        assert!(files.len() >= 2, "only {} chunk files", files.len());
        assert_eq!(files.len() as u64, outcome.chunks_written);
        for file in &files {
            let name = file.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("e2e_") && name.ends_with(".tiff"), "{name}");
        }

        // synthetic thermal frames drift by one centi-kelvin per frame
        let pixels: Vec<f32> = files.iter().flat_map(|f| first_pixels(f)).collect();
        assert_eq!(pixels.len() as u64, outcome.frames_captured);
        for pair in pixels.windows(2) {
            assert!(
                (pair[1] - pair[0] - 0.01).abs() < 1e-3,
                "frames out of order or missing: {pair:?}"
            );
        }
    }

    /// The device ending mid-session is a normal termination with one final
    /// flush holding every frame.
    #[tokio::test]
    async fn test_e2e_device_end_flushes_once() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(
            dir.path(),
            r#"
[sensors.thermal]
fps = 50.0
resolution = { width = 8, height = 6 }
chunk_duration_secs = 60.0
frame_limit = 2
"#,
        );

        let report = Supervisor::new(bp, Arc::new(BackendRegistry))
            .with_duration(SessionDuration::Bounded(Duration::from_secs(30)))
            .run(CancellationToken::new())
            .await
            .unwrap();

        let outcome = report.outcome(SensorRole::Thermal).unwrap();
        assert!(matches!(outcome.termination, Termination::DeviceEnded));
        assert_eq!(outcome.frames_captured, 2);
        assert_eq!(outcome.chunks_written, 1);
        assert!(report.elapsed < Duration::from_secs(30));

        let files = chunk_files(&dir.path().join("thermal"));
        assert_eq!(files.len(), 1);
        assert_eq!(first_pixels(&files[0]).len(), 2);
    }

    /// Missing `chunk_duration_secs` is a configuration error before any
    /// output directory or device context exists.
    #[test]
    fn test_e2e_missing_chunk_duration_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let content = format!(
            r#"
[session]
name = "e2e"
output_root = "{}"

[sensors.thermal]
fps = 8.0
resolution = {{ width = 160, height = 120 }}
"#,
            root.display()
        );

        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert!(err.is_configuration(), "got: {err}");
        assert!(!root.exists());
    }

    /// Every role writes its own directory with its own container.
    #[tokio::test]
    async fn test_e2e_multi_role_session() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(
            dir.path(),
            r#"
[sensors.thermal]
fps = 10.0
resolution = { width = 8, height = 6 }
chunk_duration_secs = 0.2

[sensors.depth]
fps = 10.0
resolution = { width = 8, height = 6 }
chunk_duration_secs = 0.2

[sensors.audio]
sampling_rate = 8000
channels = 1
chunk_duration_secs = 0.2

[sensors.rgb]
fps = 10.0
resolution = { width = 16, height = 8 }
chunk_duration_secs = 0.2
"#,
        );

        let supervisor = Supervisor::new(bp, Arc::new(BackendRegistry))
            .with_duration(SessionDuration::Bounded(Duration::from_millis(400)));
        let state = supervisor.subscribe();
        let report = supervisor.run(CancellationToken::new()).await.unwrap();

        assert!(report.is_clean(), "{:?}", report.unit_lines());
        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.barrier_arrivals, 4);
        assert!(report.stragglers.is_empty());
        assert_eq!(state.borrow().phase, SessionPhase::Terminated);
        assert!(state.borrow().start_released);

        for (role, ext) in [
            ("thermal", "tiff"),
            ("depth", "tiff"),
            ("audio", "wav"),
            ("rgb", "mjpeg"),
        ] {
            let files = chunk_files(&dir.path().join(role));
            assert!(!files.is_empty(), "{role} wrote nothing");
            for file in &files {
                assert_eq!(file.extension().unwrap(), ext);
                assert!(fs::metadata(file).unwrap().len() > 0);
            }
        }

        let wav = &chunk_files(&dir.path().join("audio"))[0];
        let reader = hound::WavReader::open(wav).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.spec().channels, 1);
        assert!(reader.len() > 0);
    }

    /// Operator interrupt on an unbounded session: every unit final-flushes.
    #[tokio::test]
    async fn test_e2e_interrupt_unbounded_session() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(
            dir.path(),
            r#"
[sensors.thermal]
fps = 20.0
resolution = { width = 8, height = 6 }
chunk_duration_secs = 600.0

[sensors.audio]
sampling_rate = 8000
channels = 2
chunk_duration_secs = 600.0
"#,
        );

        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(bp, Arc::new(BackendRegistry))
            .with_duration(SessionDuration::Unbounded);
        let mut state = supervisor.subscribe();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            let _ = state
                .wait_for(|s| s.phase == SessionPhase::Capturing)
                .await;
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let report = supervisor.run(cancel).await.unwrap();
        assert!(report.cancelled);
        for outcome in &report.outcomes {
            assert!(
                matches!(outcome.termination, Termination::Cancelled),
                "{}: {}",
                outcome.role,
                outcome.termination
            );
            assert!(outcome.frames_captured > 0);
            assert_eq!(outcome.chunks_written, 1);
        }
        assert_eq!(chunk_files(&dir.path().join("thermal")).len(), 1);
        assert_eq!(chunk_files(&dir.path().join("audio")).len(), 1);
    }
}

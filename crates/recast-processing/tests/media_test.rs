mod helpers;

use std::process::Command;

use helpers::fixtures::create_test_wav;
use helpers::{assert_monotonic, ffmpeg_available, init_tracing, recording_sink};
use recast_core::{ConversionErrorKind, ConversionRequest, ConversionSettings, EngineConfig, SourceFile};
use recast_processing::ConversionCoordinator;

fn wav_request(target: &str) -> ConversionRequest {
    ConversionRequest::new(
        SourceFile::new("tone.wav", create_test_wav(500)),
        target,
        ConversionSettings::default(),
    )
}

#[tokio::test]
async fn test_wav_to_mp3() {
    init_tracing();
    if !ffmpeg_available() {
        eprintln!("Skipping test: ffmpeg not available");
        return;
    }

    let coordinator = ConversionCoordinator::new(&EngineConfig::default());
    let (sink, seen) = recording_sink();
    let result = coordinator.convert_with_sink(wav_request("mp3"), sink).await;

    let artifact = result.artifact().expect("wav to mp3 should succeed");
    assert_eq!(artifact.mime_type, "audio/mpeg");
    assert_eq!(artifact.file_name, "tone.mp3");
    assert!(!artifact.is_empty());

    let progress = seen.lock().unwrap().clone();
    assert_monotonic(&progress);
    for milestone in [0, 10, 30, 50, 95, 100] {
        assert!(progress.contains(&milestone), "missing {} in {:?}", milestone, progress);
    }
}

#[tokio::test]
async fn test_wav_to_flac_and_back() {
    init_tracing();
    if !ffmpeg_available() {
        eprintln!("Skipping test: ffmpeg not available");
        return;
    }

    let coordinator = ConversionCoordinator::default();
    let flac = coordinator.convert(wav_request("flac"), |_| {}).await;
    let flac = flac.artifact().expect("wav to flac should succeed").clone();
    assert_eq!(&flac.data[..4], b"fLaC");

    let request = ConversionRequest::new(
        SourceFile::new(flac.file_name.clone(), flac.data.clone()),
        "wav",
        ConversionSettings::default(),
    );
    let wav = coordinator.convert(request, |_| {}).await;
    assert_eq!(&wav.artifact().expect("flac to wav should succeed").data[..4], b"RIFF");
}

/// One-second silent 320x240 MP4 generated by FFmpeg's test source.
fn create_test_clip() -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    let status = Command::new("ffmpeg")
        .args(["-v", "error", "-f", "lavfi", "-i", "testsrc=size=320x240:rate=10:duration=1"])
        .args(["-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success(), "ffmpeg could not generate the test clip");
    std::fs::read(&path).unwrap()
}

/// `width,height` of the first video stream in `data`.
fn video_dimensions(data: &[u8], extension: &str) -> String {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(format!("out.{}", extension));
    std::fs::write(&path, data).unwrap();
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0"])
        .args(["-show_entries", "stream=width,height", "-of", "csv=p=0"])
        .arg(&path)
        .output()
        .unwrap();
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[tokio::test]
async fn test_mp4_to_webm_scaled() {
    init_tracing();
    if !ffmpeg_available() {
        eprintln!("Skipping test: ffmpeg not available");
        return;
    }

    let coordinator = ConversionCoordinator::default();
    let (sink, seen) = recording_sink();
    let request = ConversionRequest::new(
        SourceFile::new("clip.mp4", create_test_clip()),
        "webm",
        ConversionSettings {
            width: 160,
            ..Default::default()
        },
    );
    let result = coordinator.convert_with_sink(request, sink).await;

    let artifact = result.artifact().expect("mp4 to webm should succeed");
    assert_eq!(artifact.mime_type, "video/webm");
    assert_eq!(artifact.file_name, "clip.webm");
    // EBML magic
    assert_eq!(&artifact.data[..4], &[0x1a, 0x45, 0xdf, 0xa3]);
    assert_eq!(video_dimensions(&artifact.data, "webm"), "160,120");

    let progress = seen.lock().unwrap().clone();
    assert_monotonic(&progress);
    for milestone in [0, 10, 30, 50, 95, 100] {
        assert!(progress.contains(&milestone), "missing {} in {:?}", milestone, progress);
    }
}

#[tokio::test]
async fn test_garbage_audio_fails() {
    init_tracing();
    if !ffmpeg_available() {
        eprintln!("Skipping test: ffmpeg not available");
        return;
    }

    let coordinator = ConversionCoordinator::default();
    let request = ConversionRequest::new(
        SourceFile::new("noise.mp3", vec![0u8; 256]),
        "wav",
        ConversionSettings::default(),
    );
    let result = coordinator.convert(request, |_| {}).await;
    // Depending on the FFmpeg build, the demuxer rejects the input or the muxer gets no stream.
    assert!(matches!(
        result.error_kind(),
        Some(ConversionErrorKind::DecodeFailure | ConversionErrorKind::EncodeFailure)
    ));
}

#[tokio::test]
async fn test_missing_engine_fails_every_time() {
    init_tracing();
    let config = EngineConfig {
        ffmpeg_path: "/nonexistent/recast/ffmpeg".to_string(),
        ffprobe_path: "/nonexistent/recast/ffprobe".to_string(),
        ..Default::default()
    };
    let coordinator = ConversionCoordinator::new(&config);

    // A failed load is not cached: the second request tries again and fails the same way.
    for _ in 0..2 {
        let (sink, seen) = recording_sink();
        let result = coordinator.convert_with_sink(wav_request("mp3"), sink).await;
        assert_eq!(result.error_kind(), Some(ConversionErrorKind::EngineInitFailure));
        assert_eq!(seen.lock().unwrap().clone(), vec![0, 10]);
    }

    // Video shares the same engine.
    let request = ConversionRequest::new(
        SourceFile::new("clip.mp4", vec![0u8; 64]),
        "webm",
        ConversionSettings::default(),
    );
    let result = coordinator.convert(request, |_| {}).await;
    assert_eq!(result.error_kind(), Some(ConversionErrorKind::EngineInitFailure));
}

//! Conversion through the real ffmpeg binary
//!
//! Skipped when ffmpeg is not on the PATH or lacks the MP3 encoder.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

use crate::integration::fixtures::{dir_entries, test_store};
use crate::transcode::{AudioFormat, ConversionPipeline, FfmpegTranscoder};

async fn ffmpeg_available() -> bool {
    let output = match Command::new("ffmpeg").arg("-hide_banner").arg("-encoders").output().await {
        Ok(output) if output.status.success() => output,
        _ => {
            eprintln!("Skipping test: ffmpeg not found");
            return false;
        }
    };
    let encoders = String::from_utf8_lossy(&output.stdout);
    if !encoders.contains("libmp3lame") {
        eprintln!("Skipping test: ffmpeg built without libmp3lame");
        return false;
    }
    true
}

/// Two second test pattern with a sine tone
async fn generate_clip(path: &Path) {
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "lavfi", "-i", "testsrc=duration=2:size=160x120:rate=10"])
        .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=2"])
        .args(["-c:v", "mpeg4", "-c:a", "aac", "-shortest", "-f", "mp4"])
        .arg(path)
        .status()
        .await
        .unwrap();
    assert!(status.success(), "failed to generate test clip");
}

async fn convert_clip(format: AudioFormat, magic: &[u8]) {
    if !ffmpeg_available().await {
        return;
    }

    let dir = TempDir::new().unwrap();
    let store = test_store(&dir).await;
    let upload = store.new_upload();
    generate_clip(upload.path()).await;

    let pipeline = ConversionPipeline::new(
        Arc::new(FfmpegTranscoder::new("ffmpeg")),
        Some(Duration::from_secs(60)),
    );
    let file_name = pipeline.convert(&store, upload, format).await.unwrap();

    assert!(file_name.ends_with(&format!(".{}", format.extension())));
    assert!(dir_entries(store.uploads_dir()).is_empty());
    assert_eq!(dir_entries(store.outputs_dir()), vec![file_name.clone()]);

    let data = std::fs::read(store.outputs_dir().join(&file_name)).unwrap();
    assert!(data.starts_with(magic), "unexpected header for {}", format);
}

#[tokio::test]
async fn test_ffmpeg_converts_to_wav() {
    convert_clip(AudioFormat::Wav, b"RIFF").await;
}

#[tokio::test]
async fn test_ffmpeg_converts_to_flac() {
    convert_clip(AudioFormat::Flac, b"fLaC").await;
}

#[tokio::test]
async fn test_ffmpeg_rejects_garbage_input() {
    if !ffmpeg_available().await {
        return;
    }

    let dir = TempDir::new().unwrap();
    let store = test_store(&dir).await;
    let upload = store.new_upload();
    std::fs::write(upload.path(), b"definitely not a video").unwrap();

    let pipeline = ConversionPipeline::new(Arc::new(FfmpegTranscoder::new("ffmpeg")), None);
    let err = pipeline
        .convert(&store, upload, AudioFormat::Mp3)
        .await
        .unwrap_err();

    assert!(matches!(err, crate::error::ConvertError::Extract(_)));
    assert!(dir_entries(store.uploads_dir()).is_empty());
    assert!(dir_entries(store.outputs_dir()).is_empty());
}

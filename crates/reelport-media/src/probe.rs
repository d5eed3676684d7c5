//! FFprobe source metadata.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use reelport_models::Resolution;

use crate::error::{ConversionError, ConversionResult};

/// Metadata of a decoded video stream.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Whether the file carries an audio track
    pub has_audio: bool,
    /// Video codec name
    pub codec: String,
}

impl VideoMetadata {
    /// Frame dimensions as a [`Resolution`].
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a video file for the metadata the conversion needs.
///
/// Any failure to open or understand the file — missing path, ffprobe
/// unavailable, non-zero ffprobe exit, unparsable output, no video stream,
/// zero dimensions — is reported as [`ConversionError::SourceUnreadable`].
pub async fn probe_metadata(path: impl AsRef<Path>) -> ConversionResult<VideoMetadata> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConversionError::source_unreadable(
            path,
            "file does not exist",
        ));
    }

    which::which("ffprobe")
        .map_err(|_| ConversionError::source_unreadable(path, "ffprobe not found in PATH"))?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ConversionError::source_unreadable(path, format!("ffprobe failed to run: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConversionError::source_unreadable(
            path,
            format!("ffprobe exited with {:?}: {}", output.status.code(), stderr.trim()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| ConversionError::source_unreadable(path, format!("unparsable ffprobe output: {e}")))?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| ConversionError::source_unreadable(path, "no video stream found"))?;

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(ConversionError::source_unreadable(
            path,
            format!("video stream reports degenerate dimensions {width}x{height}"),
        ));
    }

    let duration_seconds = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(VideoMetadata {
        width,
        height,
        fps,
        duration_seconds,
        has_audio,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unreadable() {
        let err = probe_metadata("/definitely/not/here.mp4").await.unwrap_err();
        assert!(matches!(err, ConversionError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_ffprobe_json_shape() {
        let raw = r#"{
            "format": { "duration": "12.5" },
            "streams": [
                { "codec_type": "video", "codec_name": "h264",
                  "width": 1920, "height": 1080,
                  "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001" },
                { "codec_type": "audio", "codec_name": "aac" }
            ]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(probe.streams.len(), 2);
        assert_eq!(probe.format.duration.as_deref(), Some("12.5"));
    }
}

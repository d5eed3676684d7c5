//! Portrait conversion pipeline.
//!
//! The pipeline is five linear steps with no retries: probe the source,
//! plan the geometry, render the plan into an FFmpeg filter, encode to a
//! scratch file next to the destination, and promote the scratch file on
//! success. The destination path never holds a partial file.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::fs;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use reelport_models::{plan_transform, EncodingConfig, Resolution, TransformPlan};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{ConversionError, ConversionResult};
use crate::filters::build_video_filter;
use crate::fs_utils::move_file;
use crate::probe::{probe_metadata, VideoMetadata};

/// Containers the converter will write. Inputs are whatever the decoder
/// accepts; outputs are limited to containers that mux H.264 + AAC cleanly.
const SUPPORTED_OUTPUT_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv"];

/// Summary of one finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    /// Probed source metadata
    pub source: VideoMetadata,
    /// The geometric plan that was applied
    pub plan: TransformPlan,
    /// Dimensions of the written output
    pub output_resolution: Resolution,
    /// Wall-clock time spent converting
    pub elapsed_ms: u64,
}

/// Landscape-to-portrait video converter.
///
/// Stateless between calls: each [`convert`](Self::convert) owns its own
/// probe, child process, and scratch file, so concurrent conversions on
/// distinct paths are independent.
#[derive(Debug, Clone)]
pub struct PortraitConverter {
    target: Resolution,
    encoding: EncodingConfig,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl PortraitConverter {
    /// Create a converter targeting the default 1080x1920 portrait frame.
    pub fn new() -> Self {
        Self {
            target: Resolution::default(),
            encoding: EncodingConfig::default(),
            cancel_rx: None,
        }
    }

    /// Override the target resolution.
    pub fn with_target(mut self, target: Resolution) -> Self {
        self.target = target;
        self
    }

    /// Override the encoding configuration.
    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    /// Install a cooperative cancellation signal.
    ///
    /// When the sender flips the value to `true`, the running encode is
    /// killed, the scratch file removed, and the call returns
    /// [`ConversionError::Cancelled`].
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Convert `input` into a portrait video at `output`.
    ///
    /// Reads exactly one file at `input` and writes exactly one file at
    /// `output`, overwriting it if present. On any failure the output path
    /// is left untouched.
    pub async fn convert(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> ConversionResult<ConversionReport> {
        let input = input.as_ref();
        let output = output.as_ref();
        let started = Instant::now();

        if !self.target.is_valid() {
            return Err(ConversionError::InvalidTargetResolution {
                width: self.target.width,
                height: self.target.height,
            });
        }
        let extension = output_extension(output)?;

        let source = probe_metadata(input).await?;
        let source_res = source.resolution();
        let plan = plan_transform(source_res, self.target)?;
        let output_resolution = plan.output_resolution(source_res);

        info!(
            input = %input.display(),
            output = %output.display(),
            source = %source_res,
            "converting to portrait: {}",
            plan
        );

        let scratch = scratch_path(output, &extension);
        let filter = build_video_filter(&plan, source_res);

        let mut cmd = FfmpegCommand::new(input, &scratch)
            .video_filter(filter)
            .output_args(self.encoding.video_args());
        cmd = if source.has_audio {
            cmd.output_args(self.encoding.audio_args())
        } else {
            cmd.no_audio()
        };

        let mut runner = FfmpegRunner::new();
        if let Some(rx) = &self.cancel_rx {
            runner = runner.with_cancel(rx.clone());
        }

        let total_ms = (source.duration_seconds * 1000.0) as i64;
        let run = runner
            .run_with_progress(&cmd, move |p| {
                debug!(
                    frame = p.frame,
                    speed = p.speed,
                    "encoding {:.1}%",
                    p.percentage(total_ms)
                );
            })
            .await;

        if let Err(err) = run {
            remove_scratch(&scratch).await;
            return Err(err);
        }

        if let Err(err) = move_file(&scratch, output).await {
            remove_scratch(&scratch).await;
            return Err(err);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            output = %output.display(),
            resolution = %output_resolution,
            elapsed_ms,
            "conversion complete"
        );

        Ok(ConversionReport {
            source,
            plan,
            output_resolution,
            elapsed_ms,
        })
    }
}

impl Default for PortraitConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert `input` into a portrait video at `output` with default encoding.
pub async fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    target: Resolution,
) -> ConversionResult<()> {
    PortraitConverter::new()
        .with_target(target)
        .convert(input, output)
        .await
        .map(|_| ())
}

/// Validate and normalize the output container extension.
fn output_extension(output: &Path) -> ConversionResult<String> {
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| {
            ConversionError::encode_failure(
                format!("output path has no container extension: {}", output.display()),
                None,
                None,
            )
        })?;

    if !SUPPORTED_OUTPUT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ConversionError::encode_failure(
            format!("unsupported output container: .{extension}"),
            None,
            None,
        ));
    }

    Ok(extension)
}

/// Uniquely named scratch file next to the destination, same container.
///
/// Living in the destination directory keeps the final promotion a
/// same-filesystem rename in the common case.
fn scratch_path(output: &Path, extension: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    output.with_file_name(format!(
        "{stem}.{}.{extension}",
        Uuid::new_v4().simple()
    ))
}

async fn remove_scratch(scratch: &Path) {
    match fs::remove_file(scratch).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove scratch file {}: {}", scratch.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_extension_validation() {
        assert_eq!(output_extension(Path::new("a/b/out.mp4")).unwrap(), "mp4");
        assert_eq!(output_extension(Path::new("out.MKV")).unwrap(), "mkv");

        assert!(matches!(
            output_extension(Path::new("out.webm")),
            Err(ConversionError::EncodeFailure { .. })
        ));
        assert!(matches!(
            output_extension(Path::new("out")),
            Err(ConversionError::EncodeFailure { .. })
        ));
    }

    #[test]
    fn test_scratch_path_stays_in_output_directory() {
        let output = Path::new("/videos/final.mp4");
        let scratch = scratch_path(output, "mp4");

        assert_eq!(scratch.parent(), output.parent());
        assert_eq!(scratch.extension().unwrap(), "mp4");
        assert_ne!(scratch, output);

        // Unique per call
        assert_ne!(scratch, scratch_path(output, "mp4"));
    }

    #[tokio::test]
    async fn test_invalid_target_rejected_before_any_io() {
        let converter = PortraitConverter::new().with_target(Resolution::new(0, 1920));
        let err = converter
            .convert("/no/such/input.mp4", "/tmp/reelport-invalid-target.mp4")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConversionError::InvalidTargetResolution { width: 0, height: 1920 }
        ));
        assert!(!Path::new("/tmp/reelport-invalid-target.mp4").exists());
    }

    #[tokio::test]
    async fn test_missing_input_is_source_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");

        let err = PortraitConverter::new()
            .convert(dir.path().join("absent.mp4"), &output)
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::SourceUnreadable { .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_unsupported_output_container_rejected() {
        let err = PortraitConverter::new()
            .convert("/no/such/input.mp4", "/tmp/reelport-out.webm")
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::EncodeFailure { .. }));
    }
}

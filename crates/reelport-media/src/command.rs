//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{ConversionError, ConversionResult};
use crate::progress::FfmpegProgress;

/// Maximum number of stderr lines retained for error reporting.
const STDERR_TAIL_LINES: usize = 64;

/// Stderr markers indicating the failure happened on the decode side.
const DECODE_ERROR_MARKERS: &[&str] = &[
    "Error while decoding",
    "Invalid data found when processing input",
    "corrupt decoded frame",
    "Error submitting packet to decoder",
    "Failed to read frame",
];

/// Builder for FFmpeg command lines.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Output arguments (between -i and the output path)
    output_args: Vec<String>,
    /// Whether to overwrite the output file
    overwrite: bool,
    /// FFmpeg log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the video filter chain.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Disable the audio stream on output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Set the FFmpeg log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command line arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress telemetry to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress parsing and cooperative
/// cancellation.
///
/// The runner owns the child process for the duration of one `run` call and
/// guarantees the process is reaped or killed on every exit path. There is
/// deliberately no internal timeout; callers layer their own on top.
#[derive(Default)]
pub struct FfmpegRunner {
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { cancel_rx: None }
    }

    /// Set the cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> ConversionResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run an FFmpeg command, reporting progress batches to `on_progress`.
    ///
    /// Cancellation is checked between progress batches; on cancel the child
    /// process is killed and [`ConversionError::Cancelled`] returned. The
    /// caller is responsible for cleaning up any partial output file.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        mut on_progress: F,
    ) -> ConversionResult<()>
    where
        F: FnMut(FfmpegProgress),
    {
        which::which("ffmpeg")
            .map_err(|_| ConversionError::encode_failure("ffmpeg not found in PATH", None, None))?;

        let args = cmd.build_args();
        debug!("running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ConversionError::encode_failure(format!("failed to spawn ffmpeg: {e}"), None, None)
            })?;

        let stderr = child.stderr.take().expect("stderr not captured");
        let mut lines = BufReader::new(stderr).lines();

        let mut cancel_rx = self.cancel_rx.clone();
        let mut current = FfmpegProgress::default();
        let mut stderr_tail: Vec<String> = Vec::new();

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match parse_progress_line(&line, &mut current) {
                        ProgressParse::Emit(progress) => on_progress(progress),
                        ProgressParse::Consumed => {}
                        ProgressParse::Ignored => push_tail(&mut stderr_tail, line),
                    },
                    // EOF or a broken pipe both mean the child is done talking
                    Ok(None) | Err(_) => break,
                },
                _ = cancelled(&mut cancel_rx) => {
                    info!("cancellation requested, killing ffmpeg");
                    let _ = child.kill().await;
                    return Err(ConversionError::Cancelled);
                }
            }
        }

        let status = child.wait().await.map_err(|e| {
            ConversionError::encode_failure(format!("failed to wait for ffmpeg: {e}"), None, None)
        })?;

        // Late cancellation still aborts the conversion
        if let Some(ref rx) = self.cancel_rx {
            if *rx.borrow() {
                return Err(ConversionError::Cancelled);
            }
        }

        if status.success() {
            Ok(())
        } else {
            Err(classify_failure(status.code(), &stderr_tail))
        }
    }
}

/// Resolve when the cancellation signal becomes true; never resolve when no
/// signal is installed.
async fn cancelled(rx: &mut Option<watch::Receiver<bool>>) {
    match rx {
        Some(rx) => loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without cancelling
                std::future::pending::<()>().await;
            }
        },
        None => std::future::pending().await,
    }
}

/// Classify a non-zero FFmpeg exit into the conversion error taxonomy.
///
/// Mid-stream decode errors surface through stderr markers; everything else
/// is an encode failure carrying the stderr tail and exit code.
fn classify_failure(exit_code: Option<i32>, stderr_tail: &[String]) -> ConversionError {
    let stderr = stderr_tail.join("\n");

    if DECODE_ERROR_MARKERS.iter().any(|m| stderr.contains(m)) {
        return ConversionError::decode_failure(stderr);
    }

    ConversionError::encode_failure(
        "ffmpeg exited with non-zero status",
        if stderr.is_empty() { None } else { Some(stderr) },
        exit_code,
    )
}

fn push_tail(tail: &mut Vec<String>, line: String) {
    if line.trim().is_empty() {
        return;
    }
    if tail.len() == STDERR_TAIL_LINES {
        tail.remove(0);
    }
    tail.push(line);
}

/// Outcome of feeding one stderr line to the progress parser.
enum ProgressParse {
    /// A `progress=` line closed a batch; emit the accumulated state.
    Emit(FfmpegProgress),
    /// A telemetry key was folded into the accumulated state.
    Consumed,
    /// Not progress telemetry (a diagnostic line).
    Ignored,
}

/// Keys emitted by `-progress`; anything else on stderr is a diagnostic.
fn is_progress_key(key: &str) -> bool {
    matches!(
        key,
        "frame"
            | "fps"
            | "bitrate"
            | "total_size"
            | "out_time_us"
            | "out_time_ms"
            | "out_time"
            | "dup_frames"
            | "drop_frames"
            | "speed"
            | "progress"
    ) || key.starts_with("stream_")
}

/// Parse one line of FFmpeg's `-progress` output.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> ProgressParse {
    let line = line.trim();

    let Some((key, value)) = line.split_once('=') else {
        return ProgressParse::Ignored;
    };
    if !is_progress_key(key) {
        return ProgressParse::Ignored;
    }

    match key {
        "out_time_ms" | "out_time_us" => {
            // Despite the name, both keys are in microseconds in practice
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if value != "N/A" {
                if let Some(speed_str) = value.strip_suffix('x') {
                    if let Ok(speed) = speed_str.parse() {
                        current.speed = speed;
                    }
                }
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return ProgressParse::Emit(current.clone());
        }
        _ => {}
    }

    ProgressParse::Consumed
}

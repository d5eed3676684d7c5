#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and portrait conversion pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with progress parsing from
//!   `-progress pipe:2`
//! - Cooperative cancellation via tokio watch channels
//! - Source probing through ffprobe
//! - The landscape-to-portrait conversion pipeline

pub mod command;
pub mod convert;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use convert::{convert, ConversionReport, PortraitConverter};
pub use error::{ConversionError, ConversionResult};
pub use filters::build_video_filter;
pub use probe::{probe_metadata, VideoMetadata};
pub use progress::{FfmpegProgress, ProgressCallback};

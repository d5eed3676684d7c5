//! Shared data models for the Reelport portrait converter.
//!
//! This crate provides Serde-serializable types for:
//! - Pixel resolutions and crop windows
//! - The portrait transform plan and its planning function
//! - Encoding configuration

pub mod encoding;
pub mod resolution;
pub mod transform;

// Re-export common types
pub use encoding::EncodingConfig;
pub use resolution::{Resolution, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH};
pub use transform::{plan_transform, CropWindow, TransformError, TransformPlan, TransformResult};

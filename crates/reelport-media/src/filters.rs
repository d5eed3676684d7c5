//! FFmpeg video filter rendering.
//!
//! Turns a [`TransformPlan`] into a `-vf` filter chain. Output dimensions
//! are always computed in Rust and passed to `scale` explicitly; FFmpeg's
//! `-2` auto-rounding is never used because the output dimensions are part
//! of the conversion contract.

use reelport_models::{Resolution, TransformPlan};

/// Render the filter chain for a transform plan.
pub fn build_video_filter(plan: &TransformPlan, source: Resolution) -> String {
    match plan {
        TransformPlan::ResizeOnly { .. } => {
            let out = plan.output_resolution(source);
            format!("scale={}:{}", out.width, out.height)
        }
        TransformPlan::CropThenResize { crop, target } => {
            format!(
                "crop={}:{}:{}:{},scale={}:{}",
                crop.width(),
                crop.height(),
                crop.x1,
                crop.y1,
                target.width,
                target.height
            )
        }
    }
}

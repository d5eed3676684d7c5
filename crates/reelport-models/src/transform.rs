//! Portrait transform planning.
//!
//! A [`TransformPlan`] is the deterministic geometric recipe for turning a
//! source frame size into the requested portrait output: either a plain
//! proportional resize (source already portrait) or a centered horizontal
//! crop followed by an exact resize (source landscape or square).

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolution::Resolution;

/// Result type for transform planning.
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors produced while planning a transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("invalid target resolution {width}x{height}: both dimensions must be positive")]
    InvalidTargetResolution { width: u32, height: u32 },

    #[error("crop window collapsed (new_width={new_width}, x1={x1}, x2={x2})")]
    DegenerateCrop { new_width: i64, x1: i64, x2: i64 },
}

/// The horizontal pixel range retained from the source frame.
///
/// Spans `[x1, x2)` across the width; the full height is always kept
/// (`y1 == 0`, `y2 == source height`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CropWindow {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropWindow {
    /// Width of the cropped region in pixels.
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    /// Height of the cropped region in pixels.
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

impl fmt::Display for CropWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})x[{}, {})",
            self.x1, self.x2, self.y1, self.y2
        )
    }
}

/// The geometric recipe for one conversion, computed once and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TransformPlan {
    /// Source is already taller than wide: scale to the target height and
    /// let the width follow the source aspect ratio.
    ResizeOnly { target_height: u32 },

    /// Source is landscape or square: crop the centered vertical slice
    /// matching the target aspect ratio, then resize to exactly `target`.
    CropThenResize { crop: CropWindow, target: Resolution },
}

impl TransformPlan {
    /// Output dimensions this plan produces for the given source.
    ///
    /// The two branches are intentionally asymmetric: `ResizeOnly` forces
    /// only the height and derives the width from the source aspect ratio,
    /// while `CropThenResize` forces both target dimensions.
    pub fn output_resolution(&self, source: Resolution) -> Resolution {
        match self {
            TransformPlan::ResizeOnly { target_height } => {
                let width = (source.width as f64 * *target_height as f64
                    / source.height as f64)
                    .round() as u32;
                Resolution::new(width, *target_height)
            }
            TransformPlan::CropThenResize { target, .. } => *target,
        }
    }
}

impl fmt::Display for TransformPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformPlan::ResizeOnly { target_height } => {
                write!(f, "resize to height {}", target_height)
            }
            TransformPlan::CropThenResize { crop, target } => {
                write!(f, "crop {} then resize to {}", crop, target)
            }
        }
    }
}

/// Compute the transform plan for a source frame size and target resolution.
///
/// Pure function of its inputs: the same `(source, target)` pair always
/// yields the same plan. Crop arithmetic truncates toward zero, matching
/// `int()` semantics, so crop windows are reproducible across runs.
///
/// # Errors
///
/// - [`TransformError::InvalidTargetResolution`] if either target dimension
///   is zero.
/// - [`TransformError::DegenerateCrop`] if the computed crop window
///   collapses or falls outside the source frame (target aspect wider than
///   the source can supply).
pub fn plan_transform(source: Resolution, target: Resolution) -> TransformResult<TransformPlan> {
    if !target.is_valid() {
        return Err(TransformError::InvalidTargetResolution {
            width: target.width,
            height: target.height,
        });
    }

    // Already portrait: only the height is forced.
    if source.width < source.height {
        return Ok(TransformPlan::ResizeOnly {
            target_height: target.height,
        });
    }

    // Landscape or square: centered crop matching the target aspect ratio.
    // `as i64` truncates toward zero, like int().
    let new_width =
        (source.height as f64 * target.width as f64 / target.height as f64) as i64;
    let x_center = source.width as f64 / 2.0;
    let x1 = (x_center - new_width as f64 / 2.0) as i64;
    let x2 = (x_center + new_width as f64 / 2.0) as i64;

    if new_width <= 0 || x1 >= x2 || x1 < 0 || x2 > source.width as i64 {
        return Err(TransformError::DegenerateCrop { new_width, x1, x2 });
    }

    Ok(TransformPlan::CropThenResize {
        crop: CropWindow {
            x1: x1 as u32,
            y1: 0,
            x2: x2 as u32,
            y2: source.height,
        },
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portrait_source_resizes_only() {
        let plan = plan_transform(Resolution::new(720, 1280), Resolution::default()).unwrap();
        assert_eq!(plan, TransformPlan::ResizeOnly { target_height: 1920 });

        // Width follows the source aspect ratio: round(720 * 1920 / 1280)
        let out = plan.output_resolution(Resolution::new(720, 1280));
        assert_eq!(out, Resolution::new(1080, 1920));
    }

    #[test]
    fn test_landscape_source_crops_center() {
        let source = Resolution::new(1920, 1080);
        let plan = plan_transform(source, Resolution::default()).unwrap();

        match plan {
            TransformPlan::CropThenResize { crop, target } => {
                // new_width = trunc(1080 * 1080 / 1920) = 607
                // x1 = trunc(960 - 303.5) = 656 (truncation, not rounding)
                // x2 = trunc(960 + 303.5) = 1263
                assert_eq!(crop.x1, 656);
                assert_eq!(crop.x2, 1263);
                assert_eq!(crop.width(), 607);
                assert_eq!(crop.y1, 0);
                assert_eq!(crop.y2, 1080);
                assert_eq!(target, Resolution::new(1080, 1920));
            }
            other => panic!("expected crop plan, got {:?}", other),
        }

        // Crop branch forces both target dimensions exactly
        assert_eq!(plan.output_resolution(source), Resolution::new(1080, 1920));
    }

    #[test]
    fn test_square_source_takes_crop_branch() {
        let source = Resolution::new(1000, 1000);
        let plan = plan_transform(source, Resolution::default()).unwrap();

        match plan {
            TransformPlan::CropThenResize { crop, .. } => {
                // new_width = trunc(1000 * 1080 / 1920) = 562
                assert_eq!(crop.width(), 562);
                assert_eq!(crop.y2, 1000);
            }
            other => panic!("expected crop plan, got {:?}", other),
        }
    }

    #[test]
    fn test_odd_source_width() {
        // x_center lands on .5; both window ends come out whole
        let plan = plan_transform(Resolution::new(1919, 1080), Resolution::default()).unwrap();
        match plan {
            TransformPlan::CropThenResize { crop, .. } => {
                assert_eq!(crop.x1, 656);
                assert_eq!(crop.x2, 1263);
            }
            other => panic!("expected crop plan, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_target_rejected() {
        let source = Resolution::new(1920, 1080);
        assert_eq!(
            plan_transform(source, Resolution::new(0, 1920)),
            Err(TransformError::InvalidTargetResolution { width: 0, height: 1920 })
        );
        assert_eq!(
            plan_transform(source, Resolution::new(1080, 0)),
            Err(TransformError::InvalidTargetResolution { width: 1080, height: 0 })
        );
    }

    #[test]
    fn test_degenerate_crop_detected() {
        // Target aspect wider than the source can supply: the crop window
        // would extend past the frame edges.
        let result = plan_transform(Resolution::new(100, 100), Resolution::new(1920, 1080));
        assert!(matches!(result, Err(TransformError::DegenerateCrop { .. })));
    }

    #[test]
    fn test_planning_is_pure() {
        let source = Resolution::new(1920, 1080);
        let target = Resolution::default();
        let first = plan_transform(source, target).unwrap();
        let second = plan_transform(source, target).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.output_resolution(source),
            second.output_resolution(source)
        );
    }

    #[test]
    fn test_resize_width_rounds() {
        // 607 * 1920 / 1080 = 1079.11 -> rounds to 1079
        let plan = TransformPlan::ResizeOnly { target_height: 1920 };
        let out = plan.output_resolution(Resolution::new(607, 1080));
        assert_eq!(out.width, 1079);
        assert_eq!(out.height, 1920);
    }
}

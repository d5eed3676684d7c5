//! Pixel resolution value type.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default target width for portrait output (9:16).
pub const DEFAULT_TARGET_WIDTH: u32 = 1080;
/// Default target height for portrait output (9:16).
pub const DEFAULT_TARGET_HEIGHT: u32 = 1920;

/// A pixel resolution (width × height).
///
/// Used both for the configured output target and for derived dimensions
/// such as the source frame size or a crop window's extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a new resolution.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check that both dimensions are positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Portrait orientation: strictly taller than wide.
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Landscape orientation: at least as wide as tall (squares included).
    pub fn is_landscape(&self) -> bool {
        self.width >= self.height
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for Resolution {
    /// The default portrait target, 1080×1920.
    fn default() -> Self {
        Self {
            width: DEFAULT_TARGET_WIDTH,
            height: DEFAULT_TARGET_HEIGHT,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target() {
        let target = Resolution::default();
        assert_eq!(target.width, 1080);
        assert_eq!(target.height, 1920);
        assert!(target.is_portrait());
    }

    #[test]
    fn test_validity() {
        assert!(Resolution::new(1, 1).is_valid());
        assert!(!Resolution::new(0, 1920).is_valid());
        assert!(!Resolution::new(1080, 0).is_valid());
    }

    #[test]
    fn test_orientation() {
        assert!(Resolution::new(720, 1280).is_portrait());
        assert!(Resolution::new(1920, 1080).is_landscape());
        // Squares count as landscape
        assert!(Resolution::new(1000, 1000).is_landscape());
        assert!(!Resolution::new(1000, 1000).is_portrait());
    }

    #[test]
    fn test_display() {
        assert_eq!(Resolution::new(1920, 1080).to_string(), "1920x1080");
    }
}

//! Canvas-fit geometry engine.
//!
//! Pure functions that compute where an image is displayed inside a
//! viewport, where the crop box sits, how a display-space box maps back to
//! source pixels, and how a padded canvas is laid out. Nothing here touches
//! pixels or the filesystem.
//!
//! # Coordinate spaces
//!
//! Every rectangle carries the space it lives in as a type parameter:
//! [`Rect<Display>`] for on-screen (scaled) coordinates and
//! [`Rect<Source>`] for original image pixels. Converting between them goes
//! through [`FitResult::to_source_rect`] and [`FitResult::to_display_rect`].
//!
//! # Example
//!
//! ```
//! use cropfit_core::geometry::{compute_fit, initial_crop_box, AspectRatio, Dimensions};
//!
//! let source = Dimensions::new(1200.0, 800.0)?;
//! let viewport = Dimensions::new(1100.0, 640.0)?;
//! let fit = compute_fit(source, viewport)?;
//! let crop = initial_crop_box(&fit, AspectRatio::FOUR_THREE);
//! assert!((crop.height - fit.scaled_height).abs() < 1e-9);
//! # Ok::<(), cropfit_core::AppError>(())
//! ```

mod crop;
mod fit;
mod overlay;
mod padding;
mod ratio;

pub use crop::{
    clamp_crop_box, drag_crop_box, initial_crop_box, initial_crop_box_for_mode, PixelRect,
};
pub use fit::{compute_fit, FitResult};
pub use overlay::{mask_regions, thirds_grid, GuideLine, MaskRegions};
pub use padding::{plan_padding, BorderSpec, PlacementResult};
pub use ratio::{AspectRatio, AspectRatioMode};

use crate::error::{AppError, Result};
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Width and height in pixel units.
///
/// Used for source images, viewports and output canvases alike. Values
/// are real numbers so that scaled sizes can be carried without rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    /// Creates validated dimensions.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidDimensions`] unless both sides are finite
    /// and strictly positive.
    pub fn new(width: f64, height: f64) -> Result<Self> {
        let dims = Self { width, height };
        dims.validate()?;
        Ok(dims)
    }

    /// Dimensions of a decoded image.
    pub fn from_pixels(width: u32, height: u32) -> Result<Self> {
        Self::new(width as f64, height as f64)
    }

    /// Checks that both sides are finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(AppError::dimensions(self.width, self.height))
        }
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Rounds both sides to whole pixels, never below one.
    pub fn to_pixels(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Marker for on-screen coordinates (scaled image inside a viewport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Display;

/// Marker for original image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Source;

/// Axis-aligned rectangle, origin top-left, tagged with its coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect<S> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S> Rect<S> {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            space: PhantomData,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point as `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Same size, moved by the given delta.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// True if `other` lies fully inside `self`, with a small tolerance
    /// for floating point noise.
    pub fn contains_rect(&self, other: &Self) -> bool {
        const EPS: f64 = 1e-9;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_reject_non_positive_sides() {
        assert!(matches!(
            Dimensions::new(0.0, 500.0),
            Err(AppError::InvalidDimensions { .. })
        ));
        assert!(Dimensions::new(10.0, -1.0).is_err());
        assert!(Dimensions::new(f64::NAN, 10.0).is_err());
        assert!(Dimensions::new(f64::INFINITY, 10.0).is_err());
        assert!(Dimensions::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn to_pixels_rounds_and_floors_at_one() {
        let dims = Dimensions {
            width: 426.67,
            height: 0.2,
        };
        assert_eq!(dims.to_pixels(), (427, 1));
    }

    #[test]
    fn rect_helpers() {
        let r: Rect<Display> = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
        assert_eq!(r.center(), (25.0, 40.0));
        let moved = r.translate(-5.0, 5.0);
        assert_eq!((moved.x, moved.y, moved.width, moved.height), (5.0, 25.0, 30.0, 40.0));
        assert!(r.contains_rect(&Rect::new(10.0, 20.0, 30.0, 40.0)));
        assert!(!r.contains_rect(&moved));
    }
}

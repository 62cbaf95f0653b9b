//! Placing a source image inside a viewport.

use super::{Dimensions, Display, Rect, Source};
use crate::error::Result;
use serde::Serialize;

/// A source image scaled uniformly and centered inside a viewport.
///
/// Sizes and offsets are exact real values; rounding is left to whoever
/// renders them so that later geometry does not compound rounding error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitResult {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scaled_width: f64,
    pub scaled_height: f64,
    pub scale: f64,
}

/// Computes the uniform fit of `source` inside `viewport`.
///
/// `scale = min(viewport.width / source.width, viewport.height / source.height)`.
/// The binding axis is set to the viewport size exactly, so the placed image
/// always touches the viewport edge on at least one axis.
///
/// # Errors
/// Returns [`AppError::InvalidDimensions`](crate::AppError::InvalidDimensions)
/// if either input has a non-positive side.
pub fn compute_fit(source: Dimensions, viewport: Dimensions) -> Result<FitResult> {
    source.validate()?;
    viewport.validate()?;

    let scale_x = viewport.width / source.width;
    let scale_y = viewport.height / source.height;

    let (scale, scaled_width, scaled_height) = if scale_x <= scale_y {
        (scale_x, viewport.width, source.height * scale_x)
    } else {
        (scale_y, source.width * scale_y, viewport.height)
    };

    let fit = FitResult {
        offset_x: (viewport.width - scaled_width) / 2.0,
        offset_y: (viewport.height - scaled_height) / 2.0,
        scaled_width,
        scaled_height,
        scale,
    };
    tracing::debug!(%source, %viewport, scale, "computed display fit");
    Ok(fit)
}

impl FitResult {
    /// Where the scaled image sits in the viewport.
    pub fn placed_bounds(&self) -> Rect<Display> {
        Rect::new(
            self.offset_x,
            self.offset_y,
            self.scaled_width,
            self.scaled_height,
        )
    }

    /// Maps a display-space box to exact source pixel coordinates.
    ///
    /// No rounding or clamping happens here; see
    /// [`PixelRect::from_source_rect`](super::PixelRect::from_source_rect).
    pub fn to_source_rect(&self, rect: &Rect<Display>) -> Rect<Source> {
        Rect::new(
            (rect.x - self.offset_x) / self.scale,
            (rect.y - self.offset_y) / self.scale,
            rect.width / self.scale,
            rect.height / self.scale,
        )
    }

    /// Inverse of [`to_source_rect`](Self::to_source_rect).
    pub fn to_display_rect(&self, rect: &Rect<Source>) -> Rect<Display> {
        Rect::new(
            rect.x * self.scale + self.offset_x,
            rect.y * self.scale + self.offset_y,
            rect.width * self.scale,
            rect.height * self.scale,
        )
    }
}

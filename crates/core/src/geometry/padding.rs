//! Fit-with-border canvas planning.
//!
//! In pad mode the whole image is kept and composed onto a larger
//! background canvas. Two layouts exist:
//!
//! - `Original`: the canvas is the source plus a uniform margin derived
//!   from the longer side. The image is not scaled.
//! - Fixed ratio: the canvas is the smallest one of the target ratio that
//!   contains the source, and the image is shrunk into a content box that
//!   leaves `percent` of the canvas as border on every side.

use super::{compute_fit, AspectRatioMode, Dimensions, Display, FitResult, Rect};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Border width as a percentage of the canvas (or of the longer source
/// side in `Original` mode). Valid range is `0 <= percent < 50`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BorderSpec {
    pub percent: f64,
}

impl BorderSpec {
    pub fn new(percent: f64) -> Result<Self> {
        let border = Self { percent };
        border.validate()?;
        Ok(border)
    }

    /// # Errors
    /// Returns [`AppError::InvalidBorder`] outside `[0, 50)`; at 50% the
    /// content area would collapse to nothing.
    pub fn validate(&self) -> Result<()> {
        if (0.0..50.0).contains(&self.percent) {
            Ok(())
        } else {
            Err(AppError::InvalidBorder(self.percent))
        }
    }
}

/// Layout of a padded export, in output pixels.
///
/// `content_*` is the box reserved for the image after the border is taken
/// out. `image_*` is where the image itself lands inside the canvas once it
/// is fit-contained into the content box with its own aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlacementResult {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub content_width: u32,
    pub content_height: u32,
    pub content_offset_x: u32,
    pub content_offset_y: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub image_offset_x: u32,
    pub image_offset_y: u32,
}

impl PlacementResult {
    /// Padding to the right of the content box.
    pub fn padding_right(&self) -> u32 {
        self.canvas_width - self.content_offset_x - self.content_width
    }

    /// Padding below the content box.
    pub fn padding_bottom(&self) -> u32 {
        self.canvas_height - self.content_offset_y - self.content_height
    }

    pub fn canvas(&self) -> Dimensions {
        Dimensions {
            width: self.canvas_width as f64,
            height: self.canvas_height as f64,
        }
    }

    /// Whether the image is drawn at its source size.
    pub fn is_unscaled(&self, source: Dimensions) -> bool {
        let (w, h) = source.to_pixels();
        self.image_width == w && self.image_height == h
    }

    /// Fits the canvas into a viewport for preview and returns the fit
    /// together with the image rectangle in display space.
    pub fn preview(&self, viewport: Dimensions) -> Result<(FitResult, Rect<Display>)> {
        let fit = compute_fit(self.canvas(), viewport)?;
        let image = Rect::new(
            fit.offset_x + self.image_offset_x as f64 * fit.scale,
            fit.offset_y + self.image_offset_y as f64 * fit.scale,
            self.image_width as f64 * fit.scale,
            self.image_height as f64 * fit.scale,
        );
        Ok((fit, image))
    }
}

/// Plans the padded canvas for `source`.
///
/// # Errors
/// [`AppError::InvalidDimensions`] for a non-positive source or one whose
/// canvas would not fit in `u32` pixels, and [`AppError::InvalidBorder`]
/// for a border outside `[0, 50)`.
pub fn plan_padding(
    source: Dimensions,
    mode: AspectRatioMode,
    border: BorderSpec,
) -> Result<PlacementResult> {
    source.validate()?;
    border.validate()?;
    let too_large = || AppError::dimensions(source.width, source.height);
    let src_w = pixel_side(source.width).ok_or_else(too_large)?;
    let src_h = pixel_side(source.height).ok_or_else(too_large)?;

    let placement = match mode {
        AspectRatioMode::Original => {
            let longest = src_w.max(src_h) as f64;
            let margin = (longest * border.percent / 100.0).round() as u32;
            let grow = |side: u32| {
                margin
                    .checked_mul(2)
                    .and_then(|m| side.checked_add(m))
                    .ok_or_else(too_large)
            };
            PlacementResult {
                canvas_width: grow(src_w)?,
                canvas_height: grow(src_h)?,
                content_width: src_w,
                content_height: src_h,
                content_offset_x: margin,
                content_offset_y: margin,
                image_width: src_w,
                image_height: src_h,
                image_offset_x: margin,
                image_offset_y: margin,
            }
        }
        AspectRatioMode::Fixed(ratio) => {
            let target = ratio.value();
            let (canvas_width, canvas_height) = if src_w as f64 / src_h as f64 > target {
                (src_w, pixel_side(src_w as f64 / target).ok_or_else(too_large)?)
            } else {
                (pixel_side(src_h as f64 * target).ok_or_else(too_large)?, src_h)
            };

            let shrink = 1.0 - 2.0 * border.percent / 100.0;
            let content_width = shrink_side(canvas_width, shrink);
            let content_height = shrink_side(canvas_height, shrink);
            let content_offset_x = (canvas_width - content_width) / 2;
            let content_offset_y = (canvas_height - content_height) / 2;

            let (image_width, image_height) =
                contain(src_w, src_h, content_width, content_height);

            PlacementResult {
                canvas_width,
                canvas_height,
                content_width,
                content_height,
                content_offset_x,
                content_offset_y,
                image_width,
                image_height,
                image_offset_x: content_offset_x + (content_width - image_width) / 2,
                image_offset_y: content_offset_y + (content_height - image_height) / 2,
            }
        }
    };

    tracing::debug!(
        %source,
        %mode,
        border = border.percent,
        canvas_width = placement.canvas_width,
        canvas_height = placement.canvas_height,
        "planned padded canvas"
    );
    Ok(placement)
}

/// Rounds to a whole pixel count of at least 1, or `None` past `u32::MAX`.
fn pixel_side(value: f64) -> Option<u32> {
    let rounded = value.round().max(1.0);
    (rounded <= u32::MAX as f64).then_some(rounded as u32)
}

fn shrink_side(side: u32, shrink: f64) -> u32 {
    ((side as f64 * shrink).round() as u32).clamp(1, side)
}

/// Largest size with the source's ratio that fits inside `box_w x box_h`.
fn contain(src_w: u32, src_h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    let scale = (box_w as f64 / src_w as f64).min(box_h as f64 / src_h as f64);
    (
        ((src_w as f64 * scale).round() as u32).clamp(1, box_w),
        ((src_h as f64 * scale).round() as u32).clamp(1, box_h),
    )
}

//! Crop box placement, dragging and pixel rounding.

use super::{AspectRatio, AspectRatioMode, Dimensions, Display, FitResult, Rect, Source};
use serde::Serialize;

/// Largest box of `ratio` that fits inside the placed image, centered.
///
/// The box starts at full image height and only falls back to full width
/// when the height-derived width would overflow.
pub fn initial_crop_box(fit: &FitResult, ratio: AspectRatio) -> Rect<Display> {
    let mut height = fit.scaled_height;
    let mut width = height * ratio.width / ratio.height;

    if width > fit.scaled_width {
        width = fit.scaled_width;
        height = width * ratio.height / ratio.width;
    }

    Rect::new(
        fit.offset_x + (fit.scaled_width - width) / 2.0,
        fit.offset_y + (fit.scaled_height - height) / 2.0,
        width,
        height,
    )
}

/// [`initial_crop_box`] for a ratio mode; `Original` covers the whole image.
pub fn initial_crop_box_for_mode(
    fit: &FitResult,
    source: Dimensions,
    mode: AspectRatioMode,
) -> Rect<Display> {
    let rect = match mode {
        AspectRatioMode::Fixed(ratio) => initial_crop_box(fit, ratio),
        AspectRatioMode::Original => fit.placed_bounds(),
    };
    tracing::debug!(
        %source,
        %mode,
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "initial crop box"
    );
    rect
}

/// Clamps the box position so it stays inside the placed image.
///
/// Only the position changes. A box larger than the image on an axis is
/// pinned to the image's leading edge on that axis.
pub fn clamp_crop_box(rect: &Rect<Display>, fit: &FitResult) -> Rect<Display> {
    let min_x = fit.offset_x;
    let min_y = fit.offset_y;
    let max_x = (fit.offset_x + fit.scaled_width - rect.width).max(min_x);
    let max_y = (fit.offset_y + fit.scaled_height - rect.height).max(min_y);

    Rect::new(
        rect.x.clamp(min_x, max_x),
        rect.y.clamp(min_y, max_y),
        rect.width,
        rect.height,
    )
}

/// Moves the box by a drag delta, then clamps it.
pub fn drag_crop_box(rect: &Rect<Display>, dx: f64, dy: f64, fit: &FitResult) -> Rect<Display> {
    clamp_crop_box(&rect.translate(dx, dy), fit)
}

/// Integer crop region in source pixels, ready for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Rounds an exact source rectangle to pixels.
    ///
    /// `x`/`y` are floored (never negative); sizes are `max(1, floor(v))`.
    /// The result is then clipped to `source` so extraction never reads
    /// outside the image.
    pub fn from_source_rect(rect: &Rect<Source>, source: Dimensions) -> Self {
        let (src_w, src_h) = (
            source.width.floor().max(1.0) as u32,
            source.height.floor().max(1.0) as u32,
        );
        let floor_pos = |v: f64| v.max(0.0).floor() as u32;
        let floor_len = |v: f64| v.floor().max(1.0) as u32;

        let x = floor_pos(rect.x).min(src_w - 1);
        let y = floor_pos(rect.y).min(src_h - 1);
        Self {
            x,
            y,
            width: floor_len(rect.width).min(src_w - x),
            height: floor_len(rect.height).min(src_h - y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::compute_fit;

    fn fit_for(sw: f64, sh: f64, vw: f64, vh: f64) -> FitResult {
        compute_fit(
            Dimensions::new(sw, sh).unwrap(),
            Dimensions::new(vw, vh).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn landscape_source_binds_on_height_for_four_three() {
        // 1200/800 = 1.5 > 4/3, so height is the binding dimension.
        let fit = fit_for(1200.0, 800.0, 1100.0, 640.0);
        let crop = initial_crop_box(&fit, AspectRatio::FOUR_THREE);
        assert_eq!(crop.height, fit.scaled_height);
        assert!((crop.width - fit.scaled_height * 4.0 / 3.0).abs() < 1e-9);
        assert!(fit.placed_bounds().contains_rect(&crop));
        let (cx, cy) = crop.center();
        let (fx, fy) = fit.placed_bounds().center();
        assert!((cx - fx).abs() < 1e-9 && (cy - fy).abs() < 1e-9);
    }

    #[test]
    fn portrait_source_binds_on_width() {
        let fit = fit_for(800.0, 1200.0, 1100.0, 640.0);
        let crop = initial_crop_box(&fit, AspectRatio::FOUR_THREE);
        assert_eq!(crop.width, fit.scaled_width);
        assert!((crop.height - fit.scaled_width * 3.0 / 4.0).abs() < 1e-9);
        assert!(fit.placed_bounds().contains_rect(&crop));
    }

    #[test]
    fn matching_ratio_covers_the_whole_image() {
        let fit = fit_for(1600.0, 1200.0, 1100.0, 640.0);
        let crop = initial_crop_box(&fit, AspectRatio::FOUR_THREE);
        let bounds = fit.placed_bounds();
        assert!((crop.x - bounds.x).abs() < 1e-9);
        assert!((crop.y - bounds.y).abs() < 1e-9);
        assert!((crop.width - bounds.width).abs() < 1e-9);
        assert!((crop.height - bounds.height).abs() < 1e-9);
    }

    #[test]
    fn original_mode_uses_full_bounds() {
        let source = Dimensions::new(1200.0, 800.0).unwrap();
        let fit = fit_for(1200.0, 800.0, 1100.0, 640.0);
        let crop = initial_crop_box_for_mode(&fit, source, AspectRatioMode::Original);
        assert_eq!(crop, fit.placed_bounds());
    }

    #[test]
    fn clamp_keeps_box_inside_and_preserves_size() {
        let fit = fit_for(1200.0, 800.0, 1100.0, 640.0);
        let crop = initial_crop_box(&fit, AspectRatio::SQUARE);
        for (dx, dy) in [(-5000.0, 0.0), (5000.0, 5000.0), (12.5, -3.0), (0.0, 0.0)] {
            let moved = drag_crop_box(&crop, dx, dy, &fit);
            assert_eq!((moved.width, moved.height), (crop.width, crop.height));
            assert!(fit.placed_bounds().contains_rect(&moved));
        }
        let far_left = drag_crop_box(&crop, -5000.0, 0.0, &fit);
        assert_eq!(far_left.x, fit.offset_x);
    }

    #[test]
    fn clamp_is_idempotent() {
        let fit = fit_for(800.0, 1200.0, 1100.0, 640.0);
        let candidates = [
            Rect::new(-100.0, -100.0, 200.0, 150.0),
            Rect::new(900.0, 600.0, 200.0, 150.0),
            Rect::new(500.0, 100.0, 2000.0, 3000.0),
        ];
        for rect in candidates {
            let once = clamp_crop_box(&rect, &fit);
            assert_eq!(clamp_crop_box(&once, &fit), once);
        }
    }

    #[test]
    fn oversized_box_is_pinned_not_rejected() {
        let fit = fit_for(800.0, 1200.0, 1100.0, 640.0);
        let rect = Rect::new(999.0, 999.0, fit.scaled_width + 50.0, fit.scaled_height + 50.0);
        let clamped = clamp_crop_box(&rect, &fit);
        assert_eq!((clamped.x, clamped.y), (fit.offset_x, fit.offset_y));
        assert_eq!(drag_crop_box(&clamped, 30.0, -30.0, &fit), clamped);
    }

    #[test]
    fn initial_box_survives_source_round_trip_within_a_pixel() {
        let source = Dimensions::new(4032.0, 3024.0).unwrap();
        let fit = fit_for(4032.0, 3024.0, 1100.0, 640.0);
        let crop = initial_crop_box(&fit, AspectRatio::SQUARE);
        let pixels = PixelRect::from_source_rect(&fit.to_source_rect(&crop), source);
        let back = fit.to_display_rect(&Rect::new(
            pixels.x as f64,
            pixels.y as f64,
            pixels.width as f64,
            pixels.height as f64,
        ));
        assert!((back.x - crop.x).abs() <= 1.0);
        assert!((back.y - crop.y).abs() <= 1.0);
        assert!((back.width - crop.width).abs() <= 1.0);
        assert!((back.height - crop.height).abs() <= 1.0);
    }

    #[test]
    fn pixel_rounding_floors_and_clips() {
        let source = Dimensions::new(100.0, 50.0).unwrap();
        let px = PixelRect::from_source_rect(&Rect::new(-0.4, 10.9, 0.5, 80.0), source);
        assert_eq!(px, PixelRect { x: 0, y: 10, width: 1, height: 40 });

        let px = PixelRect::from_source_rect(&Rect::new(99.7, 0.0, 10.0, 10.0), source);
        assert_eq!(px, PixelRect { x: 99, y: 0, width: 1, height: 10 });
    }
}

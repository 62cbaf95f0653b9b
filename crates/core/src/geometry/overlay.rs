//! Preview overlay geometry: the dimmed area around the crop box and the
//! rule-of-thirds guides drawn inside it.

use super::{Dimensions, Display, Rect};
use serde::Serialize;

/// Four dimming panels that together cover the viewport minus the crop box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaskRegions {
    /// Full width, above the box.
    pub top: Rect<Display>,
    /// Full width, below the box.
    pub bottom: Rect<Display>,
    /// Left of the box, between top and bottom.
    pub left: Rect<Display>,
    /// Right of the box, between top and bottom.
    pub right: Rect<Display>,
}

/// A straight guide line in display space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuideLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Computes the mask panels for a crop box inside a viewport.
pub fn mask_regions(viewport: Dimensions, crop: &Rect<Display>) -> MaskRegions {
    let side = |v: f64| v.max(0.0);

    MaskRegions {
        top: Rect::new(0.0, 0.0, viewport.width, side(crop.y)),
        bottom: Rect::new(
            0.0,
            crop.bottom(),
            viewport.width,
            side(viewport.height - crop.bottom()),
        ),
        left: Rect::new(0.0, crop.y, side(crop.x), crop.height),
        right: Rect::new(
            crop.right(),
            crop.y,
            side(viewport.width - crop.right()),
            crop.height,
        ),
    }
}

/// Two vertical then two horizontal lines splitting the box into thirds.
pub fn thirds_grid(crop: &Rect<Display>) -> [GuideLine; 4] {
    let (x, y, w, h) = (crop.x, crop.y, crop.width, crop.height);
    let vertical = |dx: f64| GuideLine {
        x1: x + dx,
        y1: y,
        x2: x + dx,
        y2: y + h,
    };
    let horizontal = |dy: f64| GuideLine {
        x1: x,
        y1: y + dy,
        x2: x + w,
        y2: y + dy,
    };

    [
        vertical(w / 3.0),
        vertical(w * 2.0 / 3.0),
        horizontal(h / 3.0),
        horizontal(h * 2.0 / 3.0),
    ]
}

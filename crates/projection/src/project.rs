use crate::pixel::{AXIS_MAX, AXIS_MIN, PixelCoordinate};

/// Zoom level at which one projection unit scaled by `2^NATIVE_ZOOM` equals
/// one source-image pixel.
pub const NATIVE_ZOOM: u8 = 7;

/// A coordinate in the map surface's internal space (simple CRS: `lng`
/// increases rightward, `lat` decreases downward).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectedCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl ProjectedCoordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

fn scale(zoom: u8) -> f64 {
    (1u64 << zoom) as f64
}

/// Project a pixel coordinate into map surface space.
///
/// Each axis is clamped to `[AXIS_MIN, AXIS_MAX]` first. Pixel `(1, 1)`
/// occupies projection cell `(0, 0)`; the projected point is the cell
/// origin, so the round trip through [`projected_to_pixel`] is exact.
pub fn pixel_to_projected(pixel: PixelCoordinate, zoom: u8) -> ProjectedCoordinate {
    let s = scale(zoom);
    let x = pixel.x.clamp(AXIS_MIN, AXIS_MAX);
    let y = pixel.y.clamp(AXIS_MIN, AXIS_MAX);
    ProjectedCoordinate {
        lng: (x - 1) as f64 / s,
        lat: -((y - 1) as f64) / s,
    }
}

/// Inverse of [`pixel_to_projected`]: scale back to continuous pixel space,
/// floor into a cell, and shift to the 1-based pixel convention. The result
/// is clamped, so clicks landing just outside the image resolve to the
/// nearest edge pixel.
pub fn projected_to_pixel(projected: ProjectedCoordinate, zoom: u8) -> PixelCoordinate {
    let s = scale(zoom);
    let x = (projected.lng * s).floor() as i64 + 1;
    let y = (-projected.lat * s).floor() as i64 + 1;
    PixelCoordinate::clamped(x, y)
}

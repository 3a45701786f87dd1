//! Anchor math for position-stable annotations
//!
//! Converts between pixel positions on a rendered page surface and
//! resolution-independent fractional anchors. Anchors are what keep an
//! annotation visually pinned across zoom levels: every paint re-resolves
//! against the current surface dimensions instead of caching pixels.

use serde::{Deserialize, Serialize};

/// A pixel position on a rendered page surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pixel dimensions of one rendered page surface at its current scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDimensions {
    pub width_px: f64,
    pub height_px: f64,
}

impl SurfaceDimensions {
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self {
            width_px,
            height_px,
        }
    }
}

/// A position on a page expressed as fractions of the rendered surface's
/// width/height, independent of zoom level.
///
/// Values are not clamped: a pointer event on the surface boundary may
/// produce a component marginally outside `[0, 1]`, which resolves back to
/// the same boundary position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub relative_x: f64,
    pub relative_y: f64,
}

impl Anchor {
    pub fn new(relative_x: f64, relative_y: f64) -> Self {
        Self {
            relative_x,
            relative_y,
        }
    }

    /// Capture an anchor from a pixel position on the given surface.
    pub fn from_pixel(pixel: PixelPoint, dims: SurfaceDimensions) -> Self {
        Self {
            relative_x: pixel.x / dims.width_px,
            relative_y: pixel.y / dims.height_px,
        }
    }

    /// Resolve the anchor back to pixels against the surface's current
    /// dimensions.
    pub fn resolve(&self, dims: SurfaceDimensions) -> PixelPoint {
        PixelPoint {
            x: self.relative_x * dims.width_px,
            y: self.relative_y * dims.height_px,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        let scale = b.abs().max(1.0);
        assert!(
            (a - b).abs() / scale < 1e-6,
            "expected {a} to be within 1e-6 of {b}"
        );
    }

    #[test]
    fn round_trip_preserves_pixels() {
        let dims = SurfaceDimensions::new(793.0, 1122.5);
        for (x, y) in [(0.0, 0.0), (100.0, 100.0), (793.0, 1122.5), (13.7, 991.2)] {
            let pixel = PixelPoint::new(x, y);
            let resolved = Anchor::from_pixel(pixel, dims).resolve(dims);
            assert_close(resolved.x, pixel.x);
            assert_close(resolved.y, pixel.y);
        }
    }

    #[test]
    fn anchor_tracks_surface_rescale() {
        let before = SurfaceDimensions::new(400.0, 400.0);
        let after = SurfaceDimensions::new(800.0, 800.0);

        let anchor = Anchor::from_pixel(PixelPoint::new(100.0, 100.0), before);
        let resolved = anchor.resolve(after);

        assert_close(resolved.x, 200.0);
        assert_close(resolved.y, 200.0);
    }

    #[test]
    fn boundary_pixels_are_not_clamped() {
        let dims = SurfaceDimensions::new(200.0, 100.0);
        let anchor = Anchor::from_pixel(PixelPoint::new(201.0, -0.5), dims);

        assert!(anchor.relative_x > 1.0);
        assert!(anchor.relative_y < 0.0);

        let resolved = anchor.resolve(dims);
        assert_close(resolved.x, 201.0);
        assert_close(resolved.y, -0.5);
    }
}

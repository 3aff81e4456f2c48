//! Visible window in projected meters.

use geo_types::Rect;

/// Axis-aligned crop window centered on the projected poster center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropLimits {
    pub center_x: f64,
    pub center_y: f64,
    pub half_x: f64,
    pub half_y: f64,
}

impl CropLimits {
    /// Start both half extents at `dist`, then shrink one side to match the
    /// page aspect (`width / height`).
    pub fn new(center_x: f64, center_y: f64, dist: f64, width: f64, height: f64) -> Self {
        let aspect = width / height;
        let (half_x, half_y) = if width > height {
            (dist, dist / aspect)
        } else {
            (dist * aspect, dist)
        };
        Self {
            center_x,
            center_y,
            half_x,
            half_y,
        }
    }

    pub fn x_range(&self) -> (f64, f64) {
        (self.center_x - self.half_x, self.center_x + self.half_x)
    }

    pub fn y_range(&self) -> (f64, f64) {
        (self.center_y - self.half_y, self.center_y + self.half_y)
    }

    pub fn rect(&self) -> Rect<f64> {
        let (x0, x1) = self.x_range();
        let (y0, y1) = self.y_range();
        Rect::new((x0, y0), (x1, y1))
    }

    pub fn intersects(&self, other: &Rect<f64>) -> bool {
        let (x0, x1) = self.x_range();
        let (y0, y1) = self.y_range();
        other.min().x <= x1 && other.max().x >= x0 && other.min().y <= y1 && other.max().y >= y0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portrait_narrows_width() {
        let crop = CropLimits::new(100.0, 200.0, 4000.0, 12.0, 16.0);
        assert_eq!(crop.half_y, 4000.0);
        assert!((crop.half_x - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_landscape_narrows_height() {
        let crop = CropLimits::new(0.0, 0.0, 4000.0, 16.0, 12.0);
        assert_eq!(crop.half_x, 4000.0);
        assert!((crop.half_y - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_always_centered() {
        let crop = CropLimits::new(512_345.0, 4_845_000.0, 6000.0, 11.47, 4.8);
        let (x0, x1) = crop.x_range();
        let (y0, y1) = crop.y_range();
        assert!(((x0 + x1) / 2.0 - 512_345.0).abs() < 1e-6);
        assert!(((y0 + y1) / 2.0 - 4_845_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_intersects() {
        let crop = CropLimits::new(0.0, 0.0, 10.0, 1.0, 1.0);
        assert!(crop.intersects(&Rect::new((5.0, 5.0), (20.0, 20.0))));
        assert!(!crop.intersects(&Rect::new((11.0, 0.0), (20.0, 1.0))));
    }
}

use glam::DVec2;

/// Drawable size in physical pixels.
///
/// Camera interaction math (trackball angle, pan scale, zoom-drag) and the
/// transparency buffers are all sized from this.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width over height. A degenerate viewport reports `1.0`.
    #[inline]
    pub fn aspect(self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }

    /// Length of the window diagonal in pixels.
    #[inline]
    pub fn diagonal(self) -> f64 {
        DVec2::new(f64::from(self.width), f64::from(self.height)).length()
    }

    #[inline]
    pub fn center(self) -> DVec2 {
        DVec2::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    #[inline]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self::new(400, 400)
    }
}

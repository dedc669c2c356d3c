use glam::Mat4;

/// Symmetric perspective frustum scaled from the focus distance.
///
/// Near and far track the camera so the volume around the focus keeps the
/// same depth precision at any zoom level. Depth maps to wgpu's `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    pub fov_y_degrees: f64,
    pub near_scale: f64,
    pub far_scale: f64,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near_scale: 0.01,
            far_scale: 2.0,
        }
    }
}

impl Projection {
    /// `(near, far)` for a camera at `focus_distance` from its focus.
    pub fn planes(&self, focus_distance: f64) -> (f64, f64) {
        let d = focus_distance.abs();
        (self.near_scale * d, self.far_scale * d)
    }

    /// Falls back to the default frustum when the scales would give
    /// `near <= 0` or `far <= near`.
    pub fn matrix(&self, aspect: f64, focus_distance: f64) -> Mat4 {
        let p = if self.is_valid() { *self } else { Self::default() };
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        let (near, far) = p.planes(focus_distance);
        Mat4::perspective_rh(
            p.fov_y_degrees.to_radians() as f32,
            aspect as f32,
            near as f32,
            far as f32,
        )
    }

    pub fn is_valid(&self) -> bool {
        self.fov_y_degrees > 0.0
            && self.fov_y_degrees < 180.0
            && self.near_scale > 0.0
            && self.far_scale > self.near_scale
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec3;

    use super::*;

    #[test]
    fn planes_scale_with_distance() {
        let (near, far) = Projection::default().planes(-4.0);
        assert_relative_eq!(near, 0.04);
        assert_relative_eq!(far, 8.0);
    }

    #[test]
    fn focus_lands_mid_depth_range() {
        let m = Projection::default().matrix(1.0, 2.0);
        // Focus sits at view-space z = -2 (distance 2).
        let ndc = m.project_point3(Vec3::new(0.0, 0.0, -2.0));
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
        let near = m.project_point3(Vec3::new(0.0, 0.0, -0.02));
        assert_relative_eq!(near.z, 0.0, epsilon = 1e-5);
        let far = m.project_point3(Vec3::new(0.0, 0.0, -4.0));
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn invalid_scales_fall_back_to_default() {
        let bad = Projection {
            near_scale: 2.0,
            far_scale: 1.0,
            ..Projection::default()
        };
        assert!(!bad.is_valid());
        assert_eq!(bad.matrix(1.5, 2.0), Projection::default().matrix(1.5, 2.0));
    }
}

use glam::{DMat3, DMat4, DVec2, DVec3, Mat4};

use crate::coords::ViewportSize;

pub const MIN_FOCUS_DISTANCE: f64 = 0.001;
pub const MAX_FOCUS_DISTANCE: f64 = 1_000_000.0;
pub const DEFAULT_FOCUS_DISTANCE: f64 = 2.0;
pub const DEFAULT_FOCUS: DVec3 = DVec3::new(0.0, 0.0, 0.5);

/// Pan scale: one focus distance spans this many pixels.
pub const DISTANCE_TO_SCREEN_IN_PIXELS: f64 = 2000.0;

/// Orbit camera driven by pixel-space mouse deltas.
///
/// The eye sits at `focus + rotation × (0, 0, focus_distance)` and looks
/// down its local −Z axis at the focus. Invariants: `rotation` is
/// orthonormal and right-handed; `focus_distance` stays within
/// `[MIN_FOCUS_DISTANCE, MAX_FOCUS_DISTANCE]`; nothing is ever NaN.
///
/// Rotation convention: a drag of `(dx, dy)` turns about the axis
/// `(dy, dx, dz)` and the inverse rotation is accumulated, so the model
/// follows the pointer. Dragging right orbits the eye toward −X.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    focus: DVec3,
    rotation: DMat3,
    focus_distance: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub fn new() -> Self {
        Self {
            focus: DEFAULT_FOCUS,
            rotation: DMat3::IDENTITY,
            focus_distance: DEFAULT_FOCUS_DISTANCE,
        }
    }

    /// Identity rotation, default focus and focus distance.
    pub fn reset_view(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn focus(&self) -> DVec3 {
        self.focus
    }

    #[inline]
    pub fn rotation(&self) -> DMat3 {
        self.rotation
    }

    #[inline]
    pub fn focus_distance(&self) -> f64 {
        self.focus_distance
    }

    /// Ignores non-finite points.
    pub fn set_focus(&mut self, focus: DVec3) {
        if focus.is_finite() {
            self.focus = focus;
        }
    }

    #[inline]
    pub fn eye(&self) -> DVec3 {
        self.focus + self.rotation * DVec3::new(0.0, 0.0, self.focus_distance)
    }

    #[inline]
    pub fn up(&self) -> DVec3 {
        self.rotation * DVec3::Y
    }

    /// World units covered by one pixel of pan at the focus.
    #[inline]
    pub fn units_per_pixel(&self) -> f64 {
        self.focus_distance.abs() / DISTANCE_TO_SCREEN_IN_PIXELS
    }

    /// Right-handed look-at from the eye to the focus.
    pub fn view_matrix(&self) -> Mat4 {
        DMat4::look_at_rh(self.eye(), self.focus, self.up()).as_mat4()
    }

    /// Trackball rotation; dragging across the window diagonal is one turn.
    ///
    /// Returns `false` (and changes nothing) for zero or non-finite drags
    /// and for an empty viewport.
    pub fn rotate_pixels(&mut self, dx: f64, dy: f64, dz: f64, viewport: ViewportSize) -> bool {
        let drag = DVec3::new(dx, dy, dz);
        let distance = drag.length();
        if !(distance > 0.0) || !distance.is_finite() {
            return false;
        }
        let diagonal = viewport.diagonal();
        if !(diagonal > 0.0) {
            return false;
        }

        let axis = DVec3::new(dy, dx, dz) / distance;
        let angle = std::f64::consts::TAU * distance / diagonal;
        let turn = DMat3::from_axis_angle(axis, angle);

        self.rotation = orthonormalize(self.rotation * turn.transpose());
        true
    }

    /// Pans the focus in the camera plane.
    pub fn translate_pixels(&mut self, dx: f64, dy: f64, dz: f64) -> bool {
        let t = DVec3::new(-dx, dy, -dz) * self.units_per_pixel();
        if !t.is_finite() {
            return false;
        }
        self.focus += self.rotation * t;
        true
    }

    /// Divides the focus distance by `ratio`.
    ///
    /// No-op for `ratio <= 0`, `ratio == 1`, non-finite ratios, and when the
    /// result would leave the allowed distance range.
    pub fn zoom(&mut self, ratio: f64) -> bool {
        if !(ratio > 0.0) || ratio == 1.0 || !ratio.is_finite() {
            return false;
        }
        let distance = self.focus_distance / ratio;
        if !(MIN_FOCUS_DISTANCE..=MAX_FOCUS_DISTANCE).contains(&distance) {
            return false;
        }
        self.focus_distance = distance;
        true
    }

    /// Mouse-wheel zoom; fifty notches double or halve the distance.
    pub fn zoom_wheel(&mut self, notches: f64) -> bool {
        self.zoom(2f64.powf(notches / 50.0))
    }

    /// Zoom by dragging away from (in) or toward (out) the viewport center.
    pub fn zoom_pixels(&mut self, new: DVec2, old: DVec2, viewport: ViewportSize) -> bool {
        let center = viewport.center();
        let d_old = (old - center).length();
        let d_new = (new - center).length();
        let ratio = 1.0 + (d_new - d_old) / d_new.max(20.0);
        self.zoom(ratio)
    }

    /// Pans so the world point under pixel `p` moves to the viewport center.
    pub fn center_on_pixel(&mut self, p: DVec2, viewport: ViewportSize) -> bool {
        let center = viewport.center();
        let dx = p.x - center.x;
        let dy = center.y - p.y;
        self.translate_pixels(-dx, dy, 0.0)
    }
}

/// Gram–Schmidt on the first two columns; the third is their cross product.
fn orthonormalize(m: DMat3) -> DMat3 {
    let x = m.x_axis.normalize_or_zero();
    let y = (m.y_axis - x * x.dot(m.y_axis)).normalize_or_zero();
    if x == DVec3::ZERO || y == DVec3::ZERO {
        return DMat3::IDENTITY;
    }
    DMat3::from_cols(x, y, x.cross(y))
}

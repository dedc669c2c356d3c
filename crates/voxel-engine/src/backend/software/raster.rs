use glam::{Vec2, Vec3, Vec4};

/// Post-projection vertex with its interpolated weight.
#[derive(Debug, Copy, Clone)]
pub(super) struct ClipVertex {
    pub clip: Vec4,
    pub weight: f32,
}

/// A covered pixel center.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(super) struct RasterFragment {
    pub x: u32,
    pub y: u32,
    /// Window-space depth in `[0, 1]`.
    pub depth: f32,
    pub weight: f32,
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Rasterizes one triangle into a `width × height` target.
///
/// Samples pixel centers, accepts both windings and clips on depth only.
/// Triangles with a vertex at or behind the eye (`w <= 0`) are skipped
/// instead of clipped. There is no fill rule: pixels whose center lies
/// exactly on a shared edge are emitted by both triangles.
pub(super) fn rasterize_triangle(
    tri: &[ClipVertex; 3],
    width: u32,
    height: u32,
    mut emit: impl FnMut(RasterFragment),
) {
    if tri.iter().any(|v| !(v.clip.w > 0.0)) {
        return;
    }

    let screen = tri.map(|v| {
        let ndc = v.clip.truncate() / v.clip.w;
        Vec3::new(
            (ndc.x * 0.5 + 0.5) * width as f32,
            (0.5 - ndc.y * 0.5) * height as f32,
            ndc.z,
        )
    });
    let [s0, s1, s2] = screen.map(|s| s.truncate());

    let area = edge(s0, s1, s2);
    if area == 0.0 || !area.is_finite() {
        return;
    }

    let lo = s0.min(s1).min(s2);
    let hi = s0.max(s1).max(s2);
    // Float-to-int casts saturate, so off-screen bounds clamp to the target.
    let x0 = lo.x.floor().clamp(0.0, width as f32) as u32;
    let y0 = lo.y.floor().clamp(0.0, height as f32) as u32;
    let x1 = hi.x.ceil().clamp(0.0, width as f32) as u32;
    let y1 = hi.y.ceil().clamp(0.0, height as f32) as u32;

    let inv_w = tri.map(|v| 1.0 / v.clip.w);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let b = [edge(s1, s2, p) / area, edge(s2, s0, p) / area, edge(s0, s1, p) / area];
            if b.iter().any(|&v| v < 0.0) {
                continue;
            }

            let depth = b[0] * screen[0].z + b[1] * screen[1].z + b[2] * screen[2].z;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }

            // Perspective-correct weight, as the GPU interpolates varyings.
            let persp = b[0] * inv_w[0] + b[1] * inv_w[1] + b[2] * inv_w[2];
            let weight = (b[0] * tri[0].weight * inv_w[0]
                + b[1] * tri[1].weight * inv_w[1]
                + b[2] * tri[2].weight * inv_w[2])
                / persp;

            emit(RasterFragment { x, y, depth, weight });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32) -> ClipVertex {
        ClipVertex {
            clip: Vec4::new(x, y, z, 1.0),
            weight: 1.0,
        }
    }

    fn collect(tri: [ClipVertex; 3], w: u32, h: u32) -> Vec<RasterFragment> {
        let mut out = Vec::new();
        rasterize_triangle(&tri, w, h, |f| out.push(f));
        out
    }

    #[test]
    fn fullscreen_triangle_covers_every_pixel_once() {
        let out = collect([v(-1.0, -1.0, 0.5), v(3.0, -1.0, 0.5), v(-1.0, 3.0, 0.5)], 4, 3);
        assert_eq!(out.len(), 12);
        assert!(out.iter().all(|f| f.depth == 0.5));
    }

    #[test]
    fn winding_does_not_matter() {
        let ccw = collect([v(-1.0, -1.0, 0.0), v(1.0, -1.0, 0.0), v(-1.0, 1.0, 0.0)], 8, 8);
        let cw = collect([v(-1.0, -1.0, 0.0), v(-1.0, 1.0, 0.0), v(1.0, -1.0, 0.0)], 8, 8);
        assert!(!ccw.is_empty());
        assert_eq!(ccw.len(), cw.len());
    }

    #[test]
    fn ndc_top_maps_to_row_zero() {
        // Small triangle near NDC y = +1.
        let out = collect([v(-1.0, 1.0, 0.0), v(1.0, 1.0, 0.0), v(0.0, 0.6, 0.0)], 4, 4);
        assert!(!out.is_empty());
        assert!(out.iter().all(|f| f.y == 0));
    }

    #[test]
    fn fragments_outside_depth_range_are_dropped() {
        let out = collect([v(-1.0, -1.0, 1.5), v(3.0, -1.0, 1.5), v(-1.0, 3.0, 1.5)], 2, 2);
        assert!(out.is_empty());
    }

    #[test]
    fn vertex_behind_eye_skips_triangle() {
        let mut behind = v(3.0, -1.0, 0.5);
        behind.clip.w = -1.0;
        let out = collect([v(-1.0, -1.0, 0.5), behind, v(-1.0, 3.0, 0.5)], 2, 2);
        assert!(out.is_empty());
    }

    #[test]
    fn degenerate_triangle_emits_nothing() {
        let out = collect([v(0.0, 0.0, 0.0), v(0.5, 0.5, 0.0), v(1.0, 1.0, 0.0)], 4, 4);
        assert!(out.is_empty());
    }
}

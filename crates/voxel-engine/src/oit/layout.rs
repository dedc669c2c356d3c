use bytemuck::{Pod, Zeroable};

/// Head-pointer value meaning "no fragment in this pixel yet".
pub const HEAD_SENTINEL: u32 = u32::MAX;

/// Layers per unit of the configured quarter depth.
pub const LAYERS_PER_QUARTER_DEPTH: u32 = 4;

/// Upper bound on fragments the sort pass resolves per pixel.
///
/// Mirrors `MAX_SORTED_LAYERS` in `oit.wgsl` (private array size).
pub const MAX_SORTED_LAYERS: u32 = 64;

/// One entry of the shared fragment storage: a link in a pixel's list.
///
/// Layout matches `FragmentNode` in `oit.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FragmentNode {
    /// Window-space depth in `[0, 1]`; larger is farther.
    pub depth: f32,
    /// Straight-alpha color packed like WGSL `pack4x8unorm`.
    pub color: u32,
    /// Index of the next node, or [`HEAD_SENTINEL`].
    pub next: u32,
    pub _pad: u32,
}

impl FragmentNode {
    #[inline]
    pub fn new(depth: f32, rgba: [f32; 4], next: u32) -> Self {
        Self {
            depth,
            color: pack_unorm4x8(rgba),
            next,
            _pad: 0,
        }
    }

    #[inline]
    pub fn rgba(&self) -> [f32; 4] {
        unpack_unorm4x8(self.color)
    }
}

/// Layers per pixel the fragment storage is sized for.
#[inline]
pub fn depth_budget(quarter_depth: u32) -> u32 {
    quarter_depth.saturating_mul(LAYERS_PER_QUARTER_DEPTH)
}

/// Fragment nodes needed for `depth_budget(quarter_depth)` layers per pixel.
#[inline]
pub fn fragment_capacity(width: u32, height: u32, quarter_depth: u32) -> u64 {
    u64::from(depth_budget(quarter_depth))
        .saturating_mul(u64::from(width))
        .saturating_mul(u64::from(height))
}

/// Same bit layout as WGSL `pack4x8unorm`: `x` in the low byte.
pub fn pack_unorm4x8(v: [f32; 4]) -> u32 {
    v.iter().enumerate().fold(0u32, |acc, (i, c)| {
        let c = if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 };
        acc | (((c * 255.0).round() as u32) << (8 * i))
    })
}

pub fn unpack_unorm4x8(bits: u32) -> [f32; 4] {
    let mut out = [0.0; 4];
    for (i, c) in out.iter_mut().enumerate() {
        *c = ((bits >> (8 * i)) & 0xff) as f32 / 255.0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<FragmentNode>(), 16);
    }

    #[test]
    fn pack_places_red_in_low_byte() {
        assert_eq!(pack_unorm4x8([1.0, 0.0, 0.0, 0.0]), 0x0000_00ff);
        assert_eq!(pack_unorm4x8([0.0, 0.0, 0.0, 1.0]), 0xff00_0000);
    }

    #[test]
    fn pack_clamps_out_of_range_and_nan() {
        assert_eq!(pack_unorm4x8([2.0, -1.0, f32::NAN, 1.0]), 0xff00_00ff);
    }

    #[test]
    fn unpack_is_within_one_step_of_input() {
        let c = unpack_unorm4x8(pack_unorm4x8([0.9, 0.5, 0.1, 0.9]));
        for (got, want) in c.iter().zip([0.9, 0.5, 0.1, 0.9]) {
            assert!((got - want).abs() <= 1.0 / 255.0);
        }
    }

    #[test]
    fn capacity_for_quarter_depth_100_at_400x400() {
        // 400 layers per pixel.
        assert_eq!(depth_budget(100), 400);
        assert_eq!(fragment_capacity(400, 400, 100), 400 * 400 * 400);
    }
}

use glam::Mat4;
use serde::Deserialize;

use crate::coords::ViewportSize;

use super::Rgba;

/// How the sort pass resolves a pixel's fragment list.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMethod {
    /// Back-to-front "over" compositing of depth-sorted fragments.
    #[default]
    Mix,
    /// Maximum intensity projection; fragment order is irrelevant.
    Mip,
}

impl BlendMethod {
    /// Value pushed to the sort shader.
    #[inline]
    pub fn shader_code(self) -> u32 {
        match self {
            BlendMethod::Mix => 0,
            BlendMethod::Mip => 1,
        }
    }

    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            BlendMethod::Mix => BlendMethod::Mip,
            BlendMethod::Mip => BlendMethod::Mix,
        }
    }
}

/// Frame-global values an actor may need pushed before its draw.
///
/// Recomputed by the renderer once per frame; read by every actor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameState {
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: ViewportSize,
    /// Maximum transparent layers resolved per pixel.
    pub depth_budget: u32,
    pub background: Rgba,
    pub blend_method: BlendMethod,
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport: ViewportSize::default(),
            depth_budget: 0,
            background: Rgba::BLACK,
            blend_method: BlendMethod::Mix,
        }
    }
}

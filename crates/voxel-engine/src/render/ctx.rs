use crate::coords::ViewportSize;

/// Device handles a frame callback may use to create or feed GPU resources.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    /// Physical pixels.
    pub viewport: ViewportSize,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: ViewportSize,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            viewport,
        }
    }
}

/// Encoder and colour view of the frame being recorded.
///
/// Owned so it can be handed to a [`WgpuBackend`](crate::backend::WgpuBackend)
/// for the duration of a renderer `display`.
pub struct RenderTarget {
    pub encoder: wgpu::CommandEncoder,
    pub color_view: wgpu::TextureView,
}

impl RenderTarget {
    #[inline]
    pub fn new(encoder: wgpu::CommandEncoder, color_view: wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}

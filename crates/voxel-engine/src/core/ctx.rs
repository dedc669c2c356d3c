use winit::window::Window;

use crate::coords::ViewportSize;
use crate::device::{Gpu, SurfaceErrorAction};
use crate::input::{InputFrame, InputState};
use crate::render::{RenderCtx, RenderTarget};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// The window being rendered.
pub struct WindowCtx<'a> {
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Drawable size in physical pixels.
    pub fn physical_size(&self) -> ViewportSize {
        let size = self.window.inner_size();
        ViewportSize::new(size.width, size.height)
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// `'a` is the callback, `'w` the window borrow held by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires a surface texture, lets `draw` record into it and presents.
    ///
    /// `draw` gets the target by value and returns the encoder to submit, or
    /// `None` to present without submitting. Skips the frame while minimized
    /// or when the surface is temporarily unavailable.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&RenderCtx<'_>, RenderTarget) -> Option<wgpu::CommandEncoder>,
    {
        let viewport = self.window.physical_size();
        if !viewport.is_valid() {
            return AppControl::Continue;
        }

        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                log::warn!("surface unavailable: {err}");
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                };
            }
        };

        let rctx = RenderCtx::new(self.gpu.device(), self.gpu.queue(), self.gpu.surface_format(), viewport);
        let encoder = draw(&rctx, RenderTarget::new(frame.encoder, frame.view));

        self.window.window.pre_present_notify();
        self.gpu.submit(encoder, frame.surface_texture);
        AppControl::Continue
    }
}

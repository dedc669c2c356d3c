use winit::event::WindowEvent;

use crate::coords::ViewportSize;
use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
///
/// All callbacks run on the thread that owns the window and the GPU device.
pub trait App {
    /// The device and surface exist. Create GPU resources here.
    fn on_start(&mut self, gpu: &Gpu<'_>) -> AppControl {
        let _ = gpu;
        AppControl::Continue
    }

    /// Raw window events, after input state has been updated.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// The drawable size changed. Called with the new physical size,
    /// including 0x0 while minimized.
    fn on_resize(&mut self, size: ViewportSize) {
        let _ = size;
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// The window is closing; the GPU device is still alive.
    fn on_close(&mut self) {}
}

use std::time::Duration;

use voxel_engine::backend::WgpuBackend;
use voxel_engine::config::ViewerProperties;
use voxel_engine::coords::ViewportSize;
use voxel_engine::core::{App, AppControl, FrameCtx};
use voxel_engine::device::Gpu;
use voxel_engine::loader::ActorLoader;
use voxel_engine::renderer::{Renderer, RendererConfig};
use voxel_engine::time::FpsCounter;

use crate::controls::{self, Action};
use crate::scenes::{self, SceneKind};

/// Window title prefix.
pub const TITLE: &str = "voxel viewer";

/// GPU state that exists once the window is up.
struct Session {
    renderer: Renderer<WgpuBackend>,
    loader: ActorLoader,
}

pub struct ViewerApp {
    props: ViewerProperties,
    scene: SceneKind,
    session: Option<Session>,
    fps: FpsCounter,
}

impl ViewerApp {
    pub fn new(props: ViewerProperties, scene: SceneKind) -> Self {
        Self {
            props,
            scene,
            session: None,
            fps: FpsCounter::new(Duration::from_secs(1)),
        }
    }

    fn start(&self, gpu: &Gpu<'_>) -> anyhow::Result<Session> {
        let size = gpu.size();
        let backend = WgpuBackend::new(gpu.device(), gpu.queue(), gpu.surface_format());
        let config = RendererConfig {
            viewport: ViewportSize::new(size.width, size.height),
            ..self.props.renderer_config()
        };

        let mut renderer = Renderer::new(backend, config);
        renderer.init()?;
        let loader = ActorLoader::new(renderer.handle(), self.props.loader_threads)?;
        Ok(Session { renderer, loader })
    }

    fn title(&self, session: &Session, fps: Option<f32>) -> String {
        let blend = session.renderer.blend_method();
        match fps {
            Some(fps) => format!("{TITLE} | {} | {blend:?} | {fps:.0} fps", self.scene),
            None => format!("{TITLE} | {} | {blend:?}", self.scene),
        }
    }
}

impl App for ViewerApp {
    fn on_start(&mut self, gpu: &Gpu<'_>) -> AppControl {
        match self.start(gpu) {
            Ok(session) => {
                scenes::load(&session.loader, self.scene);
                self.session = Some(session);
                AppControl::Continue
            }
            Err(e) => {
                log::error!("viewer failed to start: {e:#}");
                AppControl::Exit
            }
        }
    }

    fn on_resize(&mut self, size: ViewportSize) {
        if let Some(session) = self.session.as_mut() {
            session.renderer.reshape(size.width, size.height);
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(session) = self.session.as_mut() else {
            return AppControl::Exit;
        };
        let renderer = &mut session.renderer;
        let handle = renderer.handle();
        let mut title_changed = false;

        for action in controls::actions(ctx.input, ctx.input_frame) {
            match action {
                Action::Rotate(d) => {
                    renderer.rotate_pixels(d.x, d.y, 0.0);
                }
                Action::Pan(d) => {
                    renderer.translate_pixels(d.x, d.y, 0.0);
                }
                Action::ZoomDrag { new, old } => {
                    renderer.zoom_pixels(new, old);
                }
                Action::ZoomWheel(notches) => {
                    renderer.zoom_wheel(notches);
                }
                Action::CenterOn(p) => {
                    renderer.center_on_pixel(p);
                }
                Action::ResetView => renderer.reset_view(),
                Action::ClearAll => {
                    let generation = handle.set_dispose_and_clear_all_actors_msg();
                    log::info!("cleared scene, now at {generation}");
                }
                Action::ToggleBlend => {
                    handle.set_blend_method(renderer.blend_method().toggled());
                    title_changed = true;
                }
                Action::LoadScene(kind) => {
                    handle.set_dispose_and_clear_all_actors_msg();
                    self.scene = kind;
                    scenes::load(&session.loader, kind);
                    title_changed = true;
                }
                Action::Quit => return AppControl::Exit,
            }
        }

        let control = ctx.render(|_rctx, target| {
            let backend = renderer.backend_mut();
            backend.set_target(target.encoder, target.color_view);
            let report = renderer.display();
            if report.init_failures > 0 {
                log::warn!("frame {}: {} actors failed to initialize", report.frame, report.init_failures);
            }
            renderer.backend_mut().take_encoder()
        });

        let fps = self.fps.record(&ctx.time);
        if title_changed || fps.is_some() {
            if let Some(session) = self.session.as_ref() {
                ctx.runtime.set_title(self.title(session, fps));
            }
        }
        control
    }

    fn on_close(&mut self) {
        if let Some(mut session) = self.session.take() {
            log::info!("disposing renderer");
            session.renderer.dispose();
        }
    }
}

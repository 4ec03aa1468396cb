//! Window and event loop.
//!
//! [`run`] opens the showroom window, streams assets in on a worker thread
//! and then hands every redraw to the [`Showroom`] driver and the
//! [`Renderer`].

use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::assets::{AssetLoader, AssetManifest, AssetSet, LoadEvent};
use crate::audio::LoggingAudio;
use crate::config::ShowroomConfig;
use crate::driver::Showroom;
use crate::environment::EnvironmentCatalog;
use crate::error::{Result, VitrineError};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::pipeline::QualityTier;
use crate::renderer::Renderer;

/// Runs the showroom until its window closes.
pub fn run(config: ShowroomConfig) -> Result<()> {
    config.validate()?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ShowroomApp {
        config,
        state: AppState::Pending,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct ShowroomApp {
    config: ShowroomConfig,
    state: AppState,
    /// First fatal error; stops the event loop.
    error: Option<VitrineError>,
}

enum AppState {
    Pending,
    Loading {
        window: Arc<Window>,
        gpu: GpuContext,
        loader: AssetLoader,
        showroom: Showroom<Renderer>,
        input: Input,
    },
    Running {
        window: Arc<Window>,
        renderer: Renderer,
        showroom: Showroom<Renderer>,
        input: Input,
        title: String,
    },
    Stopped,
}

impl ShowroomApp {
    fn open(&self, event_loop: &ActiveEventLoop) -> Result<AppState> {
        let window_config = &self.config.window;
        let window_attrs = WindowAttributes::default()
            .with_title(&window_config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                window_config.width,
                window_config.height,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let loader = AssetLoader::spawn(AssetManifest::from_config(&self.config))?;

        let mut input = Input::new(self.config.interaction.click_window());
        input.set_viewport(gpu.width(), gpu.height());
        let showroom = Showroom::new(
            self.config.clone(),
            EnvironmentCatalog::standard(),
            LoggingAudio::new(),
            Instant::now(),
            (gpu.width(), gpu.height()),
        );
        window.set_title(&showroom.title());
        window.request_redraw();

        Ok(AppState::Loading {
            window,
            gpu,
            loader,
            showroom,
            input,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: VitrineError) {
        error!("{e}");
        self.state = AppState::Stopped;
        self.error.get_or_insert(e);
        event_loop.exit();
    }

    /// Drains loader events. Returns the asset set once loading completes.
    fn poll_assets(&mut self) -> Option<AssetSet> {
        let AppState::Loading {
            window,
            loader,
            showroom,
            ..
        } = &mut self.state
        else {
            return None;
        };

        let mut completed = None;
        while let Some(event) = loader.poll() {
            match event {
                LoadEvent::Progress { loaded, total } => showroom.on_progress(loaded, total),
                LoadEvent::Failed { name, reason } => showroom.on_load_failed(&name, &reason),
                LoadEvent::Complete(assets) => completed = Some(assets),
            }
        }
        window.set_title(&showroom.title());
        completed
    }

    /// Builds the renderer and every scene from the loaded assets.
    fn finish_loading(&mut self, assets: AssetSet) -> Result<()> {
        let AppState::Loading {
            window,
            gpu,
            mut showroom,
            input,
            ..
        } = std::mem::replace(&mut self.state, AppState::Stopped)
        else {
            return Ok(());
        };

        let tier = self
            .config
            .quality
            .unwrap_or_else(|| QualityTier::detect(gpu.width(), gpu.height()));
        info!("quality tier: {tier:?}");

        let mut renderer = Renderer::new(gpu, &self.config, &assets, tier)?;
        showroom.start(&mut renderer)?;
        let title = showroom.title();
        window.set_title(&title);

        self.state = AppState::Running {
            window,
            renderer,
            showroom,
            input,
            title,
        };
        Ok(())
    }
}

impl ApplicationHandler for ShowroomApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Pending) {
            return;
        }
        match self.open(event_loop) {
            Ok(state) => self.state = state,
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            event_loop.exit();
            return;
        }

        match &mut self.state {
            AppState::Loading {
                gpu,
                showroom,
                input,
                ..
            } => {
                input.handle_event(&event);
                if let WindowEvent::Resized(size) = event {
                    gpu.resize(size.width, size.height);
                    input.set_viewport(size.width, size.height);
                    showroom.set_viewport(size.width, size.height);
                }
            }
            AppState::Running {
                renderer,
                showroom,
                input,
                ..
            } => {
                input.handle_event(&event);
                if let WindowEvent::Resized(size) = event {
                    input.set_viewport(size.width, size.height);
                    showroom.resize(size.width, size.height, renderer);
                }
            }
            AppState::Pending | AppState::Stopped => return,
        }

        if let WindowEvent::RedrawRequested = event {
            self.redraw(event_loop);
        }
    }
}

impl ShowroomApp {
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(assets) = self.poll_assets() {
            if let Err(e) = self.finish_loading(assets) {
                self.fail(event_loop, e);
                return;
            }
        }

        match &mut self.state {
            AppState::Loading {
                window, gpu, input, ..
            } => {
                if let Err(e) = present_blank(gpu) {
                    error!("{e}");
                }
                input.begin_frame();
                window.request_redraw();
            }
            AppState::Running {
                window,
                renderer,
                showroom,
                input,
                title,
            } => {
                showroom.tick(Instant::now(), input, renderer);
                let rendered = showroom.render_with(|output, registry, time, tunables| {
                    renderer.render(output, registry, time, tunables)
                });
                if let Some(Err(e)) = rendered {
                    error!("frame failed: {e}");
                }

                input.begin_frame();
                let next_title = showroom.title();
                if *title != next_title {
                    window.set_title(&next_title);
                    *title = next_title;
                }
                window.request_redraw();
            }
            AppState::Pending | AppState::Stopped => {}
        }
    }
}

/// Clears the surface to black while nothing else can be drawn.
fn present_blank(gpu: &GpuContext) -> Result<()> {
    let output = match gpu.surface.get_current_texture() {
        Ok(output) => output,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            gpu.reconfigure();
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Blank Frame Encoder"),
        });

    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blank Frame Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    gpu.queue.submit(std::iter::once(encoder.finish()));
    output.present();
    Ok(())
}

//! The GPU implementation of [`PipelineFactory`] and frame presentation.

use std::rc::Rc;

use log::{debug, info, warn};

use crate::assets::AssetSet;
use crate::config::{PostProcessParams, ShowroomConfig};
use crate::error::{Result, VitrineError};
use crate::gpu::GpuContext;
use crate::pipeline::{BloomHandle, BloomTuning, PipelinePlan, QualityTier, StageKind, Tunables};
use crate::render_graph::{ScenePipeline, SceneResources};
use crate::scene::{LiveOutput, PipelineFactory, SceneBundle, SceneRegistry, WipeCompositor};
use crate::texture::Texture;

/// Owns the GPU context and everything pipelines share.
pub struct Renderer {
    gpu: GpuContext,
    resources: Rc<SceneResources>,
    patterns: Vec<Rc<Texture>>,
    plan: PipelinePlan,
    post: PostProcessParams,
    threshold: f32,
    bloom: BloomTuning,
    viewport: (u32, u32),
}

impl Renderer {
    /// Uploads shared resources. Every configured wipe pattern must be
    /// among the loaded assets.
    pub fn new(
        gpu: GpuContext,
        config: &ShowroomConfig,
        assets: &AssetSet,
        tier: QualityTier,
    ) -> Result<Self> {
        let plan = PipelinePlan::for_tier(tier);
        plan.validate()?;

        let patterns = config
            .transition
            .patterns
            .iter()
            .map(|name| {
                assets
                    .image(name)
                    .map(|image| Rc::new(Texture::from_pattern(&gpu, image, name)))
                    .ok_or_else(|| VitrineError::AssetLoad {
                        name: name.clone(),
                        reason: "wipe pattern was not loaded".to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let resources = Rc::new(SceneResources::new(&gpu, assets, &config.environment_map));
        if !resources.has_environment() {
            warn!("environment map {} not loaded; using a plain background", config.environment_map);
        }

        let viewport = (gpu.width(), gpu.height());
        info!(
            "renderer ready: {tier:?} tier, {} stages, {} wipe patterns",
            plan.stages().len(),
            patterns.len()
        );

        Ok(Self {
            gpu,
            resources,
            patterns,
            plan,
            post: config.post,
            threshold: config.transition.threshold,
            bloom: BloomTuning::default(),
            viewport,
        })
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn tier(&self) -> QualityTier {
        self.plan.tier()
    }

    /// Live bloom settings of the first pipeline built, if it has a bloom
    /// stage.
    ///
    /// Only that pipeline reads these settings, and only while it is alive.
    /// Pipelines built for later scene switches read the shared [`Tunables`]
    /// and ignore the handle.
    pub fn bloom_handle(&self) -> Option<&BloomHandle> {
        self.bloom.handle()
    }

    /// Draws one frame and presents it.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render(
        &mut self,
        output: LiveOutput<'_, Self>,
        registry: &SceneRegistry,
        time: f32,
        tunables: &Tunables,
    ) -> Result<()> {
        let frame = match self.gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost, reconfiguring");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out acquiring a frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Showroom Frame Encoder"),
            });

        match output {
            LiveOutput::Direct(pipeline) => {
                if let Some(scene) = registry.get(pipeline.scene()) {
                    pipeline.render(&self.gpu, &mut encoder, scene, time, tunables, &view);
                }
            }
            LiveOutput::Composite {
                outgoing,
                incoming,
                compositor,
                progress,
            } => {
                if let Some(scene) = registry.get(outgoing.scene()) {
                    outgoing.render(
                        &self.gpu,
                        &mut encoder,
                        scene,
                        time,
                        tunables,
                        compositor.outgoing_view(),
                    );
                }
                if let Some(scene) = registry.get(incoming.scene()) {
                    incoming.render(
                        &self.gpu,
                        &mut encoder,
                        scene,
                        time,
                        tunables,
                        compositor.incoming_view(),
                    );
                }
                compositor.render(&self.gpu, &mut encoder, progress, &view);
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl PipelineFactory for Renderer {
    type Pipeline = ScenePipeline;
    type Compositor = WipeCompositor;

    fn build_pipeline(&mut self, scene: &SceneBundle) -> ScenePipeline {
        let bloom = if self.plan.has(StageKind::Bloom) {
            self.bloom.claim(&self.post)
        } else {
            None
        };
        ScenePipeline::new(
            &self.gpu,
            scene.id(),
            self.plan.clone(),
            Rc::clone(&self.resources),
            self.gpu.config.format,
            self.viewport.0,
            self.viewport.1,
            bloom,
        )
    }

    fn build_compositor(&mut self, pattern: usize) -> WipeCompositor {
        let index = pattern.min(self.patterns.len().saturating_sub(1));
        WipeCompositor::new(
            &self.gpu,
            index,
            Rc::clone(&self.patterns[index]),
            self.threshold,
            self.viewport.0,
            self.viewport.1,
        )
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
        self.gpu.resize(width, height);
    }

    fn resize_pipeline(&mut self, pipeline: &mut ScenePipeline, width: u32, height: u32) {
        pipeline.resize(&self.gpu, width, height);
    }
}

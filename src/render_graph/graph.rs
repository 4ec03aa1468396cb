//! A scene pipeline: scene capture followed by the stages of a plan.

use std::rc::Rc;

use log::debug;

use crate::gpu::GpuContext;
use crate::pipeline::{BloomHandle, PipelinePlan, Slot, StageKind, Tunables};
use crate::render_graph::post_process_nodes::{BloomNode, BoxBlurNode, DepthOfFieldNode, FxaaNode};
use crate::render_graph::scene_capture::{SceneCapture, SceneResources};
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode, RenderTarget};
use crate::scene::{SceneBundle, SceneId};

/// Renders one scene through its post-processing stages.
///
/// ```text
/// Scene capture ─┬─ color ──▶ Stage 0 ──▶ Stage 1 ──▶ ... ──▶ Output
///                └─ motion ─────────────▶ (any stage naming it)
/// ```
///
/// Every stage except the last writes its own target so later stages can
/// read any earlier image, not only the previous one. The last stage writes
/// wherever the caller points it: the surface, or a transition capture.
pub struct ScenePipeline {
    scene: SceneId,
    plan: PipelinePlan,
    capture: SceneCapture,
    nodes: Vec<Box<dyn RenderNode>>,
    targets: Vec<RenderTarget>,
    width: u32,
    height: u32,
}

impl ScenePipeline {
    /// Builds the passes for `plan`. `bloom` is handed to the bloom stage,
    /// if the plan has one.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gpu: &GpuContext,
        scene: SceneId,
        plan: PipelinePlan,
        resources: Rc<SceneResources>,
        output_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        mut bloom: Option<BloomHandle>,
    ) -> Self {
        let nodes: Vec<Box<dyn RenderNode>> = plan
            .stages()
            .iter()
            .map(|stage| -> Box<dyn RenderNode> {
                match stage.kind {
                    StageKind::BoxBlur => Box::new(BoxBlurNode::new(gpu)),
                    StageKind::DepthOfField => Box::new(DepthOfFieldNode::new(gpu)),
                    StageKind::Bloom => Box::new(BloomNode::new(gpu, width, height, bloom.take())),
                    StageKind::Antialias => Box::new(FxaaNode::new(gpu, output_format)),
                }
            })
            .collect();

        let intermediate = plan.stages().len().saturating_sub(1);
        let targets = (0..intermediate)
            .map(|i| RenderTarget::new(gpu, &Self::target_label(i), width, height, HDR_FORMAT))
            .collect();

        debug!(
            "built {:?} pipeline for {scene} at {width}x{height}",
            plan.tier()
        );

        Self {
            scene,
            plan,
            capture: SceneCapture::new(gpu, resources, width, height),
            nodes,
            targets,
            width,
            height,
        }
    }

    fn target_label(index: usize) -> String {
        format!("Pipeline Stage {index} Target")
    }

    pub fn scene(&self) -> SceneId {
        self.scene
    }

    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocates every size-dependent image.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.capture.resize(gpu, width, height);
        for (i, target) in self.targets.iter_mut().enumerate() {
            target.ensure_size(gpu, &Self::target_label(i), width, height);
        }
        for node in &mut self.nodes {
            node.resize(gpu, width, height);
        }
    }

    /// Records the whole pipeline for `scene` into `encoder`, ending in
    /// `output`.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        scene: &SceneBundle,
        time: f32,
        tunables: &Tunables,
        output: &wgpu::TextureView,
    ) {
        let mut ctx = RenderContext {
            gpu,
            encoder,
            time,
            camera: &scene.camera,
            tunables,
            width: self.width,
            height: self.height,
        };

        self.capture.render(&mut ctx, scene);

        let last = self.nodes.len().saturating_sub(1);
        for (i, (node, stage)) in self.nodes.iter().zip(self.plan.stages()).enumerate() {
            let inputs: Vec<&wgpu::TextureView> = stage
                .inputs
                .iter()
                .map(|slot| match slot {
                    Slot::SceneColor => &self.capture.color.view,
                    Slot::SceneMotion => &self.capture.motion.view,
                    Slot::Stage(j) => &self.targets[*j].view,
                })
                .collect();
            let target = if i == last {
                output
            } else {
                &self.targets[i].view
            };
            node.execute(&mut ctx, target, &inputs);
        }
    }
}

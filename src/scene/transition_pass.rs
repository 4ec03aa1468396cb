//! GPU side of a scene transition: the wipe compositor.
//!
//! During a transition both scenes render into the compositor's two capture
//! targets, then a single pass blends them through a grayscale pattern.
//! Bright pattern texels switch to the incoming scene first.

use std::rc::Rc;

use crate::gpu::GpuContext;
use crate::post_process::FullscreenPass;
use crate::render_graph::RenderTarget;
use crate::texture::Texture;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransitionUniforms {
    pub resolution: [f32; 2],
    /// 0 shows the outgoing scene, 1 the incoming one.
    pub progress: f32,
    /// Softness of the wipe edge.
    pub threshold: f32,
}

const WIPE_SHADER: &str = r#"
struct Uniforms {
    resolution: vec2f,
    progress: f32,
    threshold: f32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var linear_sampler: sampler;
@group(0) @binding(2) var outgoing: texture_2d<f32>;
@group(0) @binding(3) var incoming: texture_2d<f32>;
@group(0) @binding(4) var pattern: texture_2d<f32>;

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let a = textureSampleLevel(outgoing, linear_sampler, in.uv, 0.0);
    let b = textureSampleLevel(incoming, linear_sampler, in.uv, 0.0);
    let p = textureSampleLevel(pattern, linear_sampler, in.uv, 0.0).r;
    let t = 1.0 - clamp(u.progress, 0.0, 1.0);
    let reveal = t * (1.0 + 2.0 * u.threshold) - u.threshold;
    let amount = clamp((p - reveal) / u.threshold, 0.0, 1.0);
    return mix(a, b, amount);
}
"#;

/// Blends two scene images through a wipe pattern.
///
/// Capture targets keep the size they were allocated with; a transition that
/// spans a resize is stretched onto the new surface.
pub struct WipeCompositor {
    pass: FullscreenPass,
    pattern_index: usize,
    pattern: Rc<Texture>,
    threshold: f32,
    outgoing: RenderTarget,
    incoming: RenderTarget,
}

impl WipeCompositor {
    pub fn new(
        gpu: &GpuContext,
        pattern_index: usize,
        pattern: Rc<Texture>,
        threshold: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let format = gpu.config.format;
        Self {
            pass: FullscreenPass::new(
                gpu,
                "Wipe Transition",
                WIPE_SHADER,
                std::mem::size_of::<TransitionUniforms>() as u64,
                3,
                format,
            ),
            pattern_index,
            pattern,
            threshold,
            outgoing: RenderTarget::new(gpu, "Transition Outgoing", width, height, format),
            incoming: RenderTarget::new(gpu, "Transition Incoming", width, height, format),
        }
    }

    pub fn pattern_index(&self) -> usize {
        self.pattern_index
    }

    pub fn size(&self) -> (u32, u32) {
        self.outgoing.size()
    }

    pub fn outgoing_view(&self) -> &wgpu::TextureView {
        &self.outgoing.view
    }

    pub fn incoming_view(&self) -> &wgpu::TextureView {
        &self.incoming.view
    }

    /// Records the blend of both captures into `target`.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        progress: f32,
        target: &wgpu::TextureView,
    ) {
        let (width, height) = self.size();
        self.pass.write_uniforms(
            gpu,
            &TransitionUniforms {
                resolution: [width as f32, height as f32],
                progress,
                threshold: self.threshold,
            },
        );
        self.pass.draw(
            gpu,
            encoder,
            target,
            &[&self.outgoing.view, &self.incoming.view, &self.pattern.view],
        );
    }
}

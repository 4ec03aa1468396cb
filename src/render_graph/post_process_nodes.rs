//! Post-processing stages of a scene pipeline.
//!
//! Desktop pipelines chain [`BoxBlurNode`], [`DepthOfFieldNode`],
//! [`BloomNode`] and [`FxaaNode`]; mobile pipelines run [`FxaaNode`] alone.

use crate::gpu::GpuContext;
use crate::pipeline::{BloomHandle, BloomSettings};
use crate::post_process::FullscreenPass;
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode, RenderTarget};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BoxBlurUniforms {
    resolution: [f32; 2],
    size: f32,
    spread: f32,
}

const BOX_BLUR_SHADER: &str = r#"
struct Uniforms {
    resolution: vec2f,
    size: f32,
    spread: f32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var linear_sampler: sampler;
@group(0) @binding(2) var input0: texture_2d<f32>;

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let texel = 1.0 / u.resolution;
    let radius = i32(round(u.size));
    var sum = vec4f(0.0);
    var count = 0.0;
    for (var y = -radius; y <= radius; y++) {
        for (var x = -radius; x <= radius; x++) {
            let offset = vec2f(f32(x), f32(y)) * u.spread * texel;
            sum += textureSampleLevel(input0, linear_sampler, in.uv + offset, 0.0);
            count += 1.0;
        }
    }
    return sum / count;
}
"#;

/// Averages a square neighbourhood of `blur_size` taps each side, spaced
/// `blur_spread` texels apart.
pub struct BoxBlurNode {
    pass: FullscreenPass,
}

impl BoxBlurNode {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            pass: FullscreenPass::new(
                gpu,
                "Box Blur",
                BOX_BLUR_SHADER,
                std::mem::size_of::<BoxBlurUniforms>() as u64,
                1,
                HDR_FORMAT,
            ),
        }
    }
}

impl RenderNode for BoxBlurNode {
    fn label(&self) -> &str {
        self.pass.label()
    }

    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        inputs: &[&wgpu::TextureView],
    ) {
        let post = &ctx.tunables.post;
        self.pass.write_uniforms(
            ctx.gpu,
            &BoxBlurUniforms {
                resolution: ctx.resolution(),
                size: post.blur_size.max(0.0),
                spread: post.blur_spread,
            },
        );
        self.pass.draw(ctx.gpu, ctx.encoder, target, inputs);
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DepthOfFieldUniforms {
    focus_distance: f32,
    min_distance: f32,
    max_distance: f32,
    amount: f32,
}

const DEPTH_OF_FIELD_SHADER: &str = r#"
struct Uniforms {
    focus_distance: f32,
    min_distance: f32,
    max_distance: f32,
    amount: f32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var linear_sampler: sampler;
@group(0) @binding(2) var sharp: texture_2d<f32>;
@group(0) @binding(3) var blurred: texture_2d<f32>;
@group(0) @binding(4) var motion: texture_2d<f32>;

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let a = textureSampleLevel(sharp, linear_sampler, in.uv, 0.0);
    let b = textureSampleLevel(blurred, linear_sampler, in.uv, 0.0);
    // z holds camera-local depth, w marks covered pixels
    let m = textureSampleLevel(motion, linear_sampler, in.uv, 0.0);
    var blend = 1.0;
    if (m.w > 0.5) {
        blend = smoothstep(u.min_distance, u.max_distance, abs(m.z - u.focus_distance));
    }
    return mix(a, b, clamp(blend * u.amount, 0.0, 1.0));
}
"#;

/// Mixes the sharp capture with its blurred copy by distance from the focus
/// plane. Background pixels with no geometry count as fully out of focus.
pub struct DepthOfFieldNode {
    pass: FullscreenPass,
}

impl DepthOfFieldNode {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            pass: FullscreenPass::new(
                gpu,
                "Depth Of Field",
                DEPTH_OF_FIELD_SHADER,
                std::mem::size_of::<DepthOfFieldUniforms>() as u64,
                3,
                HDR_FORMAT,
            ),
        }
    }
}

impl RenderNode for DepthOfFieldNode {
    fn label(&self) -> &str {
        self.pass.label()
    }

    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        inputs: &[&wgpu::TextureView],
    ) {
        let post = &ctx.tunables.post;
        self.pass.write_uniforms(
            ctx.gpu,
            &DepthOfFieldUniforms {
                focus_distance: ctx.tunables.focus_distance,
                min_distance: post.dof_min_distance,
                max_distance: post.dof_max_distance,
                amount: post.blur_amount,
            },
        );
        self.pass.draw(ctx.gpu, ctx.encoder, target, inputs);
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BloomUniforms {
    resolution: [f32; 2],
    direction: [f32; 2],
    strength: f32,
    radius: f32,
    threshold: f32,
    _padding: f32,
}

const BLOOM_BRIGHT_SHADER: &str = r#"
struct Uniforms {
    resolution: vec2f,
    direction: vec2f,
    strength: f32,
    radius: f32,
    threshold: f32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var linear_sampler: sampler;
@group(0) @binding(2) var input0: texture_2d<f32>;

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let color = textureSampleLevel(input0, linear_sampler, in.uv, 0.0);
    let luma = dot(color.rgb, vec3f(0.2126, 0.7152, 0.0722));
    let weight = smoothstep(u.threshold, u.threshold + 0.1, luma);
    return vec4f(color.rgb * weight, 1.0);
}
"#;

const BLOOM_BLUR_SHADER: &str = r#"
struct Uniforms {
    resolution: vec2f,
    direction: vec2f,
    strength: f32,
    radius: f32,
    threshold: f32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var linear_sampler: sampler;
@group(0) @binding(2) var input0: texture_2d<f32>;

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let step = u.direction / u.resolution * (1.0 + u.radius * 8.0);
    var sum = textureSampleLevel(input0, linear_sampler, in.uv, 0.0).rgb * weights[0];
    for (var i = 1; i < 5; i++) {
        let offset = step * f32(i);
        sum += textureSampleLevel(input0, linear_sampler, in.uv + offset, 0.0).rgb * weights[i];
        sum += textureSampleLevel(input0, linear_sampler, in.uv - offset, 0.0).rgb * weights[i];
    }
    return vec4f(sum, 1.0);
}
"#;

const BLOOM_COMPOSITE_SHADER: &str = r#"
struct Uniforms {
    resolution: vec2f,
    direction: vec2f,
    strength: f32,
    radius: f32,
    threshold: f32,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var linear_sampler: sampler;
@group(0) @binding(2) var scene: texture_2d<f32>;
@group(0) @binding(3) var glow: texture_2d<f32>;

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let base = textureSampleLevel(scene, linear_sampler, in.uv, 0.0);
    let bloom = textureSampleLevel(glow, linear_sampler, in.uv, 0.0).rgb;
    return vec4f(base.rgb + bloom * u.strength, base.a);
}
"#;

/// Adds a blurred copy of the bright parts of the image.
///
/// Works at half resolution: threshold, horizontal blur, vertical blur, then
/// composite at full size. A node built with a [`BloomHandle`] reads its
/// settings from the handle; others follow the shared tunables.
pub struct BloomNode {
    bright: FullscreenPass,
    blur_h: FullscreenPass,
    blur_v: FullscreenPass,
    composite: FullscreenPass,
    half_a: RenderTarget,
    half_b: RenderTarget,
    handle: Option<BloomHandle>,
}

impl BloomNode {
    pub fn new(gpu: &GpuContext, width: u32, height: u32, handle: Option<BloomHandle>) -> Self {
        let size = std::mem::size_of::<BloomUniforms>() as u64;
        let (hw, hh) = half(width, height);
        Self {
            bright: FullscreenPass::new(gpu, "Bloom Bright", BLOOM_BRIGHT_SHADER, size, 1, HDR_FORMAT),
            blur_h: FullscreenPass::new(gpu, "Bloom Blur H", BLOOM_BLUR_SHADER, size, 1, HDR_FORMAT),
            blur_v: FullscreenPass::new(gpu, "Bloom Blur V", BLOOM_BLUR_SHADER, size, 1, HDR_FORMAT),
            composite: FullscreenPass::new(
                gpu,
                "Bloom Composite",
                BLOOM_COMPOSITE_SHADER,
                size,
                2,
                HDR_FORMAT,
            ),
            half_a: RenderTarget::new(gpu, "Bloom Half A", hw, hh, HDR_FORMAT),
            half_b: RenderTarget::new(gpu, "Bloom Half B", hw, hh, HDR_FORMAT),
            handle,
        }
    }

    pub fn handle(&self) -> Option<&BloomHandle> {
        self.handle.as_ref()
    }
}

fn half(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

impl RenderNode for BloomNode {
    fn label(&self) -> &str {
        "Bloom"
    }

    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        inputs: &[&wgpu::TextureView],
    ) {
        let Some(&input) = inputs.first() else {
            return;
        };
        let settings = match &self.handle {
            Some(handle) => handle.get(),
            None => BloomSettings::from_params(&ctx.tunables.post),
        };
        let uniforms = |resolution: [f32; 2], direction: [f32; 2]| BloomUniforms {
            resolution,
            direction,
            strength: settings.strength,
            radius: settings.radius,
            threshold: settings.threshold,
            _padding: 0.0,
        };
        let half_res = [self.half_a.width() as f32, self.half_a.height() as f32];

        self.bright
            .write_uniforms(ctx.gpu, &uniforms(half_res, [0.0, 0.0]));
        self.blur_h
            .write_uniforms(ctx.gpu, &uniforms(half_res, [1.0, 0.0]));
        self.blur_v
            .write_uniforms(ctx.gpu, &uniforms(half_res, [0.0, 1.0]));
        self.composite
            .write_uniforms(ctx.gpu, &uniforms(ctx.resolution(), [0.0, 0.0]));

        self.bright
            .draw(ctx.gpu, ctx.encoder, &self.half_a.view, &[input]);
        self.blur_h
            .draw(ctx.gpu, ctx.encoder, &self.half_b.view, &[&self.half_a.view]);
        self.blur_v
            .draw(ctx.gpu, ctx.encoder, &self.half_a.view, &[&self.half_b.view]);
        self.composite
            .draw(ctx.gpu, ctx.encoder, target, &[input, &self.half_a.view]);
    }

    fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        let (hw, hh) = half(width, height);
        self.half_a.ensure_size(gpu, "Bloom Half A", hw, hh);
        self.half_b.ensure_size(gpu, "Bloom Half B", hw, hh);
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FxaaUniforms {
    texel: [f32; 2],
    _padding: [f32; 2],
}

const FXAA_SHADER: &str = r#"
struct Uniforms {
    texel: vec2f,
}
@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var linear_sampler: sampler;
@group(0) @binding(2) var input0: texture_2d<f32>;

fn luma(c: vec3f) -> f32 {
    return dot(c, vec3f(0.299, 0.587, 0.114));
}

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let span_max = 8.0;
    let reduce_mul = 1.0 / 8.0;
    let reduce_min = 1.0 / 128.0;

    let rgb_nw = textureSampleLevel(input0, linear_sampler, in.uv + vec2f(-1.0, -1.0) * u.texel, 0.0).rgb;
    let rgb_ne = textureSampleLevel(input0, linear_sampler, in.uv + vec2f(1.0, -1.0) * u.texel, 0.0).rgb;
    let rgb_sw = textureSampleLevel(input0, linear_sampler, in.uv + vec2f(-1.0, 1.0) * u.texel, 0.0).rgb;
    let rgb_se = textureSampleLevel(input0, linear_sampler, in.uv + vec2f(1.0, 1.0) * u.texel, 0.0).rgb;
    let center = textureSampleLevel(input0, linear_sampler, in.uv, 0.0);

    let l_nw = luma(rgb_nw);
    let l_ne = luma(rgb_ne);
    let l_sw = luma(rgb_sw);
    let l_se = luma(rgb_se);
    let l_m = luma(center.rgb);
    let l_min = min(l_m, min(min(l_nw, l_ne), min(l_sw, l_se)));
    let l_max = max(l_m, max(max(l_nw, l_ne), max(l_sw, l_se)));

    var dir = vec2f(-((l_nw + l_ne) - (l_sw + l_se)), (l_nw + l_sw) - (l_ne + l_se));
    let dir_reduce = max((l_nw + l_ne + l_sw + l_se) * 0.25 * reduce_mul, reduce_min);
    let rcp_dir_min = 1.0 / (min(abs(dir.x), abs(dir.y)) + dir_reduce);
    dir = clamp(dir * rcp_dir_min, vec2f(-span_max), vec2f(span_max)) * u.texel;

    let rgb_a = 0.5 * (
        textureSampleLevel(input0, linear_sampler, in.uv + dir * (1.0 / 3.0 - 0.5), 0.0).rgb +
        textureSampleLevel(input0, linear_sampler, in.uv + dir * (2.0 / 3.0 - 0.5), 0.0).rgb);
    let rgb_b = rgb_a * 0.5 + 0.25 * (
        textureSampleLevel(input0, linear_sampler, in.uv - dir * 0.5, 0.0).rgb +
        textureSampleLevel(input0, linear_sampler, in.uv + dir * 0.5, 0.0).rgb);

    let l_b = luma(rgb_b);
    if (l_b < l_min || l_b > l_max) {
        return vec4f(rgb_a, center.a);
    }
    return vec4f(rgb_b, center.a);
}
"#;

/// Fast approximate antialiasing. Always the last stage, so it writes in the
/// presentation format.
pub struct FxaaNode {
    pass: FullscreenPass,
}

impl FxaaNode {
    pub fn new(gpu: &GpuContext, output_format: wgpu::TextureFormat) -> Self {
        Self {
            pass: FullscreenPass::new(
                gpu,
                "FXAA",
                FXAA_SHADER,
                std::mem::size_of::<FxaaUniforms>() as u64,
                1,
                output_format,
            ),
        }
    }
}

impl RenderNode for FxaaNode {
    fn label(&self) -> &str {
        self.pass.label()
    }

    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        inputs: &[&wgpu::TextureView],
    ) {
        let [w, h] = ctx.resolution();
        self.pass.write_uniforms(
            ctx.gpu,
            &FxaaUniforms {
                texel: [1.0 / w, 1.0 / h],
                _padding: [0.0; 2],
            },
        );
        self.pass.draw(ctx.gpu, ctx.encoder, target, inputs);
    }
}

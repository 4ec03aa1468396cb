//! Fullscreen-triangle passes.
//!
//! Every post-processing stage and the transition compositor is a
//! [`FullscreenPass`]: a fragment shader drawn over the whole target that
//! reads one uniform block and a fixed number of input textures.
//!
//! The shader receives:
//! ```wgsl
//! @group(0) @binding(0) var<uniform> u: Uniforms;   // stage-specific layout
//! @group(0) @binding(1) var linear_sampler: sampler;
//! @group(0) @binding(2) var input0: texture_2d<f32>;
//! @group(0) @binding(3) var input1: texture_2d<f32>;
//! // ...one binding per input
//! ```
//! and the vertex stage in [`FULLSCREEN_VERTEX`] hands it `in.uv` with the
//! origin at the top-left.

use crate::gpu::GpuContext;

/// Vertex stage shared by every fullscreen pass. Prepend it to a fragment
/// shader that defines `fn fs(in: VertexOutput) -> @location(0) vec4f`.
pub const FULLSCREEN_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
}

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> VertexOutput {
    // Fullscreen triangle
    let x = f32(i32(vi) - 1);
    let y = f32(i32(vi & 1u) * 2 - 1);
    var out: VertexOutput;
    out.position = vec4f(x * 3.0, y * 3.0, 0.0, 1.0);
    out.uv = vec2f((x * 3.0 + 1.0) * 0.5, (1.0 - y * 3.0) * 0.5);
    return out;
}
"#;

pub struct FullscreenPass {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    input_count: usize,
}

impl FullscreenPass {
    /// Compiles `fragment_source` behind the shared vertex stage.
    ///
    /// `uniform_size` is the byte size of the stage's uniform block and
    /// `format` the format of the targets it will draw into.
    pub fn new(
        gpu: &GpuContext,
        label: &str,
        fragment_source: &str,
        uniform_size: u64,
        input_count: usize,
        format: wgpu::TextureFormat,
    ) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} Shader")),
            source: wgpu::ShaderSource::Wgsl(
                format!("{FULLSCREEN_VERTEX}\n{fragment_source}").into(),
            ),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Uniforms")),
            size: uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut entries = vec![
            // Uniforms
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Sampler
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        for index in 0..input_count {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2 + index as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Bind Group Layout")),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{label} Pipeline")),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            label: label.to_string(),
            pipeline,
            uniform_buffer,
            bind_group_layout,
            sampler,
            input_count,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn write_uniforms<T: bytemuck::Pod>(&self, gpu: &GpuContext, uniforms: &T) {
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    fn create_bind_group(&self, gpu: &GpuContext, inputs: &[&wgpu::TextureView]) -> wgpu::BindGroup {
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        for (index, view) in inputs.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 2 + index as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", self.label)),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }

    /// Records a pass that draws into `target`, sampling `inputs` in binding
    /// order. Inputs beyond the pass's declared count are ignored; missing
    /// inputs skip the draw.
    pub fn draw(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        inputs: &[&wgpu::TextureView],
    ) {
        if inputs.len() < self.input_count {
            log::warn!(
                "{}: expected {} inputs, got {}",
                self.label,
                self.input_count,
                inputs.len()
            );
            return;
        }
        let bind_group = self.create_bind_group(gpu, &inputs[..self.input_count]);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
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

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

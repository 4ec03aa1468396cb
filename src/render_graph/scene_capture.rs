//! First stage of every pipeline: draws a scene into color and motion images.
//!
//! # Bind groups
//!
//! - **Group 0**: camera uniforms (matrices, position, time, glass parameters)
//! - **Group 1**: model uniforms, one 256-byte slot per draw, dynamic offset
//! - **Group 2**: base texture, sampler and the HDR environment map
//!
//! # Outputs
//!
//! | Location | Image        | Contents                                  |
//! |----------|--------------|-------------------------------------------|
//! | 0        | scene color  | shaded color, `HDR_FORMAT`                |
//! | 1        | scene motion | xy screen motion, z view depth, w coverage |
//!
//! Opaque surfaces are drawn first with depth writes, then glass back to
//! front, then additive effects. The environment map is drawn behind
//! everything when one is loaded.

use std::collections::HashMap;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use image::Rgba32FImage;

use crate::assets::{Asset, AssetSet};
use crate::gpu::GpuContext;
use crate::material::{Material, Shading};
use crate::mesh::{Mesh, MeshData, Primitive, Vertex3d};
use crate::post_process::FULLSCREEN_VERTEX;
use crate::render_graph::{DepthTarget, HDR_FORMAT, RenderContext, RenderTarget};
use crate::scene::SceneBundle;
use crate::texture::Texture;

/// Byte stride between model uniform slots. Matches the default
/// `min_uniform_buffer_offset_alignment`.
const MODEL_STRIDE: u64 = 256;
const INITIAL_MODEL_SLOTS: usize = 64;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.01,
    g: 0.01,
    b: 0.015,
    a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// Last frame's view-projection, for per-pixel motion.
    pub prev_view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub time: f32,
    /// Glass tint in rgb, base opacity in a.
    pub glass_tint: [f32; 4],
    /// ior, clearcoat, environment intensity, dispersion.
    pub glass: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    /// uv scale in xy, uv offset in zw.
    pub uv_transform: [f32; 4],
    /// roughness, shading kind.
    pub params: [f32; 4],
}

const MESH_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4f,
    view: mat4x4f,
    prev_view_proj: mat4x4f,
    inv_view_proj: mat4x4f,
    camera_pos: vec3f,
    time: f32,
    glass_tint: vec4f,
    glass: vec4f,
}

struct Model {
    model: mat4x4f,
    normal_matrix: mat4x4f,
    color: vec4f,
    emissive: vec4f,
    uv_transform: vec4f,
    params: vec4f,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var<uniform> model: Model;
@group(2) @binding(0) var base_texture: texture_2d<f32>;
@group(2) @binding(1) var base_sampler: sampler;
@group(2) @binding(2) var environment: texture_2d<f32>;

struct VertexInput {
    @location(0) position: vec3f,
    @location(1) normal: vec3f,
    @location(2) uv: vec2f,
}

struct VertexOutput {
    @builtin(position) clip: vec4f,
    @location(0) world_pos: vec3f,
    @location(1) normal: vec3f,
    @location(2) uv: vec2f,
    @location(3) view_z: f32,
    @location(4) current: vec4f,
    @location(5) previous: vec4f,
}

struct FragmentOutput {
    @location(0) color: vec4f,
    @location(1) motion: vec4f,
}

const PI: f32 = 3.14159265;

fn sample_environment(dir: vec3f) -> vec3f {
    let size = vec2f(textureDimensions(environment));
    let d = normalize(dir);
    let u = atan2(d.z, d.x) / (2.0 * PI) + 0.5;
    let v = acos(clamp(d.y, -1.0, 1.0)) / PI;
    let texel = vec2i(clamp(vec2f(u, v) * size, vec2f(0.0), size - 1.0));
    return textureLoad(environment, texel, 0).rgb;
}

@vertex
fn vs(in: VertexInput) -> VertexOutput {
    let world = model.model * vec4f(in.position, 1.0);
    var out: VertexOutput;
    out.clip = camera.view_proj * world;
    out.world_pos = world.xyz;
    out.normal = normalize((model.normal_matrix * vec4f(in.normal, 0.0)).xyz);
    out.uv = in.uv * model.uv_transform.xy + model.uv_transform.zw;
    out.view_z = (camera.view * world).z;
    out.current = out.clip;
    out.previous = camera.prev_view_proj * world;
    return out;
}

@fragment
fn fs(in: VertexOutput) -> FragmentOutput {
    let base = textureSample(base_texture, base_sampler, in.uv) * model.color;
    let n = normalize(in.normal);
    let v = normalize(camera.camera_pos - in.world_pos);
    let kind = u32(model.params.y);
    let roughness = model.params.x;

    var color: vec4f;
    if (kind == 0u) {
        // Key light plus ambient
        let l = normalize(vec3f(0.5, 1.0, 0.3));
        let diffuse = max(dot(n, l), 0.0);
        let h = normalize(l + v);
        let shininess = mix(64.0, 4.0, roughness);
        let specular = pow(max(dot(n, h), 0.0), shininess) * (1.0 - roughness) * 0.5;
        color = vec4f(base.rgb * (0.3 + diffuse * 0.8) + specular + model.emissive.rgb, base.a);
    } else if (kind == 1u) {
        color = vec4f(base.rgb + model.emissive.rgb, base.a);
    } else if (kind == 2u) {
        let fresnel = pow(1.0 - max(dot(n, v), 0.0), 5.0);
        let reflected = sample_environment(reflect(-v, n)) * camera.glass.z;
        let coat = camera.glass.y * fresnel;
        let tint = camera.glass_tint.rgb * base.rgb;
        color = vec4f(tint * 0.08 + reflected * (0.04 + coat), clamp(camera.glass_tint.a + coat * 0.5, 0.0, 1.0));
    } else {
        color = vec4f(base.rgb * base.a + model.emissive.rgb, 1.0);
    }

    let ndc_now = in.current.xy / in.current.w;
    let ndc_then = in.previous.xy / in.previous.w;
    var out: FragmentOutput;
    out.color = color;
    out.motion = vec4f((ndc_now - ndc_then) * 0.5, in.view_z, 1.0);
    return out;
}
"#;

const SKY_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4f,
    view: mat4x4f,
    prev_view_proj: mat4x4f,
    inv_view_proj: mat4x4f,
    camera_pos: vec3f,
    time: f32,
    glass_tint: vec4f,
    glass: vec4f,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(2) var environment: texture_2d<f32>;

struct FragmentOutput {
    @location(0) color: vec4f,
    @location(1) motion: vec4f,
}

const PI: f32 = 3.14159265;

@fragment
fn fs(in: VertexOutput) -> FragmentOutput {
    let ndc = vec2f(in.uv.x * 2.0 - 1.0, 1.0 - in.uv.y * 2.0);
    let far = camera.inv_view_proj * vec4f(ndc, 1.0, 1.0);
    let d = normalize(far.xyz / far.w - camera.camera_pos);
    let size = vec2f(textureDimensions(environment));
    let u = atan2(d.z, d.x) / (2.0 * PI) + 0.5;
    let v = acos(clamp(d.y, -1.0, 1.0)) / PI;
    let texel = vec2i(clamp(vec2f(u, v) * size, vec2f(0.0), size - 1.0));

    var out: FragmentOutput;
    out.color = vec4f(textureLoad(environment, texel, 0).rgb, 1.0);
    out.motion = vec4f(0.0);
    return out;
}
"#;

/// GPU data every pipeline shares: primitive meshes and uploaded textures.
pub struct SceneResources {
    meshes: Vec<Mesh>,
    textures: HashMap<String, Texture>,
    white: Texture,
    environment: Texture,
    has_environment: bool,
}

impl SceneResources {
    /// Uploads one mesh per primitive and every image asset. The asset named
    /// `environment_map` becomes the sky, if it was loaded.
    pub fn new(gpu: &GpuContext, assets: &AssetSet, environment_map: &str) -> Self {
        let meshes = Primitive::ALL
            .iter()
            .map(|&p| Mesh::upload(gpu, &MeshData::primitive(p), &format!("{p:?}")))
            .collect();

        let textures = assets
            .iter()
            .filter_map(|(name, asset)| match asset {
                Asset::Image(_) => Some((name.to_string(), Texture::from_asset(gpu, asset, name))),
                Asset::Hdr(_) => None,
            })
            .collect();

        let (environment, has_environment) = match assets.hdr(environment_map) {
            Some(hdr) => (Texture::from_hdr(gpu, hdr, environment_map), true),
            None => {
                let black = Rgba32FImage::from_pixel(1, 1, image::Rgba([0.0, 0.0, 0.0, 1.0]));
                (Texture::from_hdr(gpu, &black, "Empty Environment"), false)
            }
        };

        Self {
            meshes,
            textures,
            white: Texture::white(gpu),
            environment,
            has_environment,
        }
    }

    pub fn mesh(&self, primitive: Primitive) -> &Mesh {
        &self.meshes[primitive.index()]
    }

    pub fn texture(&self, name: &str) -> Option<&Texture> {
        self.textures.get(name)
    }

    pub fn has_environment(&self) -> bool {
        self.has_environment
    }
}

struct Draw {
    model: Mat4,
    primitive: Primitive,
    material: Material,
    depth: f32,
}

fn shading_kind(shading: Shading) -> f32 {
    match shading {
        Shading::Lit => 0.0,
        Shading::Unlit => 1.0,
        Shading::Glass => 2.0,
        Shading::Additive => 3.0,
    }
}

fn color_targets(blend: Option<wgpu::BlendState>, write_motion: bool) -> [Option<wgpu::ColorTargetState>; 2] {
    [
        Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        }),
        Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: None,
            write_mask: if write_motion {
                wgpu::ColorWrites::ALL
            } else {
                wgpu::ColorWrites::empty()
            },
        }),
    ]
}

const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

pub struct SceneCapture {
    resources: Rc<SceneResources>,
    opaque_pipeline: wgpu::RenderPipeline,
    glass_pipeline: wgpu::RenderPipeline,
    additive_pipeline: wgpu::RenderPipeline,
    sky_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_slots: usize,
    texture_bind_groups: HashMap<String, wgpu::BindGroup>,
    default_bind_group: wgpu::BindGroup,
    prev_view_proj: Option<Mat4>,
    pub color: RenderTarget,
    pub motion: RenderTarget,
    depth: DepthTarget,
}

impl SceneCapture {
    pub fn new(gpu: &GpuContext, resources: Rc<SceneResources>, width: u32, height: u32) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(MESH_SHADER.into()),
        });
        let sky_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{FULLSCREEN_VERTEX}\n{SKY_SHADER}").into()),
        });

        // Camera uniform buffer (group 0)
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Model uniform buffer (group 1)
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ModelUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let (model_buffer, model_bind_group) =
            Self::create_model_buffer(gpu, &model_layout, INITIAL_MODEL_SLOTS);

        // Texture bind group layout (group 2)
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let texture_bind_group = |texture: &Texture, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&resources.environment.view),
                    },
                ],
            })
        };
        let default_bind_group = texture_bind_group(&resources.white, "Scene Default Texture Bind Group");
        let texture_bind_groups = resources
            .textures
            .iter()
            .map(|(name, texture)| (name.clone(), texture_bind_group(texture, name)))
            .collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &model_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = |label: &str,
                             blend: Option<wgpu::BlendState>,
                             write_motion: bool,
                             depth_write: bool,
                             cull_mode: Option<wgpu::Face>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &color_targets(blend, write_motion),
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode,
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthTarget::FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let opaque_pipeline = mesh_pipeline("Scene Opaque Pipeline", None, true, true, Some(wgpu::Face::Back));
        let glass_pipeline = mesh_pipeline(
            "Scene Glass Pipeline",
            Some(wgpu::BlendState::ALPHA_BLENDING),
            false,
            false,
            None,
        );
        let additive_pipeline = mesh_pipeline(
            "Scene Additive Pipeline",
            Some(ADDITIVE_BLENDING),
            false,
            false,
            None,
        );

        let sky_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Sky Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let sky_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Sky Pipeline"),
            layout: Some(&sky_layout),
            vertex: wgpu::VertexState {
                module: &sky_shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &sky_shader,
                entry_point: Some("fs"),
                targets: &color_targets(None, true),
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTarget::FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            color: RenderTarget::new(gpu, "Scene Color", width, height, HDR_FORMAT),
            motion: RenderTarget::new(gpu, "Scene Motion", width, height, HDR_FORMAT),
            depth: DepthTarget::new(gpu, width, height),
            resources,
            opaque_pipeline,
            glass_pipeline,
            additive_pipeline,
            sky_pipeline,
            camera_buffer,
            camera_bind_group,
            model_layout,
            model_buffer,
            model_bind_group,
            model_slots: INITIAL_MODEL_SLOTS,
            texture_bind_groups,
            default_bind_group,
            prev_view_proj: None,
        }
    }

    fn create_model_buffer(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        slots: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Model Uniforms"),
            size: MODEL_STRIDE * slots as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Model Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn ensure_model_slots(&mut self, gpu: &GpuContext, needed: usize) {
        if needed > self.model_slots {
            let slots = needed.next_power_of_two();
            let (buffer, bind_group) = Self::create_model_buffer(gpu, &self.model_layout, slots);
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
            self.model_slots = slots;
        }
    }

    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        self.color.ensure_size(gpu, "Scene Color", width, height);
        self.motion.ensure_size(gpu, "Scene Motion", width, height);
        self.depth.ensure_size(gpu, width, height);
    }

    fn collect_draws(scene: &SceneBundle) -> Vec<Draw> {
        let camera_pos = scene.camera.position;
        let mut draws = Vec::new();
        scene.graph.for_each_renderable(|model, renderable| {
            let center = model.transform_point3(Vec3::ZERO);
            draws.push(Draw {
                model,
                primitive: renderable.primitive,
                material: renderable.material.clone(),
                depth: center.distance_squared(camera_pos),
            });
        });

        // Opaque first, then glass far to near, then additive far to near
        let rank = |shading: Shading| match shading {
            Shading::Lit | Shading::Unlit => 0,
            Shading::Glass => 1,
            Shading::Additive => 2,
        };
        draws.sort_by(|a, b| {
            rank(a.material.shading)
                .cmp(&rank(b.material.shading))
                .then(b.depth.total_cmp(&a.depth))
        });
        draws
    }

    fn model_uniforms(draw: &Draw, ctx: &RenderContext) -> ModelUniforms {
        let material = &draw.material;
        let mut color = material.color.to_vec4();
        if material.shading == Shading::Glass {
            let [r, g, b] = ctx.tunables.glass.color;
            color *= glam::Vec4::new(r, g, b, 1.0);
        }
        ModelUniforms {
            model: draw.model.to_cols_array_2d(),
            normal_matrix: draw.model.inverse().transpose().to_cols_array_2d(),
            color: color.to_array(),
            emissive: material.emissive.to_vec4().to_array(),
            uv_transform: [
                material.uv_scale.x,
                material.uv_scale.y,
                material.uv_offset.x,
                material.uv_offset.y,
            ],
            params: [material.roughness, shading_kind(material.shading), 0.0, 0.0],
        }
    }

    /// Draws `scene` from its own camera into [`color`](Self::color) and
    /// [`motion`](Self::motion).
    pub fn render(&mut self, ctx: &mut RenderContext, scene: &SceneBundle) {
        let gpu = ctx.gpu;
        let camera = &scene.camera;
        let view = camera.view_matrix();
        let view_proj = camera.view_projection();
        let prev_view_proj = self.prev_view_proj.unwrap_or(view_proj);
        self.prev_view_proj = Some(view_proj);

        let glass = &ctx.tunables.glass;
        let camera_uniforms = CameraUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            prev_view_proj: prev_view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            time: ctx.time,
            glass_tint: [glass.color[0], glass.color[1], glass.color[2], glass.opacity()],
            glass: [glass.ior, glass.clearcoat, glass.env_map_intensity, glass.dispersion],
        };
        gpu.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniforms));

        let draws = Self::collect_draws(scene);
        self.ensure_model_slots(gpu, draws.len());
        let mut staging = vec![0u8; MODEL_STRIDE as usize * draws.len()];
        for (slot, draw) in draws.iter().enumerate() {
            let uniforms = Self::model_uniforms(draw, ctx);
            let start = slot * MODEL_STRIDE as usize;
            staging[start..start + std::mem::size_of::<ModelUniforms>()]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
        }
        if !staging.is_empty() {
            gpu.queue.write_buffer(&self.model_buffer, 0, &staging);
        }

        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Capture Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.motion.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if self.resources.has_environment() {
            render_pass.set_pipeline(&self.sky_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.default_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        let mut current: Option<Shading> = None;
        for (slot, draw) in draws.iter().enumerate() {
            let group = match draw.material.shading {
                Shading::Lit | Shading::Unlit => Shading::Lit,
                other => other,
            };
            if current != Some(group) {
                let pipeline = match group {
                    Shading::Glass => &self.glass_pipeline,
                    Shading::Additive => &self.additive_pipeline,
                    _ => &self.opaque_pipeline,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
                current = Some(group);
            }

            let offset = (slot as u64 * MODEL_STRIDE) as u32;
            render_pass.set_bind_group(1, &self.model_bind_group, &[offset]);

            let texture_group = draw
                .material
                .texture
                .as_deref()
                .and_then(|name| self.texture_bind_groups.get(name))
                .unwrap_or(&self.default_bind_group);
            render_pass.set_bind_group(2, texture_group, &[]);

            let mesh = self.resources.mesh(draw.primitive);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

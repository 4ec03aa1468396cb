//! Render targets and execution context for scene pipelines.

use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::pipeline::Tunables;

/// Format of every intermediate image inside a pipeline.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// An off-screen image a pass writes and later passes sample.
///
/// Targets are sized explicitly rather than from the surface, so a pipeline
/// can follow the viewport while a transition capture keeps the size it was
/// allocated with.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(
        gpu: &GpuContext,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            format,
            width,
            height,
        }
    }

    /// Recreates the target if its size differs from `width` x `height`.
    pub fn ensure_size(&mut self, gpu: &GpuContext, label: &str, width: u32, height: u32) {
        if self.width != width.max(1) || self.height != height.max(1) {
            *self = Self::new(gpu, label, width, height, self.format);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Depth attachment for the scene capture.
pub struct DepthTarget {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    size: (u32, u32),
}

impl DepthTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let size = (width.max(1), height.max(1));
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Texture"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }

    pub fn ensure_size(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if self.size != (width.max(1), height.max(1)) {
            *self = Self::new(gpu, width, height);
        }
    }
}

/// Execution context passed to each render node.
///
/// The `'a` lifetime ties all references to one frame.
pub struct RenderContext<'a> {
    pub gpu: &'a GpuContext,
    /// Nodes append their commands to this encoder.
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Elapsed time in seconds since startup.
    pub time: f32,
    pub camera: &'a Camera,
    pub tunables: &'a Tunables,
    /// Size of the images this pipeline renders at.
    pub width: u32,
    pub height: u32,
}

impl RenderContext<'_> {
    pub fn resolution(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

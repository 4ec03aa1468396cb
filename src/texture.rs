use image::{Rgba32FImage, RgbaImage};

use crate::assets::Asset;
use crate::gpu::GpuContext;

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a color texture from raw sRGB RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        Self::upload(
            gpu,
            data,
            width,
            height,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::FilterMode::Linear,
            label,
        )
    }

    /// Create a grayscale lookup texture where values are read back linearly.
    pub fn from_pattern(gpu: &GpuContext, image: &RgbaImage, label: &str) -> Self {
        let (width, height) = image.dimensions();
        Self::upload(
            gpu,
            image.as_raw(),
            width,
            height,
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::FilterMode::Linear,
            label,
        )
    }

    /// Upload an HDR environment map.
    ///
    /// 32-bit float textures are not filterable on every adapter, so shaders
    /// read this one with `textureLoad`.
    pub fn from_hdr(gpu: &GpuContext, image: &Rgba32FImage, label: &str) -> Self {
        let (width, height) = image.dimensions();
        Self::upload(
            gpu,
            bytemuck::cast_slice(image.as_raw()),
            width,
            height,
            wgpu::TextureFormat::Rgba32Float,
            wgpu::FilterMode::Nearest,
            label,
        )
    }

    /// Upload a decoded asset in the format its kind calls for.
    pub fn from_asset(gpu: &GpuContext, asset: &Asset, label: &str) -> Self {
        match asset {
            Asset::Image(image) => {
                let (width, height) = image.dimensions();
                Self::from_rgba(gpu, image.as_raw(), width, height, label)
            }
            Asset::Hdr(image) => Self::from_hdr(gpu, image, label),
        }
    }

    /// 1x1 white texture for untextured surfaces.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::from_rgba(gpu, &[255, 255, 255, 255], 1, 1, "Default White Texture")
    }

    fn upload(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        filter: wgpu::FilterMode,
        label: &str,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
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
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }
}

//! Mesh primitives and spatial transforms.
//!
//! Scene content is assembled from a small set of unit-sized [`Primitive`]s
//! placed with [`Transform`]s. Geometry is generated on the CPU as
//! [`MeshData`] and uploaded once per primitive as a GPU [`Mesh`].
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Quat, Vec3};

use crate::gpu::GpuContext;

/// A vertex with position, normal and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Unit-sized shapes every scene is built from.
///
/// Each primitive fits a 1×1×1 box centred on the origin unless noted, so a
/// transform's scale gives its size in world units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Box spanning -0.5..0.5 on every axis.
    Cube,
    /// Square in the XY plane facing +Z.
    Quad,
    /// Circle of diameter 1 in the XZ plane facing +Y.
    Disc,
    /// Tube of diameter 1 and height 1 with no caps.
    OpenCylinder,
    /// Flat annulus in the XZ plane, outer diameter 1, inner diameter 0.9.
    Ring,
    /// Upper hemisphere of diameter 1 with normals facing inward.
    Dome,
    /// Sphere of diameter 1.
    Sphere,
}

impl Primitive {
    pub const ALL: [Primitive; 7] = [
        Primitive::Cube,
        Primitive::Quad,
        Primitive::Disc,
        Primitive::OpenCylinder,
        Primitive::Ring,
        Primitive::Dome,
        Primitive::Sphere,
    ];

    /// Dense index into [`Primitive::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// CPU-side geometry ready for upload.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn primitive(primitive: Primitive) -> Self {
        match primitive {
            Primitive::Cube => Self::cube(),
            Primitive::Quad => Self::quad(),
            Primitive::Disc => Self::disc(48),
            Primitive::OpenCylinder => Self::open_cylinder(64),
            Primitive::Ring => Self::ring(0.45, 0.5, 64),
            Primitive::Dome => Self::dome(48, 16),
            Primitive::Sphere => Self::sphere(32, 16),
        }
    }

    /// Axis-aligned bounds of the vertex positions.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), v| {
                let p = Vec3::from_array(v.position);
                (min.min(p), max.max(p))
            },
        )
    }

    pub fn cube() -> Self {
        // Each face has its own vertices for correct normals
        #[rustfmt::skip]
        let vertices = vec![
            // Front face (Z+)
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 1.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 0.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 0.0]),
            // Back face (Z-)
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 1.0]),
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 1.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 0.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 0.0]),
            // Top face (Y+)
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [0.0, 0.0]),
            // Bottom face (Y-)
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [0.0, 0.0]),
            // Right face (X+)
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 0.0]),
            // Left face (X-)
            Vertex3d::new([-0.5, -0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 0.0]),
        ];

        let indices = (0..6u32)
            .flat_map(|face| {
                let base = face * 4;
                [base, base + 1, base + 2, base + 2, base + 3, base]
            })
            .collect();

        Self { vertices, indices }
    }

    pub fn quad() -> Self {
        let vertices = vec![
            Vertex3d::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            Vertex3d::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex3d::new([0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex3d::new([-0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ];
        Self {
            vertices,
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    pub fn disc(segments: u32) -> Self {
        let mut vertices = vec![Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.5, 0.5])];
        for seg in 0..=segments {
            let theta = TAU * seg as f32 / segments as f32;
            let (s, c) = theta.sin_cos();
            vertices.push(Vertex3d::new(
                [c * 0.5, 0.0, s * 0.5],
                [0.0, 1.0, 0.0],
                [0.5 + c * 0.5, 0.5 + s * 0.5],
            ));
        }
        let mut indices = Vec::with_capacity(segments as usize * 3);
        for seg in 1..=segments {
            indices.extend_from_slice(&[0, seg + 1, seg]);
        }
        Self { vertices, indices }
    }

    pub fn open_cylinder(segments: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let (s, c) = (TAU * u).sin_cos();
            // v runs 0 at the bottom rim to 1 at the top rim
            vertices.push(Vertex3d::new([c * 0.5, -0.5, s * 0.5], [c, 0.0, s], [u, 0.0]));
            vertices.push(Vertex3d::new([c * 0.5, 0.5, s * 0.5], [c, 0.0, s], [u, 1.0]));
        }
        for seg in 0..segments {
            let b = seg * 2;
            indices.extend_from_slice(&[b, b + 1, b + 2, b + 2, b + 1, b + 3]);
        }
        Self { vertices, indices }
    }

    pub fn ring(inner: f32, outer: f32, segments: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let (s, c) = (TAU * u).sin_cos();
            vertices.push(Vertex3d::new([c * inner, 0.0, s * inner], [0.0, 1.0, 0.0], [u, 0.0]));
            vertices.push(Vertex3d::new([c * outer, 0.0, s * outer], [0.0, 1.0, 0.0], [u, 1.0]));
        }
        for seg in 0..segments {
            let b = seg * 2;
            indices.extend_from_slice(&[b, b + 2, b + 1, b + 1, b + 2, b + 3]);
        }
        Self { vertices, indices }
    }

    pub fn sphere(segments: u32, rings: u32) -> Self {
        Self::lat_long(segments, rings, PI, false)
    }

    pub fn dome(segments: u32, rings: u32) -> Self {
        Self::lat_long(segments, rings, PI * 0.5, true)
    }

    fn lat_long(segments: u32, rings: u32, sweep: f32, inward: bool) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        let facing = if inward { -1.0 } else { 1.0 };

        for ring in 0..=rings {
            let phi = sweep * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = TAU * seg as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();
                vertices.push(Vertex3d::new(
                    [x * 0.5, y * 0.5, z * 0.5],
                    [x * facing, y * facing, z * facing],
                    [seg as f32 / segments as f32, ring as f32 / rings as f32],
                ));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;
                if inward {
                    indices.extend_from_slice(&[current, current + 1, next]);
                    indices.extend_from_slice(&[current + 1, next + 1, next]);
                } else {
                    indices.extend_from_slice(&[current, next, current + 1]);
                    indices.extend_from_slice(&[current + 1, next, next + 1]);
                }
            }
        }

        Self { vertices, indices }
    }
}

/// GPU-resident geometry.
#[derive(Debug)]
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl Mesh {
    pub fn upload(gpu: &GpuContext, data: &MeshData, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertex Buffer")),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Index Buffer")),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }
}

/// Position, rotation and scale of a scene node relative to its parent.
///
/// Converted to a matrix in scale, rotate, translate order.
///
/// ```
/// use vitrine::{Transform, Vec3, Quat};
///
/// let transform = Transform::new()
///     .position(Vec3::new(0.0, 2.0, -5.0))
///     .rotation(Quat::from_rotation_y(0.5))
///     .uniform_scale(2.0);
/// assert_eq!(transform.scale, Vec3::splat(2.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_fits_the_unit_box() {
        for primitive in Primitive::ALL {
            let data = MeshData::primitive(primitive);
            assert!(!data.indices.is_empty(), "{primitive:?} has no triangles");
            assert_eq!(data.indices.len() % 3, 0);
            let (min, max) = data.bounds();
            assert!(min.cmpge(Vec3::splat(-0.5 - 1e-5)).all(), "{primitive:?} min {min}");
            assert!(max.cmple(Vec3::splat(0.5 + 1e-5)).all(), "{primitive:?} max {max}");
            let count = data.vertices.len() as u32;
            assert!(data.indices.iter().all(|&i| i < count));
        }
    }

    #[test]
    fn primitive_index_matches_table() {
        for (i, primitive) in Primitive::ALL.iter().enumerate() {
            assert_eq!(primitive.index(), i);
        }
    }

    #[test]
    fn dome_normals_face_inward() {
        let dome = MeshData::dome(8, 4);
        for v in &dome.vertices {
            let p = Vec3::from_array(v.position);
            if p.length() > 0.1 {
                assert!(p.dot(Vec3::from_array(v.normal)) < 0.0);
            }
        }
    }

    #[test]
    fn transform_matrix_applies_scale_before_translation() {
        let t = Transform::new()
            .position(Vec3::new(1.0, 0.0, 0.0))
            .uniform_scale(2.0);
        let p = t.matrix().transform_point3(Vec3::new(0.5, 0.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
    }
}

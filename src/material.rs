//! Surface descriptions attached to renderable scene nodes.
//!
//! Materials are plain data. The scene capture pass turns them into uniforms;
//! nothing here touches the GPU.

use glam::{Vec2, Vec3, Vec4};

use crate::mesh::Primitive;

/// Linear RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Builds a color from a `0xRRGGBB` sRGB literal.
    pub fn hex(rgb: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((rgb >> shift) & 0xff) as f32 / 255.0);
        Self::rgb(channel(16), channel(8), channel(0))
    }

    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    /// Multiplies the color channels, keeping alpha.
    pub fn scaled(self, factor: f32) -> Self {
        Self::rgba(self.r * factor, self.g * factor, self.b * factor, self.a)
    }

    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r, self.g, self.b, self.a)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// How a surface is shaded and blended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Opaque, lit by the key light and ambient term.
    Lit,
    /// Opaque, color taken as-is.
    Unlit,
    /// Alpha blended, tinted and faded by the shared glass parameters.
    Glass,
    /// Added on top of the scene without writing depth.
    Additive,
}

impl Shading {
    /// Opaque surfaces are drawn first with depth writes.
    pub fn is_opaque(self) -> bool {
        matches!(self, Shading::Lit | Shading::Unlit)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub emissive: Color,
    /// Name of a loaded texture multiplied into the base color.
    pub texture: Option<String>,
    pub uv_scale: Vec2,
    pub uv_offset: Vec2,
    pub roughness: f32,
    pub shading: Shading,
}

impl Material {
    pub fn lit(color: Color) -> Self {
        Self {
            color,
            emissive: Color::BLACK,
            texture: None,
            uv_scale: Vec2::ONE,
            uv_offset: Vec2::ZERO,
            roughness: 0.7,
            shading: Shading::Lit,
        }
    }

    pub fn unlit(color: Color) -> Self {
        Self {
            shading: Shading::Unlit,
            ..Self::lit(color)
        }
    }

    pub fn glass() -> Self {
        Self {
            roughness: 0.0,
            shading: Shading::Glass,
            ..Self::lit(Color::WHITE)
        }
    }

    pub fn additive(color: Color) -> Self {
        Self {
            shading: Shading::Additive,
            ..Self::lit(color)
        }
    }

    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.texture = Some(name.into());
        self
    }

    pub fn with_emissive(mut self, emissive: Color) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn with_uv_scale(mut self, scale: f32) -> Self {
        self.uv_scale = Vec2::splat(scale);
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }
}

/// A scene node that draws a primitive with a material.
#[derive(Clone, Debug)]
pub struct Renderable {
    pub primitive: Primitive,
    pub material: Material,
}

impl Renderable {
    pub fn new(primitive: Primitive, material: Material) -> Self {
        Self {
            primitive,
            material,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_converts_srgb_to_linear() {
        let white = Color::hex(0xffffff);
        assert!((white.r - 1.0).abs() < 1e-6);
        let mid = Color::hex(0x808080);
        assert!(mid.r > 0.2 && mid.r < 0.23);
    }

    #[test]
    fn only_lit_and_unlit_are_opaque() {
        assert!(Shading::Lit.is_opaque());
        assert!(Shading::Unlit.is_opaque());
        assert!(!Shading::Glass.is_opaque());
        assert!(!Shading::Additive.is_opaque());
    }
}

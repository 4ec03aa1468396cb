//! # Vitrine
//!
//! **An interactive 3D stand showroom.**
//!
//! A main hall holds a few stands. Hovering a stand lights it up; clicking it
//! wipes over to that stand's own detail scene through a pattern-driven
//! dissolve. Every scene renders through its own post-processing chain
//! (box blur, depth of field and bloom on desktop, FXAA everywhere).
//!
//! ```no_run
//! fn main() -> vitrine::Result<()> {
//!     vitrine::run(vitrine::ShowroomConfig::default())
//! }
//! ```
//!
//! The frame logic lives in [`Showroom`], which is generic over the
//! [`PipelineFactory`] that builds GPU objects. [`Renderer`] is the wgpu
//! implementation.

mod app;
pub mod assets;
pub mod audio;
pub mod camera;
pub mod config;
pub mod driver;
pub mod environment;
mod error;
mod gpu;
pub mod input;
pub mod interaction;
pub mod material;
pub mod mesh;
pub mod messages;
pub mod orbit_camera;
pub mod parallax;
pub mod picking;
pub mod pipeline;
mod post_process;
pub mod render_graph;
mod renderer;
pub mod scene;
pub mod stand;
mod texture;

#[cfg(test)]
mod test_support;

pub use app::run;
pub use assets::{Asset, AssetLoader, AssetManifest, AssetSet, LoadEvent};
pub use audio::{AudioSink, LoggingAudio};
pub use camera::{Camera, CameraPose};
pub use config::{
    CameraConfig, CameraMode, GlassParams, InteractionConfig, PostProcessParams, ShowroomConfig,
    StandConfig, TransitionConfig, WindowConfig,
};
pub use driver::{Phase, Showroom};
pub use environment::{Environment, EnvironmentCatalog};
pub use error::{Result, VitrineError};
pub use gpu::GpuContext;
pub use input::{Input, PointerState};
pub use interaction::{FocusState, Resolution, Resolver};
pub use material::{Color, Material, Renderable, Shading};
pub use mesh::{Mesh, Primitive, Transform};
pub use messages::{MessageBoard, MessageOptions, MessageSink};
pub use picking::{Collider, Ray, RayHit};
pub use pipeline::{BloomHandle, BloomSettings, PipelinePlan, QualityTier, StageKind, Tunables};
pub use renderer::Renderer;
pub use scene::{
    LiveOutput, PipelineFactory, SceneBundle, SceneId, SceneRegistry, SwitchOutcome,
    TransitionController, TransitionState,
};
pub use stand::Stand;
pub use texture::Texture;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

pub use hecs::Entity;

//! GPU rendering of a single scene.
//!
//! A [`ScenePipeline`] is built from a [`PipelinePlan`](crate::pipeline::PipelinePlan):
//! a [`SceneCapture`] pass draws the scene's meshes into color and motion
//! images, then each planned stage runs as a [`RenderNode`].
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌─────┐   ┌───────┐   ┌──────┐
//! │ SceneCapture │──▶│ Box blur │──▶│ DOF │──▶│ Bloom │──▶│ FXAA │──▶ output
//! └──────────────┘   └──────────┘   └─────┘   └───────┘   └──────┘
//!        │  color, motion                ▲
//!        └───────────────────────────────┘
//! ```
//!
//! Mobile pipelines skip straight from the capture to FXAA.

mod graph;
mod post_process_nodes;
mod render_node;
mod render_target;
mod scene_capture;

pub use graph::ScenePipeline;
pub use post_process_nodes::{BloomNode, BoxBlurNode, DepthOfFieldNode, FxaaNode};
pub use render_node::RenderNode;
pub use render_target::{DepthTarget, HDR_FORMAT, RenderContext, RenderTarget};
pub use scene_capture::{CameraUniforms, ModelUniforms, SceneCapture, SceneResources};

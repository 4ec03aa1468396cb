//! The trait every post-processing stage implements.

use crate::gpu::GpuContext;
use crate::render_graph::RenderContext;

/// A stage of a scene pipeline.
///
/// Nodes read the images named by their stage's inputs and write one image.
/// Nodes with intermediate targets of their own resize them in
/// [`resize`](RenderNode::resize).
///
/// ```ignore
/// struct Invert {
///     pass: FullscreenPass,
/// }
///
/// impl RenderNode for Invert {
///     fn label(&self) -> &str {
///         "Invert"
///     }
///
///     fn execute(&self, ctx: &mut RenderContext, target: &wgpu::TextureView, inputs: &[&wgpu::TextureView]) {
///         self.pass.draw(ctx.gpu, ctx.encoder, target, inputs);
///     }
/// }
/// ```
pub trait RenderNode {
    fn label(&self) -> &str;

    /// Records the node's passes into `ctx.encoder`.
    ///
    /// `inputs` holds the views of the stage's input slots in declaration
    /// order.
    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        inputs: &[&wgpu::TextureView],
    );

    /// Called when the pipeline's render size changes.
    fn resize(&mut self, _gpu: &GpuContext, _width: u32, _height: u32) {}
}

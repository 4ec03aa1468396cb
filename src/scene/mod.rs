//! Scenes and switching between them.
//!
//! A showroom holds one main scene and one detail scene per stand. Each scene
//! is a [`SceneBundle`]: its node graph, camera, camera rig, stands and an
//! optional environment. The [`SceneRegistry`] owns every bundle for the
//! lifetime of the program; the [`TransitionController`] decides which one is
//! shown and runs the wipe between them.
//!
//! # Example
//!
//! ```ignore
//! use vitrine::*;
//!
//! let config = ShowroomConfig::default();
//! let mut registry = SceneRegistry::build(&config, &EnvironmentCatalog::standard())?;
//! let mut controller = TransitionController::new(&config.transition, &registry, &mut factory)?;
//!
//! controller.request_switch(SceneId(2), &mut registry, &mut factory, &mut audio);
//! while controller.is_transitioning() {
//!     controller.advance(dt, &registry, &mut factory);
//! }
//! ```

mod bundle;
mod controller;
mod graph;
mod registry;
mod transition;
mod transition_pass;

use std::fmt;

pub use bundle::{CameraRig, SceneBundle};
pub use controller::{
    Completed, LiveOutput, PipelineFactory, RejectReason, SwitchOutcome, TransitionController,
    TransitionState,
};
pub use graph::{Ancestors, Node, Parent, SceneGraph};
pub use registry::{SceneRegistry, StandRef, StandTable};
pub use transition::{ActiveTransition, Easing, Tween};
pub use transition_pass::{TransitionUniforms, WipeCompositor};

/// Index of a scene in the registry. Index 0 is the main scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SceneId(pub u32);

impl SceneId {
    pub const MAIN: SceneId = SceneId(0);

    pub fn is_main(self) -> bool {
        self == Self::MAIN
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene {}", self.0)
    }
}

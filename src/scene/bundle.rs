//! Per-scene state: graph, camera, camera rig, stands and environment.

use glam::{Vec2, Vec3};

use super::{SceneGraph, SceneId};
use crate::audio::AudioSink;
use crate::camera::{Camera, CameraPose};
use crate::config::{CameraConfig, CameraMode};
use crate::environment::Environment;
use crate::input::Input;
use crate::orbit_camera::OrbitControls;
use crate::parallax::{self, ParallaxRig};
use crate::stand::Stand;

const ORBIT_MIN_DISTANCE: f32 = 2.0;
const ORBIT_MAX_DISTANCE: f32 = 30.0;

/// Drives a scene camera from input.
///
/// Orbit controls take precedence while present and enabled. Otherwise the
/// parallax rig leans the camera toward the pointer. Exactly one of them moves
/// the camera in a given frame.
pub struct CameraRig {
    controls: Option<OrbitControls>,
    parallax: ParallaxRig,
}

impl CameraRig {
    pub fn from_config(camera: &Camera, config: &CameraConfig) -> Self {
        let target = Vec3::from_array(config.target);
        match config.mode {
            CameraMode::Orbit => Self {
                controls: Some(
                    OrbitControls::from_camera(camera, target)
                        .distance_limits(ORBIT_MIN_DISTANCE, ORBIT_MAX_DISTANCE),
                ),
                parallax: ParallaxRig::new(
                    camera.pose(),
                    target,
                    parallax::DEFAULT_MAX_ANGLE_DEG,
                    parallax::DEFAULT_SMOOTHING,
                ),
            },
            CameraMode::Parallax {
                max_angle_deg,
                smoothing,
            } => Self {
                controls: None,
                parallax: ParallaxRig::new(camera.pose(), target, max_angle_deg, smoothing),
            },
        }
    }

    pub fn is_orbiting(&self) -> bool {
        self.controls.as_ref().is_some_and(|c| c.enabled)
    }

    pub fn controls_mut(&mut self) -> Option<&mut OrbitControls> {
        self.controls.as_mut()
    }

    pub fn parallax(&self) -> &ParallaxRig {
        &self.parallax
    }

    /// Point the camera is aimed at; the focus fallback when nothing is hovered.
    pub fn look_target(&self) -> Vec3 {
        match &self.controls {
            Some(controls) if controls.enabled => controls.target,
            _ => self.parallax.pivot,
        }
    }

    pub fn update(&mut self, camera: &mut Camera, input: &Input, pointer_ndc: Vec2, dt: f32) {
        match self.controls.as_mut() {
            Some(controls) if controls.enabled => controls.update(input, camera),
            _ => self.parallax.update(camera, pointer_ndc, dt),
        }
    }
}

/// Everything that makes up one scene.
pub struct SceneBundle {
    id: SceneId,
    label: String,
    pub graph: SceneGraph,
    pub camera: Camera,
    initial_pose: CameraPose,
    pub rig: CameraRig,
    pub stands: Vec<Stand>,
    pub environment: Option<Box<dyn Environment>>,
}

impl SceneBundle {
    pub fn new(id: SceneId, label: &str, config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Camera::new()
            .at(Vec3::from_array(config.position))
            .looking_at(Vec3::from_array(config.target))
            .with_fov(config.fov_degrees)
            .with_clip(config.near, config.far);
        camera.aspect = aspect;

        Self {
            id,
            label: label.to_string(),
            graph: SceneGraph::new(label),
            initial_pose: camera.pose(),
            rig: CameraRig::from_config(&camera, config),
            camera,
            stands: Vec::new(),
            environment: None,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Camera pose the scene was created with.
    pub fn initial_pose(&self) -> CameraPose {
        self.initial_pose
    }

    /// Spawns a stand under the scene root and returns its index.
    pub fn add_stand(&mut self, position: Vec3, artwork: &str, destination: SceneId) -> usize {
        let root = self.graph.root();
        let stand = Stand::spawn(&mut self.graph, root, position, artwork, destination);
        self.stands.push(stand);
        self.stands.len() - 1
    }

    pub fn set_environment(&mut self, environment: Box<dyn Environment>) {
        self.environment = Some(environment);
    }

    pub fn update_camera(&mut self, input: &Input, pointer_ndc: Vec2, dt: f32) {
        self.rig.update(&mut self.camera, input, pointer_ndc, dt);
    }

    /// Advances stand animation and the environment by `dt` seconds.
    pub fn update_entities(&mut self, dt: f32) {
        for stand in &mut self.stands {
            stand.update(dt, &self.camera, &mut self.graph);
        }
        if let Some(environment) = self.environment.as_mut() {
            environment.update(dt, &mut self.graph);
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.camera.aspect = aspect;
    }

    /// Clears every stand selection and stops any hum still playing.
    pub fn release_stands(&mut self, audio: &mut dyn AudioSink) {
        for stand in &mut self.stands {
            stand.set_selected(false);
            if stand.is_sound_playing() {
                if let Some(sound) = stand.sound() {
                    audio.stop(sound);
                }
                stand.set_sound_playing(false);
            }
        }
    }
}

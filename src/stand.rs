//! Interactive stands.
//!
//! A stand is a pedestal with a glass top, an artwork billboard, a wave ring
//! and an energy aura. Selecting it (hovering in the active scene) shows the
//! ring and raises the aura; clicking it leads to its destination scene.

use glam::{Vec3, Vec4Swizzles};
use hecs::Entity;

use crate::camera::{Camera, look_rotation};
use crate::material::{Color, Material, Renderable};
use crate::mesh::{Primitive, Transform};
use crate::picking::Collider;
use crate::scene::{SceneGraph, SceneId};

const HEIGHT: f32 = 2.0;
const RADIUS: f32 = 1.3;
const BASE_HEIGHT: f32 = HEIGHT / 4.0;
const TOP_HEIGHT: f32 = HEIGHT * 3.0 / 4.0;
const AURA_HEIGHT: f32 = HEIGHT * 0.3;
/// Approach rate per second for billboard and aura animation.
const ANIMATION_RATE: f32 = 5.0;
/// Aura height below which the aura is hidden.
const AURA_HIDE_THRESHOLD: f32 = 0.01;

pub const HUM_SOUND: &str = "energy-hum";

/// Name of the hum owned by the stand leading to `destination`.
pub fn hum_sound(destination: SceneId) -> String {
    format!("{HUM_SOUND}-{}", destination.0)
}

pub struct Stand {
    destination: SceneId,
    root: Entity,
    plane: Entity,
    ring: Entity,
    aura: Entity,
    selected: bool,
    aura_scale: Vec3,
    sound: Option<String>,
    sound_playing: bool,
}

impl Stand {
    /// Builds the stand hierarchy under `parent`.
    pub fn spawn(
        graph: &mut SceneGraph,
        parent: Entity,
        position: Vec3,
        artwork: &str,
        destination: SceneId,
    ) -> Self {
        let root = graph.spawn(
            parent,
            &format!("stand-{}", destination.0),
            Transform::from_position(position),
        );

        graph.spawn_with(
            root,
            "stand-base",
            Transform::from_position(Vec3::new(0.0, BASE_HEIGHT / 2.1, 0.0))
                .scale(Vec3::new(RADIUS, BASE_HEIGHT, RADIUS)),
            (
                Renderable::new(Primitive::Cube, Material::lit(Color::BLACK).with_roughness(0.7)),
                Collider::unit_box(),
            ),
        );

        graph.spawn_with(
            root,
            "stand-glass",
            Transform::from_position(Vec3::new(0.0, BASE_HEIGHT + TOP_HEIGHT / 2.0, 0.0))
                .scale(Vec3::new(RADIUS, TOP_HEIGHT, RADIUS)),
            (
                Renderable::new(Primitive::Cube, Material::glass()),
                Collider::unit_box(),
            ),
        );

        let plane_size = RADIUS * 0.8;
        let plane = graph.spawn_with(
            root,
            "stand-artwork",
            Transform::from_position(Vec3::new(0.0, BASE_HEIGHT + TOP_HEIGHT / 2.0, 0.0))
                .scale(Vec3::new(plane_size, plane_size, 1.0)),
            (Renderable::new(
                Primitive::Quad,
                Material::unlit(Color::WHITE).with_texture(artwork),
            ),),
        );

        let ring = graph.spawn_with(
            root,
            "stand-wave-ring",
            Transform::from_position(Vec3::new(0.0, 0.01, 0.0)).uniform_scale(RADIUS * 2.0),
            (Renderable::new(Primitive::Ring, Material::additive(Color::WHITE)),),
        );
        graph.set_visible(ring, false);

        let aura = graph.spawn_with(
            root,
            "stand-aura",
            Transform::from_position(Vec3::new(0.0, AURA_HEIGHT / 2.0, 0.0)).scale(Vec3::ZERO),
            (Renderable::new(
                Primitive::OpenCylinder,
                Material::additive(Color::WHITE.with_alpha(0.5)),
            ),),
        );

        Self {
            destination,
            root,
            plane,
            ring,
            aura,
            selected: false,
            aura_scale: Vec3::ZERO,
            sound: Some(hum_sound(destination)),
            sound_playing: false,
        }
    }

    /// Scene this stand leads to when clicked.
    pub fn destination(&self) -> SceneId {
        self.destination
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn sound(&self) -> Option<&str> {
        self.sound.as_deref()
    }

    pub fn is_sound_playing(&self) -> bool {
        self.sound_playing
    }

    pub fn set_sound_playing(&mut self, playing: bool) {
        self.sound_playing = playing;
    }

    pub fn aura_scale(&self) -> Vec3 {
        self.aura_scale
    }

    /// Advances billboard facing and selection effects by `dt` seconds.
    pub fn update(&mut self, dt: f32, camera: &Camera, graph: &mut SceneGraph) {
        let t = (dt * ANIMATION_RATE).clamp(0.0, 1.0);

        let plane_world = graph.world_matrix(self.plane).w_axis.xyz();
        let facing = look_rotation(plane_world - camera.position);
        if let Some(transform) = graph.transform_mut(self.plane) {
            transform.rotation = transform.rotation.slerp(facing, t).normalize();
        }

        graph.set_visible(self.ring, self.selected);

        let target = if self.selected {
            Vec3::ONE
        } else {
            Vec3::new(1.0, 0.0, 1.0)
        };
        self.aura_scale = self.aura_scale.lerp(target, t);
        if let Some(transform) = graph.transform_mut(self.aura) {
            transform.scale = Vec3::new(RADIUS * 2.0, AURA_HEIGHT, RADIUS * 2.0) * self.aura_scale;
        }
        graph.set_visible(self.aura, self.aura_scale.y >= AURA_HIDE_THRESHOLD);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (SceneGraph, Stand, Camera) {
        let mut graph = SceneGraph::new("test");
        let root = graph.root();
        let stand = Stand::spawn(&mut graph, root, Vec3::ZERO, "art.png", SceneId(2));
        let camera = Camera::new()
            .at(Vec3::new(0.0, 2.0, 4.0))
            .looking_at(Vec3::new(0.0, 1.0, 0.0));
        (graph, stand, camera)
    }

    #[test]
    fn ring_follows_selection() {
        let (mut graph, mut stand, camera) = setup();
        stand.update(DT, &camera, &mut graph);
        assert!(!graph.is_visible(stand.ring));
        stand.set_selected(true);
        stand.update(DT, &camera, &mut graph);
        assert!(graph.is_visible(stand.ring));
    }

    #[test]
    fn aura_rises_when_selected_and_hides_when_not() {
        let (mut graph, mut stand, camera) = setup();
        stand.set_selected(true);
        for _ in 0..120 {
            stand.update(DT, &camera, &mut graph);
        }
        assert!(stand.aura_scale().abs_diff_eq(Vec3::ONE, 1e-3));
        assert!(graph.is_visible(stand.aura));

        stand.set_selected(false);
        for _ in 0..120 {
            stand.update(DT, &camera, &mut graph);
        }
        assert!(stand.aura_scale().y < AURA_HIDE_THRESHOLD);
        assert!(!graph.is_visible(stand.aura));
    }

    #[test]
    fn billboard_turns_toward_camera() {
        let (mut graph, mut stand, _) = setup();
        let camera = Camera::new()
            .at(Vec3::new(6.0, 1.25, 0.0))
            .looking_at(Vec3::new(0.0, 1.25, 0.0));
        for _ in 0..240 {
            stand.update(DT, &camera, &mut graph);
        }
        let transform = graph.transform(stand.plane).expect("plane transform");
        let normal = transform.rotation * Vec3::Z;
        assert!(normal.abs_diff_eq(Vec3::X, 1e-2), "normal {normal}");
    }

    #[test]
    fn stand_hierarchy_is_pickable() {
        let (graph, stand, _) = setup();
        let ray = crate::picking::Ray::new(Vec3::new(0.0, 1.0, 10.0), Vec3::NEG_Z);
        let hits = crate::picking::raycast_all(&graph, &ray);
        let hit = hits.first().expect("stand hit");
        assert!(graph.ancestors(hit.entity).any(|e| e == stand.root()));
    }
}

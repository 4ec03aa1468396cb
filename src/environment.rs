//! Room environments surrounding each scene's stands.
//!
//! Every environment spawns its geometry under the scene root and exposes a
//! single [`Environment::update`] capability. The scene registry looks up
//! detail-scene environments by stand id through an [`EnvironmentCatalog`].

use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use hecs::Entity;

use crate::material::{Color, Material, Renderable};
use crate::mesh::{Primitive, Transform};
use crate::scene::SceneGraph;

pub trait Environment {
    /// Root node of the environment's geometry.
    fn root(&self) -> Entity;

    /// Advances environment animation by `dt` seconds.
    fn update(&mut self, _dt: f32, _graph: &mut SceneGraph) {}
}

/// Builds an environment under the given parent node.
pub type EnvironmentBuilder = fn(&mut SceneGraph, Entity) -> Box<dyn Environment>;

/// Environment constructors keyed by stand id.
pub struct EnvironmentCatalog {
    builders: BTreeMap<u32, EnvironmentBuilder>,
}

impl EnvironmentCatalog {
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Water room for stand 1, dome for stand 2, grid room for stand 3.
    pub fn standard() -> Self {
        Self::empty()
            .with(1, water_room)
            .with(2, dome_room)
            .with(3, grid_room)
    }

    pub fn with(mut self, id: u32, builder: EnvironmentBuilder) -> Self {
        self.builders.insert(id, builder);
        self
    }

    pub fn contains(&self, id: u32) -> bool {
        self.builders.contains_key(&id)
    }

    pub fn build(&self, id: u32, graph: &mut SceneGraph, parent: Entity) -> Option<Box<dyn Environment>> {
        self.builders.get(&id).map(|build| build(graph, parent))
    }
}

impl Default for EnvironmentCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn water_room(graph: &mut SceneGraph, parent: Entity) -> Box<dyn Environment> {
    Box::new(WaterRoom::spawn(graph, parent))
}

fn dome_room(graph: &mut SceneGraph, parent: Entity) -> Box<dyn Environment> {
    Box::new(DomeRoom::spawn(graph, parent))
}

fn grid_room(graph: &mut SceneGraph, parent: Entity) -> Box<dyn Environment> {
    Box::new(GridRoom::spawn(graph, parent))
}

/// Dark hall with a polished floor, used by the main scene.
pub struct MainRoom {
    root: Entity,
}

impl MainRoom {
    const SIZE: Vec3 = Vec3::new(30.0, 8.0, 20.0);

    pub fn spawn(graph: &mut SceneGraph, parent: Entity) -> Self {
        let root = graph.spawn(parent, "main-room", Transform::new());
        graph.spawn_with(
            root,
            "main-room-walls",
            Transform::from_position(Vec3::new(0.0, Self::SIZE.y / 2.0 - 0.01, 0.0))
                .scale(Self::SIZE),
            (Renderable::new(Primitive::Cube, Material::lit(Color::hex(0x050505))),),
        );
        graph.spawn_with(
            root,
            "main-room-floor",
            Transform::new().scale(Vec3::new(Self::SIZE.x, 0.02, Self::SIZE.z)),
            (Renderable::new(
                Primitive::Cube,
                Material::lit(Color::hex(0x202024)).with_roughness(0.1),
            ),),
        );
        Self { root }
    }
}

impl Environment for MainRoom {
    fn root(&self) -> Entity {
        self.root
    }
}

struct Bubble {
    entity: Entity,
    seed: f32,
}

/// Round water room with rising bubbles.
pub struct WaterRoom {
    root: Entity,
    surface: Entity,
    bubbles: Vec<Bubble>,
    spawn_points: Vec<Vec3>,
    elapsed: f32,
}

impl WaterRoom {
    const RADIUS: f32 = 40.0;
    const HEIGHT: f32 = 10.0;
    const SURFACE_Y: f32 = -0.45;
    const BUBBLE_COUNT: usize = 120;
    const SPAWN_POINT_COUNT: usize = 120;
    const BUBBLE_SIZE: f32 = 0.1;
    /// Height over which bubbles fade in at the floor and out at the ceiling.
    const FADE: f32 = 2.5;

    pub fn spawn(graph: &mut SceneGraph, parent: Entity) -> Self {
        let root = graph.spawn(parent, "water-room", Transform::new());
        let surface = graph.spawn_with(
            root,
            "water-surface",
            Transform::from_position(Vec3::new(0.0, Self::SURFACE_Y, 0.0))
                .uniform_scale(Self::RADIUS * 2.0),
            (Renderable::new(
                Primitive::Disc,
                Material::lit(Color::hex(0x975599))
                    .with_roughness(0.9)
                    .with_emissive(Color::hex(0x975599).scaled(0.05)),
            ),),
        );

        let spawn_points = (0..Self::SPAWN_POINT_COUNT)
            .map(|i| {
                let angle = hash01(i as f32 * 1.37) * std::f32::consts::TAU;
                let radius = hash01(i as f32 * 2.91 + 0.5) * Self::RADIUS;
                Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
            })
            .collect();

        let bubbles = (0..Self::BUBBLE_COUNT)
            .map(|i| {
                let entity = graph.spawn_with(
                    root,
                    "bubble",
                    Transform::new().uniform_scale(0.0),
                    (Renderable::new(
                        Primitive::Sphere,
                        Material::additive(Color::hex(0xe1c2ff)),
                    ),),
                );
                Bubble {
                    entity,
                    seed: hash01(i as f32 * 7.13 + 0.25) * 2.0,
                }
            })
            .collect();

        let mut room = Self {
            root,
            surface,
            bubbles,
            spawn_points,
            elapsed: 0.0,
        };
        room.place_bubbles(graph);
        room
    }

    /// Position and visible size of a bubble at the current time.
    fn bubble_state(&self, seed: f32) -> (Vec3, f32) {
        let progress = (self.elapsed + seed * 100.0) * (seed + 0.2);
        let y = progress.rem_euclid(Self::HEIGHT);
        let cycle = (progress / Self::HEIGHT).floor();
        let cycle_seed = seed + cycle;

        let index = ((hash01(cycle_seed) * Self::SPAWN_POINT_COUNT as f32) as usize)
            .min(Self::SPAWN_POINT_COUNT - 1);
        let spawn = self.spawn_points[index];
        let frequency = hash01(cycle_seed + 0.1) * 0.5 + 0.1;
        let amplitude = hash01(cycle_seed + 0.2) * 2.0 + 1.0;

        let position = Vec3::new(
            spawn.x + (y * frequency).sin() * amplitude,
            y,
            spawn.z + (y * frequency).cos() * amplitude,
        );
        let fade_in = smoothstep(0.0, Self::FADE, y);
        let fade_out = smoothstep(Self::HEIGHT, Self::HEIGHT - Self::FADE, y);
        (position, Self::BUBBLE_SIZE * fade_in * fade_out)
    }

    fn place_bubbles(&mut self, graph: &mut SceneGraph) {
        for bubble in &self.bubbles {
            let (position, size) = self.bubble_state(bubble.seed);
            if let Some(transform) = graph.transform_mut(bubble.entity) {
                transform.position = position;
                transform.scale = Vec3::splat(size);
            }
        }
    }
}

impl Environment for WaterRoom {
    fn root(&self) -> Entity {
        self.root
    }

    fn update(&mut self, dt: f32, graph: &mut SceneGraph) {
        self.elapsed += dt;
        if let Some(transform) = graph.transform_mut(self.surface) {
            transform.position.y = Self::SURFACE_Y + (self.elapsed * 0.8).sin() * 0.02;
        }
        if let Some(renderable) = graph.renderable_mut(self.surface) {
            renderable.material.uv_offset = glam::Vec2::new(self.elapsed * 0.02, self.elapsed * 0.01);
        }
        self.place_bubbles(graph);
    }
}

/// Hemispherical dome over a round floor.
pub struct DomeRoom {
    root: Entity,
}

impl DomeRoom {
    const RADIUS: f32 = 18.0;

    pub fn spawn(graph: &mut SceneGraph, parent: Entity) -> Self {
        let root = graph.spawn(parent, "dome-room", Transform::new());
        graph.spawn_with(
            root,
            "dome-floor",
            Transform::new().uniform_scale(Self::RADIUS * 2.0),
            (Renderable::new(
                Primitive::Disc,
                Material::lit(Color::hex(0x1a1a2e)).with_roughness(0.2),
            ),),
        );
        graph.spawn_with(
            root,
            "dome-shell",
            Transform::new().uniform_scale(Self::RADIUS * 2.0),
            (Renderable::new(Primitive::Dome, Material::lit(Color::hex(0x16213e))),),
        );
        Self { root }
    }
}

impl Environment for DomeRoom {
    fn root(&self) -> Entity {
        self.root
    }
}

/// Box room with glowing grid lines on the floor.
pub struct GridRoom {
    root: Entity,
}

impl GridRoom {
    const SIZE: Vec3 = Vec3::new(30.0, 12.0, 30.0);
    const GRID_SPACING: f32 = 2.0;

    pub fn spawn(graph: &mut SceneGraph, parent: Entity) -> Self {
        let root = graph.spawn(parent, "grid-room", Transform::new());
        graph.spawn_with(
            root,
            "grid-room-walls",
            Transform::from_position(Vec3::new(0.0, Self::SIZE.y / 2.0 - 0.01, 0.0))
                .scale(Self::SIZE),
            (Renderable::new(Primitive::Cube, Material::lit(Color::hex(0x0b0b12))),),
        );

        let line = Material::unlit(Color::hex(0x3a2f6b)).with_emissive(Color::hex(0x6c4cff));
        let half = Self::SIZE.x / 2.0;
        let steps = (Self::SIZE.x / Self::GRID_SPACING) as i32;
        for i in 0..=steps {
            let offset = -half + i as f32 * Self::GRID_SPACING;
            for rotation in [Quat::IDENTITY, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)] {
                graph.spawn_with(
                    root,
                    "grid-line",
                    Transform::from_position(rotation * Vec3::new(offset, 0.005, 0.0))
                        .rotation(rotation)
                        .scale(Vec3::new(0.03, 0.01, Self::SIZE.z)),
                    (Renderable::new(Primitive::Cube, line.clone()),),
                );
            }
        }
        Self { root }
    }
}

impl Environment for GridRoom {
    fn root(&self) -> Entity {
        self.root
    }
}

/// Deterministic hash of a float into `[0, 1)`.
fn hash01(x: f32) -> f32 {
    let mut h = x.to_bits();
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    (h >> 8) as f32 / (1u32 << 24) as f32
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_covers_default_stands() {
        let catalog = EnvironmentCatalog::standard();
        for id in [1, 2, 3] {
            assert!(catalog.contains(id));
        }
        assert!(!catalog.contains(4));
    }

    #[test]
    fn missing_builder_yields_none() {
        let mut graph = SceneGraph::new("test");
        let root = graph.root();
        assert!(EnvironmentCatalog::empty().build(1, &mut graph, root).is_none());
    }

    #[test]
    fn hash_stays_in_unit_interval() {
        for i in 0..1000 {
            let h = hash01(i as f32 * 0.731);
            assert!((0.0..1.0).contains(&h));
        }
    }

    #[test]
    fn bubbles_stay_inside_the_room() {
        let mut graph = SceneGraph::new("water");
        let root = graph.root();
        let mut room = WaterRoom::spawn(&mut graph, root);
        for _ in 0..300 {
            room.update(1.0 / 30.0, &mut graph);
        }
        for bubble in &room.bubbles {
            let t = graph.transform(bubble.entity).expect("bubble transform");
            assert!((0.0..WaterRoom::HEIGHT).contains(&t.position.y));
            assert!(t.scale.x <= WaterRoom::BUBBLE_SIZE + 1e-6);
        }
    }

    #[test]
    fn bubbles_rise_between_frames() {
        let mut graph = SceneGraph::new("water");
        let root = graph.root();
        let mut room = WaterRoom::spawn(&mut graph, root);
        let seed = room.bubbles[0].seed;
        let (before, _) = room.bubble_state(seed);
        room.update(0.01, &mut graph);
        let (after, _) = room.bubble_state(seed);
        // Either it rose or it wrapped back to the floor
        assert!(after.y > before.y || after.y < 1.0);
    }
}

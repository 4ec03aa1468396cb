//! Hierarchical scene storage on top of `hecs`.
//!
//! Every node carries a [`Node`] and a local [`Transform`]; all but the root
//! carry a [`Parent`]. Renderables and colliders are ordinary components on the
//! same entities.

use glam::Mat4;
use hecs::{DynamicBundle, Entity, EntityBuilder, World};

use crate::material::Renderable;
use crate::mesh::Transform;

/// Name and visibility of a scene node.
#[derive(Clone, Debug)]
pub struct Node {
    pub label: String,
    /// Hidden nodes hide their whole subtree from rendering and picking.
    pub visible: bool,
}

/// Link from a node to the node it is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// One scene's node hierarchy.
pub struct SceneGraph {
    world: World,
    root: Entity,
}

impl SceneGraph {
    pub fn new(label: &str) -> Self {
        let mut world = World::new();
        let root = world.spawn((
            Node {
                label: label.to_string(),
                visible: true,
            },
            Transform::new(),
        ));
        Self { world, root }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Attaches a new node under `parent`.
    pub fn spawn(&mut self, parent: Entity, label: &str, transform: Transform) -> Entity {
        self.spawn_with(parent, label, transform, ())
    }

    /// Attaches a new node under `parent` with extra components.
    pub fn spawn_with(
        &mut self,
        parent: Entity,
        label: &str,
        transform: Transform,
        components: impl DynamicBundle,
    ) -> Entity {
        let mut builder = EntityBuilder::new();
        builder
            .add(Node {
                label: label.to_string(),
                visible: true,
            })
            .add(transform)
            .add(Parent(parent))
            .add_bundle(components);
        self.world.spawn(builder.build())
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<&Parent>(entity).ok().map(|p| p.0)
    }

    /// Walks from `entity` up to the root, starting with `entity` itself.
    pub fn ancestors(&self, entity: Entity) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.world.contains(entity).then_some(entity),
        }
    }

    pub fn label(&self, entity: Entity) -> Option<String> {
        self.world.get::<&Node>(entity).ok().map(|n| n.label.clone())
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    pub fn transform_mut(&mut self, entity: Entity) -> Option<&mut Transform> {
        self.world.query_one_mut::<&mut Transform>(entity).ok()
    }

    pub fn renderable_mut(&mut self, entity: Entity) -> Option<&mut Renderable> {
        self.world.query_one_mut::<&mut Renderable>(entity).ok()
    }

    pub fn set_visible(&mut self, entity: Entity, visible: bool) {
        if let Ok(node) = self.world.query_one_mut::<&mut Node>(entity) {
            node.visible = visible;
        }
    }

    /// Whether the node's own flag is set, ignoring ancestors.
    pub fn is_visible(&self, entity: Entity) -> bool {
        self.world
            .get::<&Node>(entity)
            .map(|n| n.visible)
            .unwrap_or(false)
    }

    /// Whether the node and every ancestor are visible.
    pub fn is_visible_in_hierarchy(&self, entity: Entity) -> bool {
        self.ancestors(entity).all(|e| self.is_visible(e))
    }

    /// Local-to-world matrix composed through the parent chain.
    pub fn world_matrix(&self, entity: Entity) -> Mat4 {
        self.ancestors(entity)
            .filter_map(|e| self.transform(e))
            .fold(Mat4::IDENTITY, |acc, t| t.matrix() * acc)
    }

    /// Calls `f` for every renderable whose subtree is visible.
    pub fn for_each_renderable(&self, mut f: impl FnMut(Mat4, &Renderable)) {
        for (entity, renderable) in self.world.query::<&Renderable>().iter() {
            if self.is_visible_in_hierarchy(entity) {
                f(self.world_matrix(entity), renderable);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }
}

pub struct Ancestors<'a> {
    graph: &'a SceneGraph,
    next: Option<Entity>,
}

impl Iterator for Ancestors<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let current = self.next?;
        self.next = self.graph.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn ancestors_end_at_root() {
        let mut graph = SceneGraph::new("root");
        let group = graph.spawn(graph.root(), "group", Transform::new());
        let leaf = graph.spawn(group, "leaf", Transform::new());
        let chain: Vec<_> = graph.ancestors(leaf).collect();
        assert_eq!(chain, vec![leaf, group, graph.root()]);
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut graph = SceneGraph::new("root");
        let group = graph.spawn(
            graph.root(),
            "group",
            Transform::from_position(Vec3::new(3.0, 0.0, 0.0))
                .rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        );
        let leaf = graph.spawn(group, "leaf", Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        let p = graph.world_matrix(leaf).transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(3.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn hidden_parent_hides_subtree() {
        let mut graph = SceneGraph::new("root");
        let group = graph.spawn(graph.root(), "group", Transform::new());
        let leaf = graph.spawn(group, "leaf", Transform::new());
        assert!(graph.is_visible_in_hierarchy(leaf));
        graph.set_visible(group, false);
        assert!(graph.is_visible(leaf));
        assert!(!graph.is_visible_in_hierarchy(leaf));
    }
}

//! Ray casting against scene colliders.
//!
//! - [`Ray`]: origin and direction, built from normalized pointer coordinates
//! - [`Collider`]: box or sphere shape attached to a scene node
//! - [`RayHit`]: which node was hit, how far away and where
//!
//! Colliders are tested in world space using the node's composed transform.
//! Rotation is ignored for boxes, so they behave as axis-aligned bounds around
//! the node's world position.

use glam::{Vec2, Vec3, Vec4};

use crate::camera::Camera;
use crate::scene::SceneGraph;

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from the camera through a point in normalized device coordinates.
    ///
    /// `ndc` spans `[-1, 1]` on both axes with +Y up.
    pub fn from_ndc(ndc: Vec2, camera: &Camera) -> Self {
        let inv_view_proj = camera.view_projection().inverse();

        let near_world = inv_view_proj * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far_world = inv_view_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);

        // Perspective divide
        let near_point = near_world.truncate() / near_world.w;
        let far_point = far_world.truncate() / far_world.w;

        Self {
            origin: near_point,
            direction: (far_point - near_point).normalize_or_zero(),
        }
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test against an axis-aligned box. Returns the nearest positive distance.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for i in 0..3 {
            let origin = self.origin[i];
            let dir = self.direction[i];

            if dir.abs() < f32::EPSILON {
                if origin < min[i] || origin > max[i] {
                    return None;
                }
            } else {
                let inv_dir = 1.0 / dir;
                let mut t1 = (min[i] - origin) * inv_dir;
                let mut t2 = (max[i] - origin) * inv_dir;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }

    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_disc = discriminant.sqrt();
        let t1 = -b - sqrt_disc;
        let t2 = -b + sqrt_disc;
        if t1 > 0.0 {
            Some(t1)
        } else if t2 > 0.0 {
            Some(t2)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collider {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

impl Collider {
    /// Box collider with full edge lengths `size` in local units.
    pub fn box_collider(size: Vec3) -> Self {
        Self::Box {
            half_extents: size * 0.5,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Matches the unit [`Primitive::Cube`](crate::mesh::Primitive::Cube).
    pub fn unit_box() -> Self {
        Self::box_collider(Vec3::ONE)
    }

    pub fn intersect(&self, ray: &Ray, position: Vec3, scale: Vec3) -> Option<f32> {
        match self {
            Collider::Box { half_extents } => {
                let scaled_half = (*half_extents * scale).abs();
                ray.intersect_aabb(position - scaled_half, position + scaled_half)
            }
            Collider::Sphere { radius } => {
                let avg_scale = (scale.x.abs() + scale.y.abs() + scale.z.abs()) / 3.0;
                ray.intersect_sphere(position, radius * avg_scale)
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub entity: hecs::Entity,
    pub distance: f32,
    pub point: Vec3,
}

/// Every visible collider the ray hits, nearest first.
pub fn raycast_all(graph: &SceneGraph, ray: &Ray) -> Vec<RayHit> {
    let mut hits = Vec::new();

    for (entity, collider) in graph.world().query::<&Collider>().iter() {
        if !graph.is_visible_in_hierarchy(entity) {
            continue;
        }
        let (scale, _, position) = graph.world_matrix(entity).to_scale_rotation_translation();
        if let Some(distance) = collider.intersect(ray, position, scale) {
            hits.push(RayHit {
                entity,
                distance,
                point: ray.point_at(distance),
            });
        }
    }

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Transform;

    #[test]
    fn center_ray_points_along_forward() {
        let camera = Camera::new()
            .at(Vec3::new(0.0, 2.0, 4.0))
            .looking_at(Vec3::new(0.0, 1.0, 0.0));
        let ray = Ray::from_ndc(Vec2::ZERO, &camera);
        assert!(ray.direction.abs_diff_eq(camera.forward(), 1e-4));
    }

    #[test]
    fn aabb_hit_from_outside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let t = ray.intersect_aabb(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(t, Some(4.0));
        let miss = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(miss.intersect_aabb(Vec3::splat(-1.0), Vec3::splat(1.0)).is_none());
    }

    #[test]
    fn sphere_hit_distance() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let t = ray.intersect_sphere(Vec3::ZERO, 1.0).expect("hit");
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn raycast_sorts_nearest_first_and_skips_hidden() {
        let mut graph = SceneGraph::new("root");
        let far = graph.spawn_with(
            graph.root(),
            "far",
            Transform::from_position(Vec3::new(0.0, 0.0, -5.0)),
            (Collider::unit_box(),),
        );
        let near = graph.spawn_with(
            graph.root(),
            "near",
            Transform::from_position(Vec3::new(0.0, 0.0, -2.0)),
            (Collider::unit_box(),),
        );
        let hidden = graph.spawn_with(
            graph.root(),
            "hidden",
            Transform::from_position(Vec3::new(0.0, 0.0, -1.0)),
            (Collider::unit_box(),),
        );
        graph.set_visible(hidden, false);

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hits = raycast_all(&graph, &ray);
        let order: Vec<_> = hits.iter().map(|h| h.entity).collect();
        assert_eq!(order, vec![near, far]);
        assert!((hits[0].distance - 1.5).abs() < 1e-5);
    }

    #[test]
    fn child_collider_uses_parent_transform() {
        let mut graph = SceneGraph::new("root");
        let group = graph.spawn(
            graph.root(),
            "group",
            Transform::from_position(Vec3::new(3.0, 0.0, 0.0)),
        );
        let child = graph.spawn_with(
            group,
            "child",
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            (Collider::unit_box(),),
        );
        let ray = Ray::new(Vec3::new(3.0, 1.0, 10.0), Vec3::NEG_Z);
        let hits = raycast_all(&graph, &ray);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, child);
    }
}

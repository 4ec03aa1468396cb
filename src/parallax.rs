use glam::{Quat, Vec2, Vec3};

use crate::camera::{Camera, CameraPose};

pub const DEFAULT_MAX_ANGLE_DEG: f32 = 20.0;
pub const DEFAULT_SMOOTHING: f32 = 4.0;

/// Pointer-driven lean around a camera's rest pose.
///
/// The pointer picks a target pose by swinging the rest pose around `pivot`
/// by at most `max_angle`. The live camera eases toward that target at
/// `smoothing` per second and never jumps.
#[derive(Clone, Debug)]
pub struct ParallaxRig {
    pub rest: CameraPose,
    pub pivot: Vec3,
    pub max_angle: f32, // radians
    pub smoothing: f32,
}

impl ParallaxRig {
    pub fn new(rest: CameraPose, pivot: Vec3, max_angle_deg: f32, smoothing: f32) -> Self {
        Self {
            rest,
            pivot,
            max_angle: max_angle_deg.to_radians(),
            smoothing,
        }
    }

    /// Pose the camera settles at for a given pointer position.
    pub fn target_pose(&self, pointer_ndc: Vec2) -> CameraPose {
        let p = pointer_ndc.clamp_length_max(1.0);
        if p.length_squared() < 1e-12 {
            return self.rest;
        }

        let up = self.rest.rotation * Vec3::Y;
        let right = self.rest.rotation * Vec3::X;
        // Pointer right swings the camera right, pointer up swings it up
        let axis = (up * p.x - right * p.y).normalize_or_zero();
        let swing = Quat::from_axis_angle(axis, p.length() * self.max_angle);

        CameraPose {
            position: self.pivot + swing * (self.rest.position - self.pivot),
            rotation: (swing * self.rest.rotation).normalize(),
        }
    }

    pub fn update(&self, camera: &mut Camera, pointer_ndc: Vec2, dt: f32) {
        let target = self.target_pose(pointer_ndc);
        let t = (self.smoothing * dt).clamp(0.0, 1.0);
        camera.position = camera.position.lerp(target.position, t);
        camera.rotation = camera.rotation.slerp(target.rotation, t).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> ParallaxRig {
        let camera = Camera::new()
            .at(Vec3::new(0.0, 2.0, 4.0))
            .looking_at(Vec3::new(0.0, 1.0, 0.0));
        ParallaxRig::new(camera.pose(), Vec3::new(0.0, 1.0, 0.0), 20.0, 4.0)
    }

    #[test]
    fn centred_pointer_keeps_rest_pose() {
        let rig = rig();
        assert_eq!(rig.target_pose(Vec2::ZERO), rig.rest);
    }

    #[test]
    fn deflection_is_bounded_by_max_angle() {
        let rig = rig();
        for pointer in [Vec2::new(1.0, 1.0), Vec2::new(-1.0, 0.3), Vec2::new(5.0, -5.0)] {
            let pose = rig.target_pose(pointer);
            let angle = pose.rotation.angle_between(rig.rest.rotation);
            assert!(angle <= rig.max_angle + 1e-4, "angle {angle} for {pointer}");
            let rest_offset = rig.rest.position - rig.pivot;
            let offset = pose.position - rig.pivot;
            assert!((offset.length() - rest_offset.length()).abs() < 1e-4);
        }
    }

    #[test]
    fn camera_eases_without_snapping() {
        let rig = rig();
        let mut camera = Camera::new();
        camera.set_pose(rig.rest);
        let target = rig.target_pose(Vec2::new(1.0, 0.0));

        rig.update(&mut camera, Vec2::new(1.0, 0.0), 1.0 / 60.0);
        let first_gap = camera.position.distance(target.position);
        assert!(first_gap > 1e-3);

        for _ in 0..600 {
            rig.update(&mut camera, Vec2::new(1.0, 0.0), 1.0 / 60.0);
        }
        assert!(camera.position.distance(target.position) < 1e-3);
    }
}

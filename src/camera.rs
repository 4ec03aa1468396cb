use glam::{Mat3, Mat4, Quat, Vec3};

/// A perspective camera for one scene.
///
/// Orientation is stored as a quaternion; the camera looks down its local -Z
/// axis with +Y up. Depth maps to `[0, 1]` as wgpu expects.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    pub fov: f32, // radians, vertical
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

/// Position and orientation snapshot of a camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            rotation: Quat::IDENTITY,
            fov: std::f32::consts::FRAC_PI_3,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.look_at(target);
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Turns the camera to face `target`, keeping world +Y as up.
    pub fn look_at(&mut self, target: Vec3) {
        self.rotation = look_rotation(target - self.position);
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            rotation: self.rotation,
        }
    }

    pub fn set_pose(&mut self, pose: CameraPose) {
        self.position = pose.position;
        self.rotation = pose.rotation;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect.max(f32::EPSILON), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Transforms a world-space point into camera-local space.
    ///
    /// Points in front of the camera have negative z.
    pub fn world_to_local(&self, point: Vec3) -> Vec3 {
        self.view_matrix().transform_point3(point)
    }
}

/// Rotation that points local -Z along `direction` with +Y kept upright.
pub fn look_rotation(direction: Vec3) -> Quat {
    let forward = direction.normalize_or(Vec3::NEG_Z);
    let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
    let up = right.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, up, -forward))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_points_forward_at_target() {
        let camera = Camera::new()
            .at(Vec3::new(5.0, 4.0, 5.0))
            .looking_at(Vec3::new(0.0, 1.0, 0.0));
        let expected = (Vec3::new(0.0, 1.0, 0.0) - camera.position).normalize();
        assert!(camera.forward().abs_diff_eq(expected, 1e-5));
        assert!(camera.right().y.abs() < 1e-5);
    }

    #[test]
    fn target_lies_on_negative_local_z() {
        let target = Vec3::new(0.0, 1.0, 0.0);
        let camera = Camera::new().at(Vec3::new(0.0, 2.0, 4.0)).looking_at(target);
        let local = camera.world_to_local(target);
        assert!(local.x.abs() < 1e-4);
        assert!(local.y.abs() < 1e-4);
        let distance = (target - camera.position).length();
        assert!((local.z + distance).abs() < 1e-4);
    }
}

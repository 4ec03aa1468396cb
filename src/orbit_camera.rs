use glam::Vec3;
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::input::Input;

const ELEVATION_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Drag-to-orbit, scroll-to-zoom controller around a fixed target.
///
/// The controller keeps its own spherical coordinates and writes the resulting
/// pose into the scene camera. When `enabled` is false it leaves the camera
/// alone so another rig can drive it.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub enabled: bool,
    pub sensitivity: f32,
    pub zoom_sensitivity: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitControls {
    /// Derives orbit coordinates from where the camera currently sits.
    pub fn from_camera(camera: &Camera, target: Vec3) -> Self {
        let offset = camera.position - target;
        let distance = offset.length().max(f32::EPSILON);
        Self {
            target,
            distance,
            azimuth: offset.x.atan2(offset.z),
            elevation: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            enabled: true,
            sensitivity: 0.005,
            zoom_sensitivity: 0.5,
            min_distance: 0.5,
            max_distance: 100.0,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self.distance = self.distance.clamp(min, max);
        self
    }

    pub fn update(&mut self, input: &Input, camera: &mut Camera) {
        if !self.enabled {
            return;
        }

        if input.mouse_down(MouseButton::Left) {
            let delta = input.mouse_delta();
            self.azimuth -= delta.x * self.sensitivity;
            self.elevation =
                (self.elevation + delta.y * self.sensitivity).clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
        }

        let scroll = input.scroll_delta();
        if scroll.y.abs() > 0.0 {
            self.distance = (self.distance - scroll.y * self.zoom_sensitivity)
                .clamp(self.min_distance, self.max_distance);
        }

        self.apply(camera);
    }

    /// Places the camera on the orbit sphere looking at the target.
    pub fn apply(&self, camera: &mut Camera) {
        // Spherical to Cartesian conversion
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );
        camera.position = self.target + offset;
        camera.look_at(self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::time::{Duration, Instant};

    #[test]
    fn from_camera_round_trips_pose() {
        let mut camera = Camera::new()
            .at(Vec3::new(5.0, 4.0, 5.0))
            .looking_at(Vec3::new(0.0, 1.0, 0.0));
        let before = camera.position;
        let controls = OrbitControls::from_camera(&camera, Vec3::new(0.0, 1.0, 0.0));
        controls.apply(&mut camera);
        assert!(camera.position.abs_diff_eq(before, 1e-4));
    }

    #[test]
    fn drag_rotates_and_keeps_distance() {
        let target = Vec3::new(0.0, 1.0, 0.0);
        let mut camera = Camera::new().at(Vec3::new(0.0, 1.0, 5.0)).looking_at(target);
        let mut controls = OrbitControls::from_camera(&camera, target);
        let mut input = Input::new(Duration::from_millis(300));
        input.press_button(MouseButton::Left, Instant::now());
        input.move_pointer(Vec2::new(100.0, 0.0));
        controls.update(&input, &mut camera);
        assert!(camera.position.x.abs() > 0.1);
        assert!(((camera.position - target).length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn disabled_controls_leave_camera_alone() {
        let target = Vec3::ZERO;
        let mut camera = Camera::new().at(Vec3::new(0.0, 0.0, 5.0)).looking_at(target);
        let mut controls = OrbitControls::from_camera(&camera, target).enabled(false);
        controls.distance = 2.0;
        let input = Input::new(Duration::from_millis(300));
        controls.update(&input, &mut camera);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
    }
}

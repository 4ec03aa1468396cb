//! Per-frame pointer interaction for the active scene.
//!
//! The [`Resolver`] raycasts the pointer into the scene, keeps stand selection
//! exclusive, turns debounced clicks into switch requests and tracks the
//! smoothed depth-of-field focus point.

use glam::Vec3;

use crate::audio::AudioSink;
use crate::camera::Camera;
use crate::input::PointerState;
use crate::picking::{Ray, raycast_all};
use crate::scene::{SceneBundle, SceneId, StandRef, StandTable};

/// Smoothed focus point and the focus distance derived from it.
#[derive(Clone, Debug)]
pub struct FocusState {
    target: Vec3,
    point: Vec3,
    distance: f32,
    rate: f32,
}

impl FocusState {
    pub fn new(initial: Vec3, rate: f32) -> Self {
        Self {
            target: initial,
            point: initial,
            distance: 0.0,
            rate,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn point(&self) -> Vec3 {
        self.point
    }

    /// Camera-local z of the focus point. Negative in front of the camera.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Moves the focus point toward the target by `min(1, rate * dt)` of the gap.
    pub fn smooth(&mut self, dt: f32) {
        let t = (self.rate * dt).clamp(0.0, 1.0);
        self.point += (self.target - self.point) * t;
    }

    pub fn project(&mut self, camera: &Camera) -> f32 {
        self.distance = camera.world_to_local(self.point).z;
        self.distance
    }
}

/// Outcome of one resolver pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Resolution {
    pub hovered: Option<StandRef>,
    /// World-space point under the pointer on the hovered stand.
    pub hit_point: Option<Vec3>,
    /// Scene the user clicked through to, if any.
    pub request: Option<SceneId>,
}

pub struct Resolver {
    focus: FocusState,
}

impl Resolver {
    pub fn new(initial_focus: Vec3, focus_rate: f32) -> Self {
        Self {
            focus: FocusState::new(initial_focus, focus_rate),
        }
    }

    pub fn focus(&self) -> &FocusState {
        &self.focus
    }

    /// Runs interaction for the active scene.
    ///
    /// Clicks are ignored while `transitioning`. Hover changes start and stop
    /// the hovered stand's hum through `audio`.
    pub fn resolve(
        &mut self,
        bundle: &mut SceneBundle,
        stands: &StandTable,
        pointer: PointerState,
        transitioning: bool,
        dt: f32,
        audio: &mut dyn AudioSink,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        if !bundle.stands.is_empty() && !stands.is_empty() {
            let ray = Ray::from_ndc(pointer.ndc, &bundle.camera);
            let hovered = raycast_all(&bundle.graph, &ray)
                .first()
                .and_then(|hit| Some((stands.resolve(&bundle.graph, hit.entity)?, hit.point)));
            if let Some((stand, point)) = hovered {
                resolution.hovered = Some(stand);
                resolution.hit_point = Some(point);
            }

            // Stops go out before plays so a hover moving between stands
            // never ends on a stop.
            let hovered_index = resolution.hovered.map(|s| s.index);
            for (index, stand) in bundle.stands.iter_mut().enumerate() {
                let selected = hovered_index == Some(index);
                stand.set_selected(selected);
                if !selected && stand.is_sound_playing() {
                    if let Some(sound) = stand.sound() {
                        audio.stop(sound);
                    }
                    stand.set_sound_playing(false);
                }
            }
            if let Some(stand) = hovered_index.and_then(|i| bundle.stands.get_mut(i)) {
                if !stand.is_sound_playing() {
                    if let Some(sound) = stand.sound() {
                        audio.play(sound);
                    }
                    stand.set_sound_playing(true);
                }
            }

            if let Some(stand) = resolution.hovered {
                if pointer.clicked && !transitioning && stand.destination != bundle.id() {
                    resolution.request = Some(stand.destination);
                }
            }
        }

        let target = resolution
            .hit_point
            .unwrap_or_else(|| bundle.rig.look_target());
        self.focus.set_target(target);
        self.focus.smooth(dt);
        self.focus.project(&bundle.camera);

        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{LoggingAudio, RecordingAudio};
    use crate::stand::hum_sound;
    use crate::config::ShowroomConfig;
    use glam::{Vec2, Vec4Swizzles};

    const DT: f32 = 1.0 / 60.0;

    fn detail_scene() -> (SceneBundle, StandTable) {
        let config = ShowroomConfig::default();
        let mut bundle = SceneBundle::new(SceneId(0), "test", &config.stand_camera, 16.0 / 9.0);
        bundle.add_stand(Vec3::ZERO, "art.png", SceneId(2));
        let table = StandTable::index(&bundle);
        (bundle, table)
    }

    fn ndc_of(camera: &Camera, point: Vec3) -> Vec2 {
        let clip = camera.view_projection() * point.extend(1.0);
        clip.xy() / clip.w
    }

    fn glass_centre() -> Vec3 {
        Vec3::new(0.0, 1.25, 0.0)
    }

    #[test]
    fn focus_converges_within_two_seconds() {
        let mut focus = FocusState::new(Vec3::ZERO, 5.0);
        let target = Vec3::new(2.0, -1.0, 7.5);
        focus.set_target(target);
        for _ in 0..120 {
            focus.smooth(DT);
        }
        assert!(focus.point().distance(target) < 1e-3);
    }

    #[test]
    fn large_step_does_not_overshoot() {
        let mut focus = FocusState::new(Vec3::ZERO, 5.0);
        focus.set_target(Vec3::X);
        focus.smooth(10.0);
        assert_eq!(focus.point(), Vec3::X);
    }

    #[test]
    fn hovering_a_stand_selects_it_and_plays_its_hum() {
        let (mut bundle, table) = detail_scene();
        let mut resolver = Resolver::new(Vec3::ZERO, 5.0);
        let mut audio = RecordingAudio::default();
        let pointer = PointerState {
            ndc: ndc_of(&bundle.camera, glass_centre()),
            clicked: false,
        };

        let resolution = resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut audio);
        assert_eq!(resolution.hovered.map(|s| s.destination), Some(SceneId(2)));
        assert!(bundle.stands[0].is_selected());
        assert_eq!(audio.plays(), 1);
        assert!(resolution.request.is_none());

        // Staying on the stand does not restart the sound.
        resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut audio);
        assert_eq!(audio.plays(), 1);

        let away = PointerState {
            ndc: Vec2::new(0.95, 0.95),
            clicked: false,
        };
        resolver.resolve(&mut bundle, &table, away, false, DT, &mut audio);
        assert!(!bundle.stands[0].is_selected());
        assert_eq!(audio.stops(), 1);
    }

    #[test]
    fn click_on_stand_requests_its_destination() {
        let (mut bundle, table) = detail_scene();
        let mut resolver = Resolver::new(Vec3::ZERO, 5.0);
        let mut audio = RecordingAudio::default();
        let pointer = PointerState {
            ndc: ndc_of(&bundle.camera, glass_centre()),
            clicked: true,
        };

        let resolution = resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut audio);
        assert_eq!(resolution.request, Some(SceneId(2)));

        let busy = resolver.resolve(&mut bundle, &table, pointer, true, DT, &mut audio);
        assert_eq!(busy.request, None);
    }

    #[test]
    fn clicking_the_stand_of_the_active_scene_does_nothing() {
        let config = ShowroomConfig::default();
        let mut bundle = SceneBundle::new(SceneId(2), "stand-2", &config.stand_camera, 1.0);
        bundle.add_stand(Vec3::ZERO, "art.png", SceneId(2));
        let table = StandTable::index(&bundle);
        let mut resolver = Resolver::new(Vec3::ZERO, 5.0);
        let pointer = PointerState {
            ndc: ndc_of(&bundle.camera, glass_centre()),
            clicked: true,
        };
        let resolution =
            resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut RecordingAudio::default());
        assert!(resolution.hovered.is_some());
        assert_eq!(resolution.request, None);
    }

    #[test]
    fn hover_moving_between_stands_keeps_the_new_hum_playing() {
        let config = ShowroomConfig::default();
        let mut bundle = SceneBundle::new(SceneId::MAIN, "main", &config.main_camera, 4.0 / 3.0);
        let left = Vec3::new(-1.5, 0.0, 0.0);
        let right = Vec3::new(1.5, 0.0, 0.0);
        bundle.add_stand(left, "a.png", SceneId(1));
        bundle.add_stand(right, "b.png", SceneId(2));
        let table = StandTable::index(&bundle);
        let mut resolver = Resolver::new(Vec3::ZERO, 5.0);
        let mut audio = LoggingAudio::new();
        let lift = glass_centre();

        let pointer = PointerState {
            ndc: ndc_of(&bundle.camera, left + lift),
            clicked: false,
        };
        let first = resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut audio);
        assert_eq!(first.hovered.map(|s| s.index), Some(0));
        assert!(audio.is_playing(&hum_sound(SceneId(1))));

        let pointer = PointerState {
            ndc: ndc_of(&bundle.camera, right + lift),
            clicked: false,
        };
        let second = resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut audio);
        assert_eq!(second.hovered.map(|s| s.index), Some(1));
        assert!(audio.is_playing(&hum_sound(SceneId(2))));
        assert!(!audio.is_playing(&hum_sound(SceneId(1))));
        assert!(bundle.stands[1].is_sound_playing());
        assert!(!bundle.stands[0].is_sound_playing());
    }

    #[test]
    fn hover_swap_stops_before_it_plays() {
        let config = ShowroomConfig::default();
        let mut bundle = SceneBundle::new(SceneId::MAIN, "main", &config.main_camera, 4.0 / 3.0);
        let left = Vec3::new(-1.5, 0.0, 0.0);
        let right = Vec3::new(1.5, 0.0, 0.0);
        bundle.add_stand(left, "a.png", SceneId(1));
        bundle.add_stand(right, "b.png", SceneId(2));
        let table = StandTable::index(&bundle);
        let mut resolver = Resolver::new(Vec3::ZERO, 5.0);
        let mut audio = RecordingAudio::default();

        for point in [left, right] {
            let pointer = PointerState {
                ndc: ndc_of(&bundle.camera, point + glass_centre()),
                clicked: false,
            };
            resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut audio);
        }
        assert_eq!(
            audio.calls,
            vec![
                (true, hum_sound(SceneId(1))),
                (false, hum_sound(SceneId(1))),
                (true, hum_sound(SceneId(2))),
            ]
        );
    }

    #[test]
    fn click_on_empty_space_focuses_the_camera_target() {
        let (mut bundle, table) = detail_scene();
        let mut resolver = Resolver::new(Vec3::new(5.0, 5.0, 5.0), 5.0);
        let pointer = PointerState {
            ndc: Vec2::new(0.95, -0.95),
            clicked: true,
        };
        let resolution =
            resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut RecordingAudio::default());
        assert_eq!(resolution, Resolution::default());
        assert_eq!(resolver.focus().target(), bundle.rig.look_target());
    }

    #[test]
    fn scene_without_stands_falls_back_to_camera_target() {
        let config = ShowroomConfig::default();
        let mut bundle = SceneBundle::new(SceneId(5), "bare", &config.stand_camera, 1.0);
        let table = StandTable::index(&bundle);
        let mut resolver = Resolver::new(Vec3::ZERO, 5.0);
        let pointer = PointerState {
            ndc: Vec2::ZERO,
            clicked: true,
        };
        let resolution =
            resolver.resolve(&mut bundle, &table, pointer, false, DT, &mut RecordingAudio::default());
        assert!(resolution.request.is_none());
        assert_eq!(resolver.focus().target(), Vec3::new(0.0, 1.0, 0.0));
        assert!(resolver.focus().distance() < 0.0);
    }
}

//! The per-frame driver.
//!
//! [`Showroom`] owns the scenes, the transition controller and everything the
//! user sees outside the 3D view (messages, sounds). It is generic over the
//! [`PipelineFactory`] so the whole frame loop runs without a GPU in tests.

use std::time::{Duration, Instant};

use glam::Vec3;
use log::{error, info};
use winit::keyboard::KeyCode;

use crate::audio::{AudioSink, LoggingAudio};
use crate::config::ShowroomConfig;
use crate::environment::EnvironmentCatalog;
use crate::error::{Result, VitrineError};
use crate::input::Input;
use crate::interaction::{Resolution, Resolver};
use crate::messages::{MessageBoard, MessageOptions, MessageSink};
use crate::pipeline::Tunables;
use crate::scene::{
    LiveOutput, PipelineFactory, RejectReason, SceneId, SceneRegistry, SwitchOutcome,
    TransitionController, TransitionState,
};

pub const LOADING_MESSAGE: &str = "loading-screen";
pub const LOAD_ERROR_MESSAGE: &str = "load-error";
pub const TRANSITION_MESSAGE: &str = "transition-info";
pub const SCENE_CONTEXT_MESSAGE: &str = "scene-context-message";
pub const HOVER_MESSAGE: &str = "hover-info";

/// Looping sound started once the scenes exist.
pub const AMBIENT_SOUND: &str = "energy";

const RETURN_NOTICE: Duration = Duration::from_millis(1500);

const SCENE_KEYS: [KeyCode; 10] = [
    KeyCode::Digit0,
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Loading { loaded: usize, total: usize },
    /// Asset loading failed; the session never builds scenes.
    Failed(String),
    Ready,
}

pub struct Showroom<F: PipelineFactory, A: AudioSink = LoggingAudio> {
    config: ShowroomConfig,
    catalog: EnvironmentCatalog,
    phase: Phase,
    registry: SceneRegistry,
    controller: Option<TransitionController<F>>,
    resolver: Resolver,
    tunables: Tunables,
    messages: MessageBoard,
    audio: A,
    last_tick: Instant,
    elapsed: f32,
    viewport: (u32, u32),
    last_resolution: Resolution,
}

impl<F: PipelineFactory, A: AudioSink> Showroom<F, A> {
    pub fn new(
        config: ShowroomConfig,
        catalog: EnvironmentCatalog,
        audio: A,
        now: Instant,
        viewport: (u32, u32),
    ) -> Self {
        let mut messages = MessageBoard::new(now);
        messages.show_message(LOADING_MESSAGE, "Loading", MessageOptions::persistent());
        let interaction = &config.interaction;
        let resolver = Resolver::new(Vec3::from(interaction.default_focus), interaction.focus_rate);
        let tunables = Tunables::new(config.post, config.glass);

        Self {
            config,
            catalog,
            phase: Phase::Loading { loaded: 0, total: 0 },
            registry: SceneRegistry::new(),
            controller: None,
            resolver,
            tunables,
            messages,
            audio,
            last_tick: now,
            elapsed: 0.0,
            viewport,
            last_resolution: Resolution::default(),
        }
    }

    pub fn on_progress(&mut self, loaded: usize, total: usize) {
        if !matches!(self.phase, Phase::Loading { .. }) {
            return;
        }
        self.phase = Phase::Loading { loaded, total };
        self.messages.show_message(
            LOADING_MESSAGE,
            &format!("Loading {loaded}/{total}"),
            MessageOptions::persistent(),
        );
    }

    /// Halts the session; nothing is built after a failed load.
    pub fn on_load_failed(&mut self, name: &str, reason: &str) {
        error!("failed to load {name}: {reason}");
        self.messages.hide_message(LOADING_MESSAGE);
        self.messages.show_message(
            LOAD_ERROR_MESSAGE,
            &format!("Failed to load {name}. Refresh to try again."),
            MessageOptions::persistent(),
        );
        self.phase = Phase::Failed(format!("{name}: {reason}"));
    }

    /// Builds every scene and the live pipeline for scene 0.
    pub fn start(&mut self, factory: &mut F) -> Result<()> {
        if let Phase::Failed(reason) = &self.phase {
            return Err(VitrineError::Config(format!(
                "cannot start after a failed load ({reason})"
            )));
        }

        let mut registry = SceneRegistry::build(&self.config, &self.catalog)?;
        let (width, height) = self.viewport;
        registry.set_aspect(width as f32 / height.max(1) as f32);
        factory.set_viewport(width, height);
        let controller = TransitionController::new(&self.config.transition, &registry, factory)?;

        self.registry = registry;
        self.controller = Some(controller);
        self.messages.hide_message(LOADING_MESSAGE);
        self.audio.play(AMBIENT_SOUND);
        self.phase = Phase::Ready;
        info!("showroom ready with {} scenes", self.registry.count());
        Ok(())
    }

    /// Runs one frame of logic: transition, camera, interaction and
    /// animation, in that order.
    pub fn tick(&mut self, now: Instant, input: &Input, factory: &mut F) {
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.messages.tick(now);
        if self.phase != Phase::Ready {
            return;
        }
        let dt = delta.as_secs_f32();
        self.elapsed += dt;

        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        if controller.advance(delta, &self.registry, factory).is_some() {
            self.messages.hide_message(TRANSITION_MESSAGE);
        }

        self.handle_keys(input, factory);

        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        let active = controller.active();
        let transitioning = controller.is_transitioning();

        let pointer = input.pointer(now);
        let mut resolution = Resolution::default();
        if let Some((bundle, stands)) = self.registry.scene_with_stands_mut(active) {
            bundle.update_camera(input, pointer.ndc, dt);
            resolution = self.resolver.resolve(
                bundle,
                stands,
                pointer,
                transitioning,
                dt,
                &mut self.audio,
            );
        }
        self.last_resolution = resolution;
        if let Some(to) = resolution.request {
            self.request_scene(to, factory);
        }

        // A request above may have started a switch this frame.
        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        let active = controller.active();
        let outgoing = controller.outgoing();
        if let Some(bundle) = outgoing.and_then(|id| self.registry.get_mut(id)) {
            bundle.update_camera(input, pointer.ndc, dt);
        }
        for id in std::iter::once(active).chain(outgoing) {
            if let Some(bundle) = self.registry.get_mut(id) {
                bundle.update_entities(dt);
            }
        }
        self.tunables.focus_distance = self.resolver.focus().distance();
    }

    fn handle_keys(&mut self, input: &Input, factory: &mut F) {
        for (index, key) in SCENE_KEYS.iter().enumerate() {
            if input.key_pressed(*key) {
                self.request_scene(SceneId(index as u32), factory);
            }
        }
        if input.key_pressed(KeyCode::KeyT) {
            if let Some(controller) = self.controller.as_mut() {
                match controller.cycle_pattern() {
                    Some(pattern) => info!("wipe pattern fixed to {pattern}"),
                    None => info!("wipe pattern follows destination"),
                }
            }
        }
        if input.key_pressed(KeyCode::Escape)
            && self.messages.close_latest().as_deref() == Some(SCENE_CONTEXT_MESSAGE)
        {
            self.request_scene(SceneId::MAIN, factory);
        }
    }

    /// Asks the controller to switch and announces the switch if it starts.
    pub fn request_scene(&mut self, to: SceneId, factory: &mut F) -> SwitchOutcome {
        let Some(controller) = self.controller.as_mut() else {
            return SwitchOutcome::Rejected(RejectReason::Busy);
        };
        let outcome = controller.request_switch(to, &mut self.registry, factory, &mut self.audio);
        if outcome.is_started() {
            self.messages.hide_message(SCENE_CONTEXT_MESSAGE);
            self.messages.hide_message(HOVER_MESSAGE);
            if to.is_main() {
                self.messages.show_message(
                    TRANSITION_MESSAGE,
                    "Returning to Main Scene",
                    MessageOptions::timed(RETURN_NOTICE),
                );
            } else {
                self.messages.show_message(
                    SCENE_CONTEXT_MESSAGE,
                    &format!("Viewing Stand {}", to.0),
                    MessageOptions::persistent().closable(),
                );
            }
        }
        outcome
    }

    /// Records the viewport and updates every camera aspect. Zero sizes
    /// (minimised windows) are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.registry.set_aspect(width as f32 / height as f32);
    }

    /// Follows a window resize: camera aspects now, GPU targets through the
    /// controller.
    pub fn resize(&mut self, width: u32, height: u32, factory: &mut F) {
        if width == 0 || height == 0 {
            return;
        }
        self.set_viewport(width, height);
        if let Some(controller) = self.controller.as_mut() {
            controller.resize(width, height, factory);
        }
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Hands the frame's output to `render`. Returns `None` until scenes
    /// exist.
    pub fn render_with<R>(
        &mut self,
        render: impl FnOnce(LiveOutput<'_, F>, &SceneRegistry, f32, &Tunables) -> R,
    ) -> Option<R> {
        if self.phase != Phase::Ready {
            return None;
        }
        let output = self.controller.as_mut()?.output()?;
        Some(render(output, &self.registry, self.elapsed, &self.tunables))
    }

    /// Window title: the newest visible message, else the configured title.
    pub fn title(&self) -> String {
        match self.messages.latest() {
            Some(message) => format!("{} - {}", self.config.window.title, message.content),
            None => self.config.window.title.clone(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn active(&self) -> Option<SceneId> {
        self.controller.as_ref().map(|c| c.active())
    }

    pub fn state(&self) -> Option<TransitionState> {
        self.controller.as_ref().map(|c| c.state())
    }

    pub fn controller(&self) -> Option<&TransitionController<F>> {
        self.controller.as_ref()
    }

    pub fn messages(&self) -> &MessageBoard {
        &self.messages
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn last_resolution(&self) -> Resolution {
        self.last_resolution
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn tunables_mut(&mut self) -> &mut Tunables {
        &mut self.tunables
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn config(&self) -> &ShowroomConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::camera::Camera;
    use crate::config::CameraMode;
    use crate::test_support::RecordingFactory;
    use glam::{Vec2, Vec4Swizzles};
    use winit::event::MouseButton;

    const WIDTH: u32 = 800;
    const HEIGHT: u32 = 600;
    const FRAME: Duration = Duration::from_millis(16);

    struct Harness {
        showroom: Showroom<RecordingFactory, RecordingAudio>,
        factory: RecordingFactory,
        input: Input,
        now: Instant,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(ShowroomConfig::default())
        }

        fn with_config(config: ShowroomConfig) -> Self {
            let mut input = Input::new(config.interaction.click_window());
            input.set_viewport(WIDTH, HEIGHT);
            let now = Instant::now();
            let showroom = Showroom::new(
                config,
                EnvironmentCatalog::standard(),
                RecordingAudio::default(),
                now,
                (WIDTH, HEIGHT),
            );
            Self {
                showroom,
                factory: RecordingFactory::new(WIDTH, HEIGHT),
                input,
                now,
            }
        }

        fn ready() -> Self {
            Self::ready_with(ShowroomConfig::default())
        }

        fn ready_with(config: ShowroomConfig) -> Self {
            let mut harness = Self::with_config(config);
            harness.showroom.start(&mut harness.factory).expect("start");
            harness
        }

        fn frame(&mut self) {
            self.now += FRAME;
            self.showroom.tick(self.now, &self.input, &mut self.factory);
            self.input.begin_frame();
        }

        fn frames_for(&mut self, duration: Duration) {
            let count = duration.as_millis() / FRAME.as_millis() + 2;
            for _ in 0..count {
                self.frame();
            }
        }

        fn point_at_ndc(&mut self, ndc: Vec2) {
            let px = Vec2::new(
                (ndc.x + 1.0) / 2.0 * WIDTH as f32,
                (1.0 - ndc.y) / 2.0 * HEIGHT as f32,
            );
            self.input.move_pointer(px);
            self.input.begin_frame();
        }

        fn click(&mut self) {
            self.input.press_button(MouseButton::Left, self.now);
            self.input.release_button(MouseButton::Left, self.now);
        }

        fn tap(&mut self, key: KeyCode) {
            self.input.press_key(key);
            self.frame();
            self.input.release_key(key);
        }

        fn camera(&self, id: SceneId) -> Camera {
            self.showroom.registry().get(id).expect("scene").camera
        }
    }

    fn ndc_of(camera: &Camera, point: Vec3) -> Vec2 {
        let clip = camera.view_projection() * point.extend(1.0);
        clip.xy() / clip.w
    }

    #[test]
    fn loading_skips_frame_logic() {
        let mut harness = Harness::new();
        harness.showroom.on_progress(2, 10);
        harness.frame();
        assert_eq!(harness.showroom.phase(), &Phase::Loading { loaded: 2, total: 10 });
        assert!(harness.showroom.messages().is_visible(LOADING_MESSAGE));
        assert_eq!(harness.factory.builds(), 0);
        assert!(harness.showroom.render_with(|_, _, _, _| ()).is_none());
    }

    #[test]
    fn failed_load_never_builds_scenes() {
        let mut harness = Harness::new();
        harness.showroom.on_load_failed("textures/texture1.png", "not found");
        assert!(harness.showroom.messages().is_visible(LOAD_ERROR_MESSAGE));
        assert!(!harness.showroom.messages().is_visible(LOADING_MESSAGE));
        assert!(harness.showroom.start(&mut harness.factory).is_err());
        assert_eq!(harness.factory.builds(), 0);
        assert_eq!(harness.showroom.registry().count(), 0);
    }

    #[test]
    fn start_builds_main_pipeline_and_plays_ambient() {
        let harness = Harness::ready();
        assert!(harness.showroom.is_ready());
        assert_eq!(harness.showroom.active(), Some(SceneId::MAIN));
        assert_eq!(harness.factory.builds(), 1);
        assert_eq!(harness.showroom.registry().count(), 4);
        assert!(!harness.showroom.messages().is_visible(LOADING_MESSAGE));
        assert_eq!(harness.showroom.audio().plays(), 1);
    }

    #[test]
    fn clicking_a_stand_in_the_main_hall_enters_its_scene() {
        let mut harness = Harness::ready();
        let camera = harness.camera(SceneId::MAIN);
        harness.point_at_ndc(ndc_of(&camera, Vec3::new(-3.0, 1.25, -1.0)));
        harness.click();
        harness.frame();

        assert!(matches!(
            harness.showroom.state(),
            Some(TransitionState::Transitioning {
                from: SceneId::MAIN,
                to: SceneId(2),
                ..
            })
        ));
        let context = harness.showroom.messages().get(SCENE_CONTEXT_MESSAGE).expect("context");
        assert_eq!(context.content, "Viewing Stand 2");

        let duration = harness.showroom.config().transition.duration();
        harness.frames_for(duration);
        assert_eq!(harness.showroom.state(), Some(TransitionState::Idle));
        assert_eq!(harness.showroom.active(), Some(SceneId(2)));
        assert!(matches!(
            harness.showroom.render_with(|output, _, _, _| matches!(output, LiveOutput::Direct(_))),
            Some(true)
        ));
    }

    #[test]
    fn switch_frame_animates_the_incoming_scene() {
        let mut harness = Harness::ready();
        let camera = harness.camera(SceneId::MAIN);
        harness.point_at_ndc(ndc_of(&camera, Vec3::new(-3.0, 1.25, -1.0)));
        harness.click();
        harness.frame();

        let controller = harness.showroom.controller().expect("controller");
        assert_eq!(controller.outgoing(), Some(SceneId::MAIN));
        let stand = &harness.showroom.registry().get(SceneId(2)).expect("scene").stands[0];
        assert!(stand.aura_scale().x > 0.0);
    }

    #[test]
    fn outgoing_parallax_camera_follows_pointer() {
        let mut config = ShowroomConfig::default();
        config.main_camera.mode = CameraMode::parallax();
        let mut harness = Harness::ready_with(config);
        harness.tap(KeyCode::Digit2);
        let controller = harness.showroom.controller().expect("controller");
        assert_eq!(controller.outgoing(), Some(SceneId::MAIN));

        harness.point_at_ndc(Vec2::new(0.8, 0.5));
        let before = harness.camera(SceneId::MAIN).position;
        harness.frame();
        assert!(harness.showroom.controller().expect("controller").is_transitioning());
        assert!(harness.camera(SceneId::MAIN).position.distance(before) > 1e-4);
    }

    #[test]
    fn clicking_empty_space_requests_nothing() {
        let mut harness = Harness::ready();
        harness.point_at_ndc(Vec2::new(0.0, 0.95));
        harness.click();
        harness.frame();

        assert_eq!(harness.showroom.state(), Some(TransitionState::Idle));
        assert!(harness.showroom.last_resolution().hovered.is_none());
        assert_eq!(
            harness.showroom.resolver().focus().target(),
            Vec3::new(0.0, 1.0, 0.0)
        );
    }

    #[test]
    fn digit_keys_switch_and_escape_returns_to_main() {
        let mut harness = Harness::ready();
        harness.tap(KeyCode::Digit3);
        assert_eq!(harness.showroom.active(), Some(SceneId(3)));
        let duration = harness.showroom.config().transition.duration();
        harness.frames_for(duration);
        assert!(harness.showroom.messages().is_visible(SCENE_CONTEXT_MESSAGE));

        harness.tap(KeyCode::Escape);
        assert_eq!(harness.showroom.active(), Some(SceneId::MAIN));
        assert!(!harness.showroom.messages().is_visible(SCENE_CONTEXT_MESSAGE));
        let notice = harness.showroom.messages().get(TRANSITION_MESSAGE).expect("notice");
        assert_eq!(notice.content, "Returning to Main Scene");

        harness.frames_for(duration);
        assert!(!harness.showroom.messages().is_visible(TRANSITION_MESSAGE));
    }

    #[test]
    fn second_request_during_transition_is_ignored() {
        let mut harness = Harness::ready();
        assert!(harness.showroom.request_scene(SceneId(2), &mut harness.factory).is_started());
        let outcome = harness.showroom.request_scene(SceneId(3), &mut harness.factory);
        assert!(!outcome.is_started());
        assert_eq!(harness.showroom.active(), Some(SceneId(2)));
        assert_eq!(
            harness.showroom.messages().get(SCENE_CONTEXT_MESSAGE).map(|m| m.content.as_str()),
            Some("Viewing Stand 2")
        );
    }

    #[test]
    fn resize_updates_every_scene_aspect() {
        let mut harness = Harness::ready();
        harness.showroom.resize(1000, 500, &mut harness.factory);
        for id in harness.showroom.registry().ids() {
            assert_eq!(harness.camera(id).aspect, 2.0);
        }
        // Minimised windows report zero and are ignored.
        harness.showroom.resize(0, 0, &mut harness.factory);
        assert_eq!(harness.camera(SceneId::MAIN).aspect, 2.0);
    }

    #[test]
    fn title_mirrors_latest_message() {
        let mut harness = Harness::new();
        let title = harness.showroom.config().window.title.clone();
        assert_eq!(harness.showroom.title(), format!("{title} - Loading"));
        harness.showroom.start(&mut harness.factory).expect("start");
        assert_eq!(harness.showroom.title(), title);
    }

    #[test]
    fn t_cycles_the_wipe_pattern() {
        let mut harness = Harness::ready();
        harness.tap(KeyCode::KeyT);
        let controller = harness.showroom.controller().expect("controller");
        assert_eq!(controller.pattern_override(), Some(0));
    }

    #[test]
    fn focus_distance_feeds_tunables() {
        let mut harness = Harness::ready();
        harness.frames_for(Duration::from_secs(2));
        let expected = harness.showroom.resolver().focus().distance();
        assert_eq!(harness.showroom.tunables().focus_distance, expected);
        assert!(expected < 0.0);
    }
}

//! The transition controller: which scene is live and how the wipe between
//! two scenes runs.

use std::time::Duration;

use log::{debug, info, warn};

use super::transition::{ActiveTransition, Easing};
use super::{SceneBundle, SceneId, SceneRegistry};
use crate::audio::AudioSink;
use crate::config::TransitionConfig;
use crate::error::{Result, VitrineError};

/// Builds the GPU-side objects the controller swaps between.
///
/// The controller never looks inside a pipeline or compositor; it only decides
/// when they are created, which one is live, and when they are dropped.
pub trait PipelineFactory {
    /// Renders one scene to an image.
    type Pipeline;
    /// Blends two pipeline outputs with a wipe pattern.
    type Compositor;

    fn build_pipeline(&mut self, scene: &SceneBundle) -> Self::Pipeline;

    /// Allocates a compositor sized to the current viewport.
    fn build_compositor(&mut self, pattern: usize) -> Self::Compositor;

    /// Records the viewport used for everything built from now on.
    fn set_viewport(&mut self, width: u32, height: u32);

    fn resize_pipeline(&mut self, pipeline: &mut Self::Pipeline, width: u32, height: u32);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionState {
    Idle,
    Transitioning {
        from: SceneId,
        to: SceneId,
        progress: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The requested scene is already active.
    SameScene,
    /// Another transition is still running.
    Busy,
    UnknownScene,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    Started { from: SceneId, to: SceneId },
    Rejected(RejectReason),
}

impl SwitchOutcome {
    pub fn is_started(self) -> bool {
        matches!(self, SwitchOutcome::Started { .. })
    }
}

/// A transition that finished during [`TransitionController::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completed {
    pub from: SceneId,
    pub to: SceneId,
}

/// What the renderer should draw this frame.
pub enum LiveOutput<'a, F: PipelineFactory> {
    Direct(&'a mut F::Pipeline),
    Composite {
        outgoing: &'a mut F::Pipeline,
        incoming: &'a mut F::Pipeline,
        compositor: &'a mut F::Compositor,
        progress: f32,
    },
}

struct InFlight<F: PipelineFactory> {
    transition: ActiveTransition,
    outgoing: F::Pipeline,
    incoming: F::Pipeline,
    compositor: F::Compositor,
    // Steady-state pipeline of the scene being left, dropped on completion.
    _retired: Option<F::Pipeline>,
}

/// Two-state machine: `Idle` shows one scene's pipeline directly,
/// `Transitioning` shows a compositor blending freshly built pipelines for the
/// outgoing and incoming scenes.
///
/// The active scene changes the moment a switch starts; only the picture
/// catches up over the transition's duration.
pub struct TransitionController<F: PipelineFactory> {
    active: SceneId,
    live: Option<F::Pipeline>,
    in_flight: Option<InFlight<F>>,
    duration: Duration,
    easing: Easing,
    pattern_count: usize,
    default_pattern: usize,
    pattern_override: Option<usize>,
}

impl<F: PipelineFactory> TransitionController<F> {
    /// Starts idle on the main scene.
    pub fn new(config: &TransitionConfig, registry: &SceneRegistry, factory: &mut F) -> Result<Self> {
        let main = registry
            .get(SceneId::MAIN)
            .ok_or_else(|| VitrineError::Config("registry has no main scene".to_string()))?;
        Ok(Self {
            active: SceneId::MAIN,
            live: Some(factory.build_pipeline(main)),
            in_flight: None,
            duration: config.duration(),
            easing: config.easing,
            pattern_count: config.patterns.len(),
            default_pattern: config.default_pattern,
            pattern_override: None,
        })
    }

    pub fn active(&self) -> SceneId {
        self.active
    }

    pub fn is_transitioning(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn state(&self) -> TransitionState {
        match &self.in_flight {
            None => TransitionState::Idle,
            Some(flight) => TransitionState::Transitioning {
                from: flight.transition.from,
                to: flight.transition.to,
                progress: flight.transition.progress(),
            },
        }
    }

    pub fn transition(&self) -> Option<&ActiveTransition> {
        self.in_flight.as_ref().map(|flight| &flight.transition)
    }

    /// Scene still fading out, if a transition is running.
    pub fn outgoing(&self) -> Option<SceneId> {
        self.transition().map(|t| t.from)
    }

    /// Wipe pattern used for a switch into `to`.
    ///
    /// An explicit override wins; otherwise scene `n` uses pattern `n + 1`
    /// while there are enough of them, and the rest share the default.
    pub fn pattern_for(&self, to: SceneId) -> usize {
        if let Some(pattern) = self.pattern_override {
            return pattern;
        }
        let own = to.0 as usize + 1;
        if own < self.pattern_count {
            own
        } else {
            self.default_pattern
        }
    }

    pub fn pattern_override(&self) -> Option<usize> {
        self.pattern_override
    }

    /// Steps the override through every pattern and back to automatic.
    pub fn cycle_pattern(&mut self) -> Option<usize> {
        self.pattern_override = match self.pattern_override {
            None if self.pattern_count > 0 => Some(0),
            Some(p) if p + 1 < self.pattern_count => Some(p + 1),
            _ => None,
        };
        self.pattern_override
    }

    /// Starts a switch to `to` unless one is running or `to` is already active.
    pub fn request_switch(
        &mut self,
        to: SceneId,
        registry: &mut SceneRegistry,
        factory: &mut F,
        audio: &mut dyn AudioSink,
    ) -> SwitchOutcome {
        if self.in_flight.is_some() {
            debug!("switch to {to} ignored, transition in progress");
            return SwitchOutcome::Rejected(RejectReason::Busy);
        }
        if to == self.active {
            debug!("switch to {to} ignored, already active");
            return SwitchOutcome::Rejected(RejectReason::SameScene);
        }

        let from = self.active;
        let (Some(from_scene), Some(to_scene)) = (registry.get(from), registry.get(to)) else {
            warn!("switch to unknown {to} ignored");
            return SwitchOutcome::Rejected(RejectReason::UnknownScene);
        };

        let outgoing = factory.build_pipeline(from_scene);
        let incoming = factory.build_pipeline(to_scene);
        let pattern = self.pattern_for(to);
        let compositor = factory.build_compositor(pattern);

        if let Some(outgoing_scene) = registry.get_mut(from) {
            outgoing_scene.release_stands(audio);
        }

        self.active = to;
        self.in_flight = Some(InFlight {
            transition: ActiveTransition::new(from, to, pattern, self.duration, self.easing),
            outgoing,
            incoming,
            compositor,
            _retired: self.live.take(),
        });
        info!("transition {from} -> {to} (pattern {pattern})");
        SwitchOutcome::Started { from, to }
    }

    /// Advances the running transition by `dt`.
    ///
    /// On completion every transition-only object is dropped and a fresh plain
    /// pipeline for the new scene becomes live.
    pub fn advance(&mut self, dt: Duration, registry: &SceneRegistry, factory: &mut F) -> Option<Completed> {
        let flight = self.in_flight.as_mut()?;
        if !flight.transition.update(dt) {
            return None;
        }

        let Some(scene) = registry.get(flight.transition.to) else {
            warn!("{} vanished mid-transition", flight.transition.to);
            return None;
        };
        let live = factory.build_pipeline(scene);
        let flight = self.in_flight.take()?;
        drop(flight.outgoing);
        drop(flight.incoming);
        drop(flight.compositor);
        self.live = Some(live);

        let completed = Completed {
            from: flight.transition.from,
            to: flight.transition.to,
        };
        info!("transition {} -> {} complete", completed.from, completed.to);
        Some(completed)
    }

    /// Follows a viewport change.
    ///
    /// Scene pipelines resize now. A running compositor keeps the size it was
    /// allocated with; the next one picks up the new viewport.
    pub fn resize(&mut self, width: u32, height: u32, factory: &mut F) {
        factory.set_viewport(width, height);
        if let Some(live) = self.live.as_mut() {
            factory.resize_pipeline(live, width, height);
        }
        if let Some(flight) = self.in_flight.as_mut() {
            factory.resize_pipeline(&mut flight.outgoing, width, height);
            factory.resize_pipeline(&mut flight.incoming, width, height);
        }
    }

    pub fn output(&mut self) -> Option<LiveOutput<'_, F>> {
        match self.in_flight.as_mut() {
            Some(flight) => Some(LiveOutput::Composite {
                progress: flight.transition.progress(),
                outgoing: &mut flight.outgoing,
                incoming: &mut flight.incoming,
                compositor: &mut flight.compositor,
            }),
            None => self.live.as_mut().map(LiveOutput::Direct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::config::ShowroomConfig;
    use crate::environment::EnvironmentCatalog;
    use crate::test_support::RecordingFactory;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn setup() -> (
        TransitionController<RecordingFactory>,
        SceneRegistry,
        RecordingFactory,
        RecordingAudio,
    ) {
        let config = ShowroomConfig::default();
        let registry =
            SceneRegistry::build(&config, &EnvironmentCatalog::standard()).expect("registry");
        let mut factory = RecordingFactory::new(800, 600);
        let controller =
            TransitionController::new(&config.transition, &registry, &mut factory).expect("controller");
        (controller, registry, factory, RecordingAudio::default())
    }

    fn run_to_completion(
        controller: &mut TransitionController<RecordingFactory>,
        registry: &SceneRegistry,
        factory: &mut RecordingFactory,
    ) -> (usize, Completed) {
        for frame in 1..=1000 {
            if let Some(done) = controller.advance(FRAME, registry, factory) {
                return (frame, done);
            }
        }
        panic!("transition never completed");
    }

    #[test]
    fn switch_then_complete() {
        let (mut controller, mut registry, mut factory, mut audio) = setup();
        assert_eq!(controller.state(), TransitionState::Idle);

        let outcome = controller.request_switch(SceneId(2), &mut registry, &mut factory, &mut audio);
        assert_eq!(
            outcome,
            SwitchOutcome::Started {
                from: SceneId(0),
                to: SceneId(2)
            }
        );
        assert_eq!(controller.active(), SceneId(2));
        assert!(matches!(
            controller.state(),
            TransitionState::Transitioning { from: SceneId(0), to: SceneId(2), .. }
        ));

        let (_, done) = run_to_completion(&mut controller, &registry, &mut factory);
        assert_eq!(done, Completed { from: SceneId(0), to: SceneId(2) });
        assert_eq!(controller.state(), TransitionState::Idle);
        assert_eq!(controller.active(), SceneId(2));
    }

    #[test]
    fn second_request_in_same_frame_is_rejected() {
        let (mut controller, mut registry, mut factory, mut audio) = setup();
        let first = controller.request_switch(SceneId(2), &mut registry, &mut factory, &mut audio);
        assert!(first.is_started());
        let before = controller.state();

        let second = controller.request_switch(SceneId(3), &mut registry, &mut factory, &mut audio);
        assert_eq!(second, SwitchOutcome::Rejected(RejectReason::Busy));
        assert_eq!(controller.state(), before);
        assert_eq!(controller.active(), SceneId(2));
    }

    #[test]
    fn switching_to_active_scene_is_a_no_op() {
        let (mut controller, mut registry, mut factory, mut audio) = setup();
        let builds_before = factory.log.borrow().len();
        for _ in 0..5 {
            let outcome =
                controller.request_switch(SceneId::MAIN, &mut registry, &mut factory, &mut audio);
            assert_eq!(outcome, SwitchOutcome::Rejected(RejectReason::SameScene));
        }
        assert_eq!(controller.state(), TransitionState::Idle);
        assert_eq!(factory.log.borrow().len(), builds_before);
    }

    #[test]
    fn unknown_scene_is_rejected() {
        let (mut controller, mut registry, mut factory, mut audio) = setup();
        let outcome = controller.request_switch(SceneId(42), &mut registry, &mut factory, &mut audio);
        assert_eq!(outcome, SwitchOutcome::Rejected(RejectReason::UnknownScene));
        assert_eq!(controller.active(), SceneId::MAIN);
    }

    #[test]
    fn progress_runs_zero_to_one_once_over_the_duration() {
        let (mut controller, mut registry, mut factory, mut audio) = setup();
        controller.request_switch(SceneId(1), &mut registry, &mut factory, &mut audio);

        let progress = |c: &TransitionController<RecordingFactory>| match c.state() {
            TransitionState::Transitioning { progress, .. } => Some(progress),
            TransitionState::Idle => None,
        };
        let mut last = progress(&controller).expect("transitioning");
        assert_eq!(last, 0.0);

        let mut frames = 0;
        loop {
            frames += 1;
            if controller.advance(FRAME, &registry, &mut factory).is_some() {
                break;
            }
            let now = progress(&controller).expect("still transitioning");
            assert!(now >= last);
            last = now;
        }
        // 1.2 s at 60 fps, within a frame either way.
        assert!((71..=73).contains(&frames), "took {frames} frames");
        assert!(controller.advance(FRAME, &registry, &mut factory).is_none());
    }

    #[test]
    fn completion_drops_every_transition_object() {
        let (mut controller, mut registry, mut factory, mut audio) = setup();
        // id 1 is the initial live pipeline
        controller.request_switch(SceneId(3), &mut registry, &mut factory, &mut audio);
        // ids 2, 3 are the transition pipelines, 4 the compositor
        for id in 1..=4 {
            assert!(!factory.dropped(id));
        }
        run_to_completion(&mut controller, &registry, &mut factory);
        for id in 1..=4 {
            assert!(factory.dropped(id), "object {id} still alive");
        }

        match controller.output() {
            Some(LiveOutput::Direct(pipeline)) => {
                assert_eq!(pipeline.id, 5);
                assert_eq!(pipeline.scene, Some(SceneId(3)));
            }
            _ => panic!("expected a direct pipeline"),
        }
    }

    #[test]
    fn switch_releases_outgoing_stands() {
        let (mut controller, mut registry, mut factory, mut audio) = setup();
        {
            let main = registry.get_mut(SceneId::MAIN).expect("main");
            main.stands[0].set_selected(true);
            main.stands[0].set_sound_playing(true);
        }
        controller.request_switch(SceneId(1), &mut registry, &mut factory, &mut audio);
        let main = registry.get(SceneId::MAIN).expect("main");
        assert!(main.stands.iter().all(|s| !s.is_selected() && !s.is_sound_playing()));
        assert_eq!(audio.stops(), 1);
    }

    #[test]
    fn resize_mid_transition_keeps_compositor_size() {
        let (mut controller, mut registry, mut factory, mut audio) = setup();
        controller.request_switch(SceneId(1), &mut registry, &mut factory, &mut audio);
        for _ in 0..10 {
            controller.advance(FRAME, &registry, &mut factory);
        }
        controller.resize(1024, 768, &mut factory);
        match controller.output() {
            Some(LiveOutput::Composite {
                outgoing,
                incoming,
                compositor,
                ..
            }) => {
                assert_eq!(compositor.size, (800, 600));
                assert_eq!(outgoing.size, (1024, 768));
                assert_eq!(incoming.size, (1024, 768));
            }
            _ => panic!("expected a composite output"),
        }

        run_to_completion(&mut controller, &registry, &mut factory);
        match controller.output() {
            Some(LiveOutput::Direct(pipeline)) => assert_eq!(pipeline.size, (1024, 768)),
            _ => panic!("expected a direct pipeline"),
        }

        controller.request_switch(SceneId(2), &mut registry, &mut factory, &mut audio);
        match controller.output() {
            Some(LiveOutput::Composite { compositor, .. }) => {
                assert_eq!(compositor.size, (1024, 768));
                assert_eq!(compositor.pattern, Some(3));
            }
            _ => panic!("expected a composite output"),
        }
    }

    #[test]
    fn pattern_follows_destination_then_default() {
        let (mut controller, ..) = setup();
        assert_eq!(controller.pattern_for(SceneId(0)), 1);
        assert_eq!(controller.pattern_for(SceneId(3)), 4);
        assert_eq!(controller.pattern_for(SceneId(5)), 0);
        assert_eq!(controller.pattern_for(SceneId(9)), 0);

        assert_eq!(controller.cycle_pattern(), Some(0));
        assert_eq!(controller.pattern_for(SceneId(3)), 0);
        for _ in 0..5 {
            controller.cycle_pattern();
        }
        assert_eq!(controller.pattern_override(), Some(5));
        assert_eq!(controller.cycle_pattern(), None);
    }
}

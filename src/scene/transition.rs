//! Transition timing: easing curves, the progress tween and the record of a
//! switch in flight.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SceneId;

/// Easing functions for smooth transitions.
///
/// These control the acceleration curve of transition animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant speed throughout.
    Linear,
    /// Start slow, accelerate.
    EaseIn,
    /// Start fast, decelerate.
    EaseOut,
    /// Start slow, speed up, then slow down.
    #[default]
    EaseInOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Animates a scalar from `from` to `to` over a fixed duration.
#[derive(Clone, Debug)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            easing,
        }
    }

    /// Moves the tween forward by `dt`. Elapsed time never passes the duration.
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
    }

    /// Linear completion in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn value(&self) -> f32 {
        let eased = self.easing.apply(self.fraction());
        self.from + (self.to - self.from) * eased
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// A switch between two scenes that has started and not yet completed.
#[derive(Clone, Debug)]
pub struct ActiveTransition {
    pub from: SceneId,
    pub to: SceneId,
    /// Index of the wipe pattern used for this switch.
    pub pattern: usize,
    tween: Tween,
}

impl ActiveTransition {
    pub fn new(from: SceneId, to: SceneId, pattern: usize, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            pattern,
            tween: Tween::new(0.0, 1.0, duration, easing),
        }
    }

    /// Blend progress: 0.0 shows only the outgoing scene, 1.0 only the incoming one.
    pub fn progress(&self) -> f32 {
        self.tween.value()
    }

    /// Advances the transition. Returns `true` once it has run its full duration.
    pub fn update(&mut self, dt: Duration) -> bool {
        self.tween.advance(dt);
        self.tween.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.tween.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_endpoints_are_fixed() {
        for easing in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(2.0), 1.0);
        }
    }

    #[test]
    fn tween_clamps_at_duration() {
        let mut tween = Tween::new(0.0, 1.0, Duration::from_millis(100), Easing::Linear);
        tween.advance(Duration::from_millis(50));
        assert!((tween.value() - 0.5).abs() < 1e-6);
        assert!(!tween.is_finished());
        tween.advance(Duration::from_millis(500));
        assert_eq!(tween.value(), 1.0);
        assert!(tween.is_finished());
    }

    #[test]
    fn zero_length_tween_is_already_done() {
        let tween = Tween::new(2.0, 4.0, Duration::ZERO, Easing::EaseInOut);
        assert!(tween.is_finished());
        assert_eq!(tween.value(), 4.0);
    }

    #[test]
    fn transition_progress_is_monotonic() {
        let mut transition = ActiveTransition::new(
            SceneId::MAIN,
            SceneId(1),
            0,
            Duration::from_millis(1200),
            Easing::EaseInOut,
        );
        let mut last = transition.progress();
        assert_eq!(last, 0.0);
        while !transition.update(Duration::from_micros(16_667)) {
            let progress = transition.progress();
            assert!(progress >= last);
            last = progress;
        }
        assert_eq!(transition.progress(), 1.0);
    }
}

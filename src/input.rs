//! Pointer and keyboard state collected from window events.
//!
//! [`Input`] accumulates winit events between frames. The frame driver reads a
//! [`PointerState`] from it each tick: the pointer in normalized device
//! coordinates plus a debounced click flag.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pointer snapshot consumed by the interactivity resolver.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    /// Pointer position in `[-1, 1]` on both axes, +Y up.
    pub ndc: Vec2,
    /// True for a short window after a quick press-release pair.
    pub clicked: bool,
}

/// Turns press/release pairs into a short-lived click flag.
///
/// A release within `window` of the matching press raises the flag for the
/// same `window`. Slower releases are drags and raise nothing. While the flag
/// is raised further clicks do not extend it.
#[derive(Clone, Debug)]
pub struct ClickDebouncer {
    window: Duration,
    pressed_at: Option<Instant>,
    clicked_until: Option<Instant>,
}

impl ClickDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pressed_at: None,
            clicked_until: None,
        }
    }

    pub fn press(&mut self, now: Instant) {
        self.pressed_at = Some(now);
    }

    pub fn release(&mut self, now: Instant) {
        let Some(pressed_at) = self.pressed_at.take() else {
            return;
        };
        if now.saturating_duration_since(pressed_at) < self.window && !self.is_clicked(now) {
            self.clicked_until = Some(now + self.window);
        }
    }

    pub fn is_clicked(&self, now: Instant) -> bool {
        self.clicked_until.is_some_and(|until| now < until)
    }
}

pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
    scroll_delta: Vec2,
    viewport: Vec2,
    click: ClickDebouncer,
}

impl Input {
    pub fn new(click_window: Duration) -> Self {
        Self {
            keys_down: HashSet::new(),
            keys_pressed: HashSet::new(),
            mouse_buttons_down: HashSet::new(),
            mouse_position: Vec2::ZERO,
            mouse_delta: Vec2::ZERO,
            scroll_delta: Vec2::ZERO,
            viewport: Vec2::ONE,
            click: ClickDebouncer::new(click_window),
        }
    }

    /// Clears per-frame deltas. Call after the frame has consumed them.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if !self.keys_down.contains(&key) {
                                self.keys_pressed.insert(key);
                            }
                            self.keys_down.insert(key);
                        }
                        ElementState::Released => {
                            self.keys_down.remove(&key);
                        }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_button(*button, Instant::now()),
                ElementState::Released => self.release_button(*button, Instant::now()),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_pointer(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    winit::event::MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    winit::event::MouseScrollDelta::PixelDelta(pos) => {
                        Vec2::new(pos.x as f32, pos.y as f32) / 120.0
                    }
                };
                self.scroll_delta += d;
            }
            WindowEvent::Resized(size) => self.set_viewport(size.width, size.height),
            _ => {}
        }
    }

    /// Moves the pointer to a position in physical pixels.
    pub fn move_pointer(&mut self, position: Vec2) {
        self.mouse_delta += position - self.mouse_position;
        self.mouse_position = position;
    }

    pub fn press_button(&mut self, button: MouseButton, now: Instant) {
        if button == MouseButton::Left {
            self.click.press(now);
        }
        self.mouse_buttons_down.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton, now: Instant) {
        if button == MouseButton::Left {
            self.click.release(now);
        }
        self.mouse_buttons_down.remove(&button);
    }

    pub fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }

    /// Pointer position in normalized device coordinates.
    pub fn pointer_ndc(&self) -> Vec2 {
        let ndc = Vec2::new(
            2.0 * self.mouse_position.x / self.viewport.x - 1.0,
            1.0 - 2.0 * self.mouse_position.y / self.viewport.y,
        );
        ndc.clamp(Vec2::NEG_ONE, Vec2::ONE)
    }

    pub fn pointer(&self, now: Instant) -> PointerState {
        PointerState {
            ndc: self.pointer_ndc(),
            clicked: self.click.is_clicked(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn quick_press_release_is_a_click() {
        let t0 = Instant::now();
        let mut click = ClickDebouncer::new(WINDOW);
        click.press(t0);
        click.release(t0 + Duration::from_millis(120));
        assert!(click.is_clicked(t0 + Duration::from_millis(121)));
        assert!(click.is_clicked(t0 + Duration::from_millis(419)));
        assert!(!click.is_clicked(t0 + Duration::from_millis(420)));
    }

    #[test]
    fn slow_release_is_a_drag() {
        let t0 = Instant::now();
        let mut click = ClickDebouncer::new(WINDOW);
        click.press(t0);
        click.release(t0 + Duration::from_millis(450));
        assert!(!click.is_clicked(t0 + Duration::from_millis(451)));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let t0 = Instant::now();
        let mut click = ClickDebouncer::new(WINDOW);
        click.release(t0);
        assert!(!click.is_clicked(t0));
    }

    #[test]
    fn second_click_does_not_extend_window() {
        let t0 = Instant::now();
        let mut click = ClickDebouncer::new(WINDOW);
        click.press(t0);
        click.release(t0 + Duration::from_millis(50));
        click.press(t0 + Duration::from_millis(100));
        click.release(t0 + Duration::from_millis(150));
        assert!(!click.is_clicked(t0 + Duration::from_millis(360)));
    }

    #[test]
    fn pointer_maps_to_ndc() {
        let mut input = Input::new(WINDOW);
        input.set_viewport(800, 600);
        input.move_pointer(Vec2::new(400.0, 300.0));
        assert!(input.pointer_ndc().abs_diff_eq(Vec2::ZERO, 1e-6));
        input.move_pointer(Vec2::new(0.0, 0.0));
        assert!(input.pointer_ndc().abs_diff_eq(Vec2::new(-1.0, 1.0), 1e-6));
        input.move_pointer(Vec2::new(800.0, 600.0));
        assert!(input.pointer_ndc().abs_diff_eq(Vec2::new(1.0, -1.0), 1e-6));
    }
}

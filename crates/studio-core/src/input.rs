//! Pointer and keyboard state shared by the tools.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer event in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position } => position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

/// Tracks buttons, keys and double-clicks between events.
///
/// Time is always passed in by the caller so that click timing can be
/// driven deterministically.
#[derive(Debug, Clone)]
pub struct InputState {
    pub pointer_position: Point,
    pressed_buttons: HashSet<MouseButton>,
    pub modifiers: Modifiers,
    pressed_keys: HashSet<String>,
    /// Start position of the current left-button drag.
    pub drag_start: Option<Point>,
    double_click_window: Duration,
    double_click_distance: f64,
    last_click: Option<(Instant, Point)>,
    double_click_detected: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(Duration::from_millis(300), 5.0)
    }
}

impl InputState {
    pub fn new(double_click_window: Duration, double_click_distance: f64) -> Self {
        Self {
            pointer_position: Point::ZERO,
            pressed_buttons: HashSet::new(),
            modifiers: Modifiers::default(),
            pressed_keys: HashSet::new(),
            drag_start: None,
            double_click_window,
            double_click_distance,
            last_click: None,
            double_click_detected: false,
        }
    }

    pub fn handle_pointer_event(&mut self, event: PointerEvent, now: Instant) {
        self.pointer_position = event.position();
        match event {
            PointerEvent::Down { position, button } => {
                self.pressed_buttons.insert(button);
                if button == MouseButton::Left {
                    self.detect_double_click(position, now);
                    self.drag_start = Some(position);
                }
            }
            PointerEvent::Up { button, .. } => {
                self.pressed_buttons.remove(&button);
                if button == MouseButton::Left {
                    self.drag_start = None;
                }
            }
            PointerEvent::Move { .. } => {}
        }
    }

    fn detect_double_click(&mut self, position: Point, now: Instant) {
        let is_double = self.last_click.is_some_and(|(time, last)| {
            now.saturating_duration_since(time) <= self.double_click_window
                && position.distance(last) <= self.double_click_distance
        });
        self.double_click_detected = is_double;
        // A detected double-click consumes both clicks so a third click
        // starts over.
        self.last_click = if is_double { None } else { Some((now, position)) };
    }

    pub fn handle_key_event(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Pressed(key) => {
                self.pressed_keys.insert(key);
            }
            KeyEvent::Released(key) => {
                self.pressed_keys.remove(&key);
            }
        }
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    /// Whether the latest left press completed a double-click.
    pub fn is_double_click(&self) -> bool {
        self.double_click_detected
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }

    pub fn drag_delta(&self) -> Option<Vec2> {
        self.drag_start.map(|start| self.pointer_position - start)
    }
}

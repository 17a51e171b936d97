//! Input normalization
//!
//! Raw pointer, touch and keyboard events are queued as they arrive and folded
//! into a single `TickInput` when the frame polls. Event arrival order never
//! leaks into simulation order.

use glam::Vec2;

/// Below this distance from the stick center the steer is neutral
const STICK_DEAD_ZONE: f32 = 1e-3;

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    /// Start / restart (Space, Enter)
    Action,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_dom(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "a" | "A" => Some(Key::Left),
            "ArrowRight" | "d" | "D" => Some(Key::Right),
            " " | "Enter" => Some(Key::Action),
            _ => None,
        }
    }
}

/// Raw events in surface coordinates (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,
    KeyDown(Key),
    KeyUp(Key),
    /// A start/restart button was pressed
    Action,
}

/// How pointer positions turn into a steer value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SteerControl {
    /// Horizontal position across the surface: left edge -1, right edge +1
    Surface { width: f32 },
    /// On-screen stick: horizontal offset from the center over the radius
    Stick { center: Vec2, radius: f32 },
}

/// Everything the simulation reads from input in one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Steering in [-1, 1], positive is right
    pub steer: f32,
    /// Start or restart was requested since the last poll
    pub action: bool,
}

/// Collects raw events and derives the polled input state
#[derive(Debug, Clone)]
pub struct InputNormalizer {
    control: SteerControl,
    /// Current pointer/touch position while held
    pointer: Option<Vec2>,
    left: bool,
    right: bool,
    action: bool,
}

impl InputNormalizer {
    pub fn new(control: SteerControl) -> Self {
        Self {
            control,
            pointer: None,
            left: false,
            right: false,
            action: false,
        }
    }

    /// Update the control geometry (canvas resize)
    pub fn set_control(&mut self, control: SteerControl) {
        self.control = control;
    }

    pub fn control(&self) -> SteerControl {
        self.control
    }

    pub fn handle(&mut self, event: RawInput) {
        match event {
            RawInput::PointerDown { x, y } | RawInput::TouchStart { x, y } => {
                self.pointer = Some(Vec2::new(x, y));
            }
            RawInput::PointerMove { x, y } | RawInput::TouchMove { x, y } => {
                // Moves without a press (hover) don't steer
                if self.pointer.is_some() {
                    self.pointer = Some(Vec2::new(x, y));
                }
            }
            RawInput::PointerUp | RawInput::TouchEnd => self.pointer = None,
            RawInput::KeyDown(Key::Left) => self.left = true,
            RawInput::KeyDown(Key::Right) => self.right = true,
            RawInput::KeyUp(Key::Left) => self.left = false,
            RawInput::KeyUp(Key::Right) => self.right = false,
            RawInput::KeyDown(Key::Action) | RawInput::Action => self.action = true,
            RawInput::KeyUp(Key::Action) => {}
        }
    }

    /// Drop held state (window blur) so no key stays stuck
    pub fn release_all(&mut self) {
        self.pointer = None;
        self.left = false;
        self.right = false;
    }

    /// Steering from a pointer position under the current control
    pub fn pointer_steer(&self, pos: Vec2) -> f32 {
        match self.control {
            SteerControl::Surface { width } => {
                if width <= 0.0 {
                    return 0.0;
                }
                ((pos.x / width) * 2.0 - 1.0).clamp(-1.0, 1.0)
            }
            SteerControl::Stick { center, radius } => {
                let offset = pos - center;
                let len = offset.length();
                if len < STICK_DEAD_ZONE || radius <= 0.0 {
                    return 0.0;
                }
                let dir = offset.normalize_or_zero();
                (dir.x * (len / radius).min(1.0)).clamp(-1.0, 1.0)
            }
        }
    }

    fn keyboard_steer(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    /// Read the input for this frame. One-shot actions are consumed.
    pub fn poll(&mut self) -> TickInput {
        let steer = match self.pointer {
            Some(pos) => self.pointer_steer(pos),
            None => self.keyboard_steer(),
        };
        let action = std::mem::take(&mut self.action);
        TickInput { steer, action }
    }
}

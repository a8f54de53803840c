//! Keyboard and mouse state, the per-frame event queue and the command map.
//!
//! Window callbacks never touch viewer state directly. They push an
//! [`InputEvent`] onto the [`EventQueue`], and the frame loop drains the queue
//! once per frame before anything is simulated or drawn.

use std::collections::{HashSet, VecDeque};

use glam::Vec2;
use winit::event::{DeviceEvent, ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// A raw input event recorded by the window callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Key { code: KeyCode, pressed: bool },
    /// Raw relative mouse motion in device units. Unbounded by the window edge.
    MouseMotion(Vec2),
    Resized { width: u32, height: u32 },
}

impl InputEvent {
    /// Translate a winit window event, ignoring the ones the viewer does not use.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => Some(Self::Key {
                    code,
                    pressed: event.state == ElementState::Pressed,
                }),
                PhysicalKey::Unidentified(_) => None,
            },
            WindowEvent::Resized(size) => Some(Self::Resized {
                width: size.width,
                height: size.height,
            }),
            _ => None,
        }
    }

    /// Translate a raw device event. Only mouse motion is used.
    pub fn from_device_event(event: &DeviceEvent) -> Option<Self> {
        match event {
            DeviceEvent::MouseMotion { delta: (dx, dy) } => {
                Some(Self::MouseMotion(Vec2::new(*dx as f32, *dy as f32)))
            }
            _ => None,
        }
    }
}

/// FIFO of input events, filled by callbacks and drained once per frame.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    /// Remove and yield every queued event in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Discrete user commands, triggered on key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    RenderSolid,
    RenderWireframe,
    RenderPoint,
    ToggleFog,
    ToggleTour,
    ToggleSnow,
    ToggleLantern,
    ToggleCampfire,
    ToggleSun,
    Quit,
}

impl Command {
    /// The command bound to a key, if any.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        Some(match key {
            KeyCode::Digit1 => Self::RenderSolid,
            KeyCode::Digit2 => Self::RenderWireframe,
            KeyCode::Digit3 => Self::RenderPoint,
            KeyCode::KeyF => Self::ToggleFog,
            KeyCode::KeyP => Self::ToggleTour,
            KeyCode::KeyN => Self::ToggleSnow,
            KeyCode::KeyL => Self::ToggleLantern,
            KeyCode::KeyC => Self::ToggleCampfire,
            KeyCode::KeyT => Self::ToggleSun,
            KeyCode::Escape => Self::Quit,
            _ => return None,
        })
    }
}

/// Held movement and object-rotation keys for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// Rotate the user-controlled object counterclockwise.
    pub rotate_ccw: bool,
    /// Rotate the user-controlled object clockwise.
    pub rotate_cw: bool,
}

/// Tracks which keys are held.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key transition. Returns true on a fresh press (not a repeat).
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        if pressed {
            self.keys_down.insert(key)
        } else {
            self.keys_down.remove(&key);
            false
        }
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Snapshot of the movement keys (W/S/A/D) and object rotation keys (Q/E).
    pub fn movement(&self) -> MovementInput {
        MovementInput {
            forward: self.key_down(KeyCode::KeyW),
            backward: self.key_down(KeyCode::KeyS),
            left: self.key_down(KeyCode::KeyA),
            right: self.key_down(KeyCode::KeyD),
            rotate_ccw: self.key_down(KeyCode::KeyQ),
            rotate_cw: self.key_down(KeyCode::KeyE),
        }
    }
}

/// Converts relative mouse motion into yaw/pitch offsets in degrees.
///
/// The cursor is grabbed, so motion arrives as raw deltas rather than window
/// positions. The first sample only marks the start of mouse-look and is
/// dropped, since some platforms report the warp into the grab as motion.
#[derive(Clone, Debug)]
pub struct MouseLook {
    started: bool,
    sensitivity: f32,
    pending: Vec2,
}

impl MouseLook {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            started: false,
            sensitivity,
            pending: Vec2::ZERO,
        }
    }

    /// Feed a motion delta. Offsets accumulate until [`take`](Self::take).
    pub fn moved(&mut self, delta: Vec2) {
        if !self.started {
            self.started = true;
            return;
        }
        // x: yaw grows to the right, y: device y grows downward, pitch grows upward
        self.pending.x += delta.x * self.sensitivity;
        self.pending.y -= delta.y * self.sensitivity;
    }

    /// Returns the accumulated (yaw, pitch) offset and resets it.
    pub fn take(&mut self) -> Vec2 {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_mouse_sample_is_only_a_baseline() {
        let mut look = MouseLook::new(0.1);
        look.moved(Vec2::new(400.0, 300.0));
        assert_eq!(look.take(), Vec2::ZERO);

        look.moved(Vec2::new(10.0, -10.0));
        let offset = look.take();
        assert!((offset.x - 1.0).abs() < 1e-6);
        assert!((offset.y - 1.0).abs() < 1e-6);
        assert_eq!(look.take(), Vec2::ZERO);
    }

    #[test]
    fn repeated_motion_in_one_direction_never_saturates() {
        let mut look = MouseLook::new(0.1);
        look.moved(Vec2::ZERO);
        let mut yaw = 0.0;
        for _ in 0..500 {
            look.moved(Vec2::new(20.0, 0.0));
            yaw += look.take().x;
        }
        assert!((yaw - 1000.0).abs() < 1e-2);
    }

    #[test]
    fn device_motion_becomes_a_look_event() {
        let event = DeviceEvent::MouseMotion { delta: (3.0, -2.0) };
        assert_eq!(
            InputEvent::from_device_event(&event),
            Some(InputEvent::MouseMotion(Vec2::new(3.0, -2.0)))
        );
        assert_eq!(
            InputEvent::from_device_event(&DeviceEvent::Added),
            None
        );
    }

    #[test]
    fn key_repeats_are_not_fresh_presses() {
        let mut input = Input::new();
        assert!(input.set_key(KeyCode::KeyW, true));
        assert!(!input.set_key(KeyCode::KeyW, true));
        assert!(input.movement().forward);
        assert!(!input.set_key(KeyCode::KeyW, false));
        assert!(!input.movement().forward);
    }

    #[test]
    fn queue_drains_in_order() {
        let mut queue = EventQueue::new();
        queue.push(InputEvent::Key {
            code: KeyCode::KeyP,
            pressed: true,
        });
        queue.push(InputEvent::MouseMotion(Vec2::ONE));
        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], InputEvent::Key { code: KeyCode::KeyP, .. }));
        assert!(queue.is_empty());
    }

    #[test]
    fn command_bindings() {
        assert_eq!(Command::from_key(KeyCode::Digit2), Some(Command::RenderWireframe));
        assert_eq!(Command::from_key(KeyCode::KeyN), Some(Command::ToggleSnow));
        assert_eq!(Command::from_key(KeyCode::KeyW), None);
    }
}

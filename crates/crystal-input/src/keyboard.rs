//! Tick-coherent keyboard state.
//!
//! Key events arrive from winit between ticks. [`KeyboardState`] folds them
//! into held keys plus the transitions seen since the last
//! [`clear_transients`](KeyboardState::clear_transients), so a tap shorter
//! than a frame still registers exactly once.
//!
//! Physical key codes are used so the J/K bindings sit in the same place on
//! every layout.

use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::PhysicalKey;

/// Platform-independent key event.
#[derive(Debug, Clone, Copy)]
pub struct RawKeyEvent {
    pub key: PhysicalKey,
    pub state: ElementState,
    /// OS auto-repeat; never counts as a new press.
    pub repeat: bool,
}

/// Held keys and this tick's press/release edges.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: HashSet<PhysicalKey>,
    pressed_edges: HashSet<PhysicalKey>,
    released_edges: HashSet<PhysicalKey>,
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a winit [`KeyEvent`].
    pub fn process_event(&mut self, event: &KeyEvent) {
        self.process_raw(RawKeyEvent {
            key: event.physical_key,
            state: event.state,
            repeat: event.repeat,
        });
    }

    pub fn process_raw(&mut self, event: RawKeyEvent) {
        if event.repeat {
            return;
        }
        match event.state {
            ElementState::Pressed => {
                // A second Pressed without a Release in between is not a new edge.
                if self.held.insert(event.key) {
                    self.pressed_edges.insert(event.key);
                }
            }
            ElementState::Released => {
                if self.held.remove(&event.key) {
                    self.released_edges.insert(event.key);
                }
            }
        }
    }

    #[must_use]
    pub fn pressed(&self, key: PhysicalKey) -> bool {
        self.held.contains(&key)
    }

    /// Went down since the last tick.
    #[must_use]
    pub fn just_pressed(&self, key: PhysicalKey) -> bool {
        self.pressed_edges.contains(&key)
    }

    /// Went up since the last tick.
    #[must_use]
    pub fn just_released(&self, key: PhysicalKey) -> bool {
        self.released_edges.contains(&key)
    }

    /// Any of `keys` went down since the last tick.
    #[must_use]
    pub fn any_just_pressed(&self, keys: &[PhysicalKey]) -> bool {
        keys.iter().any(|k| self.pressed_edges.contains(k))
    }

    /// Drop the edges. Call once at the end of every tick.
    pub fn clear_transients(&mut self) {
        self.pressed_edges.clear();
        self.released_edges.clear();
    }

    /// Forget everything, e.g. when the window loses focus mid-press.
    pub fn reset(&mut self) {
        self.held.clear();
        self.clear_transients();
    }
}

//! Input for CrystalClock: physical keys and touch swipes folded into a
//! handful of edge-triggered clock actions, sampled once per tick.

pub mod action_map;
pub mod gesture;
pub mod keyboard;

pub use action_map::{ActionMap, ActionSet, BINDINGS_FILE_NAME, ClockAction, InputFrame};
pub use gesture::{Gesture, GestureTracker, MIN_SWIPE_DISTANCE};
pub use keyboard::{KeyboardState, RawKeyEvent};

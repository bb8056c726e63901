//! Vertical swipe detection for touch hosts.

use std::collections::HashMap;

use glam::Vec2;
use winit::event::{Touch, TouchPhase};

/// Minimum vertical travel for a swipe, in logical pixels.
pub const MIN_SWIPE_DISTANCE: f32 = 100.0;

/// A completed discrete gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    SwipeDown,
    SwipeUp,
}

/// Turns per-finger touch tracks into swipe gestures.
///
/// A gesture is classified when its finger lifts, so each swipe fires exactly
/// once. Cancelled touches are dropped.
#[derive(Debug, Default)]
pub struct GestureTracker {
    active: HashMap<u64, (Vec2, Vec2)>,
    pending: Vec<Gesture>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a winit touch event. `scale_factor` converts physical to logical px.
    pub fn process_touch(&mut self, touch: &Touch, scale_factor: f64) {
        let logical = touch.location.to_logical::<f32>(scale_factor);
        self.process_raw(touch.id, touch.phase, Vec2::new(logical.x, logical.y));
    }

    pub fn process_raw(&mut self, id: u64, phase: TouchPhase, position: Vec2) {
        match phase {
            TouchPhase::Started => {
                self.active.insert(id, (position, position));
            }
            TouchPhase::Moved => {
                if let Some(track) = self.active.get_mut(&id) {
                    track.1 = position;
                }
            }
            TouchPhase::Ended => {
                if let Some((start, _)) = self.active.remove(&id)
                    && let Some(gesture) = classify(position - start)
                {
                    tracing::debug!(?gesture, "Touch gesture recognised");
                    self.pending.push(gesture);
                }
            }
            TouchPhase::Cancelled => {
                self.active.remove(&id);
            }
        }
    }

    /// Gestures completed since the last drain.
    pub fn drain(&mut self) -> Vec<Gesture> {
        std::mem::take(&mut self.pending)
    }
}

/// Screen Y grows downward, so positive travel is a swipe down.
fn classify(travel: Vec2) -> Option<Gesture> {
    if travel.y.abs() < MIN_SWIPE_DISTANCE || travel.y.abs() <= travel.x.abs() {
        return None;
    }
    Some(if travel.y > 0.0 {
        Gesture::SwipeDown
    } else {
        Gesture::SwipeUp
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swipe(tracker: &mut GestureTracker, id: u64, from: Vec2, to: Vec2) {
        tracker.process_raw(id, TouchPhase::Started, from);
        tracker.process_raw(id, TouchPhase::Moved, (from + to) * 0.5);
        tracker.process_raw(id, TouchPhase::Ended, to);
    }

    #[test]
    fn test_swipe_down_and_up() {
        let mut tracker = GestureTracker::new();
        swipe(&mut tracker, 1, Vec2::new(200.0, 100.0), Vec2::new(210.0, 400.0));
        swipe(&mut tracker, 2, Vec2::new(200.0, 400.0), Vec2::new(190.0, 150.0));
        assert_eq!(tracker.drain(), vec![Gesture::SwipeDown, Gesture::SwipeUp]);
        assert!(tracker.drain().is_empty());
    }

    #[test]
    fn test_short_or_horizontal_travel_ignored() {
        let mut tracker = GestureTracker::new();
        swipe(&mut tracker, 1, Vec2::ZERO, Vec2::new(0.0, 99.0));
        swipe(&mut tracker, 2, Vec2::ZERO, Vec2::new(300.0, 150.0));
        assert!(tracker.drain().is_empty());
    }

    #[test]
    fn test_cancelled_touch_dropped() {
        let mut tracker = GestureTracker::new();
        tracker.process_raw(7, TouchPhase::Started, Vec2::ZERO);
        tracker.process_raw(7, TouchPhase::Cancelled, Vec2::new(0.0, 500.0));
        tracker.process_raw(7, TouchPhase::Ended, Vec2::new(0.0, 500.0));
        assert!(tracker.drain().is_empty());
    }
}

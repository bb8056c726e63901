//! Variable-step frame pacing.
//!
//! Every tick measures the wall time since the previous one, clamps it, and
//! hands the result to Update as the frame delta. The same delta drives the
//! fade and boundary-reset phases and the trail rewind step. Pacing towards
//! the target rate is done by the event loop sleeping until
//! [`FramePacer::next_deadline`].

use std::time::{Duration, Instant};
use tracing::warn;

/// Frame rate used when the config asks for zero.
pub const DEFAULT_TARGET_FPS: u32 = 60;

/// Longest delta handed to Update. A stall (debugger, suspended laptop)
/// becomes one slow frame instead of a jump through every animation.
pub const MAX_FRAME_TIME: f64 = 0.25;

fn clamp_frame_time(frame_time: f64) -> f64 {
    frame_time.clamp(0.0, MAX_FRAME_TIME)
}

fn target_interval(target_fps: u32) -> Duration {
    let fps = if target_fps == 0 {
        DEFAULT_TARGET_FPS
    } else {
        target_fps
    };
    Duration::from_secs_f64(1.0 / f64::from(fps))
}

pub struct FramePacer {
    previous_time: Instant,
    target_interval: Duration,
    total_time: f64,
    frame_count: u64,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        Self {
            previous_time: Instant::now(),
            target_interval: target_interval(target_fps),
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Start a frame and return its delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;

        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
        }
        let dt = clamp_frame_time(frame_time);
        self.total_time += dt;
        self.frame_count += 1;
        dt as f32
    }

    /// When the next frame should start.
    pub fn next_deadline(&self) -> Instant {
        self.previous_time + self.target_interval
    }

    pub fn target_interval(&self) -> Duration {
        self.target_interval
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Sum of all clamped deltas, seconds.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_FPS)
    }
}

/// A frame pacer that accepts explicit frame times instead of reading the
/// clock.
#[cfg(test)]
pub(crate) struct TestableFramePacer {
    total_time: f64,
    frame_count: u64,
}

#[cfg(test)]
impl TestableFramePacer {
    pub(crate) fn new() -> Self {
        Self {
            total_time: 0.0,
            frame_count: 0,
        }
    }

    pub(crate) fn tick(&mut self, frame_time: f64) -> f32 {
        let dt = clamp_frame_time(frame_time);
        self.total_time += dt;
        self.frame_count += 1;
        dt as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_interval_from_fps() {
        let pacer = FramePacer::new(60);
        let expected = 1.0 / 60.0;
        assert!((pacer.target_interval().as_secs_f64() - expected).abs() < 1e-9);
        assert_eq!(FramePacer::new(30).target_interval(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn test_zero_fps_uses_default() {
        assert_eq!(
            FramePacer::new(0).target_interval(),
            FramePacer::default().target_interval()
        );
    }

    #[test]
    fn test_delta_passes_through() {
        let mut pacer = TestableFramePacer::new();
        let dt = pacer.tick(1.0 / 60.0);
        assert!((dt - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_max_frame_time_clamp() {
        let mut pacer = TestableFramePacer::new();
        assert_eq!(pacer.tick(3.0), MAX_FRAME_TIME as f32);
        assert_eq!(pacer.tick(-1.0), 0.0);
    }

    #[test]
    fn test_total_time_is_sum_of_clamped_deltas() {
        let frame_times = [0.017, 0.015, 0.020, 1.5, 0.033, 0.008];
        let mut pacer = TestableFramePacer::new();
        for &ft in &frame_times {
            pacer.tick(ft);
        }
        let expected: f64 = frame_times.iter().map(|&t| clamp_frame_time(t)).sum();
        assert!((pacer.total_time - expected).abs() < 1e-12);
        assert_eq!(pacer.frame_count, frame_times.len() as u64);
    }

    #[test]
    fn test_real_pacer_counts_frames_and_moves_deadline() {
        let mut pacer = FramePacer::new(60);
        let before = pacer.next_deadline();
        let dt = pacer.tick();
        assert!((0.0..=MAX_FRAME_TIME as f32).contains(&dt));
        assert_eq!(pacer.frame_count(), 1);
        assert!(pacer.next_deadline() >= before);
    }
}

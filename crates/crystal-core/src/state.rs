//! Cross-frame animation state and the per-frame parameter snapshot.
//!
//! [`RenderCoreState`] is the single owner of everything that survives between
//! ticks. It is mutated once per Update and produces an immutable
//! [`FrameParams`] that the renderer reads.

use glam::{Vec3, Vec4};

use crate::clock::{RodInstance, rod_transforms};
use crate::curves::{
    clock_rotation_angle, fade_level, grey, hour_rotation_angle, prism_color, prism_scale,
    reset_prism_scale, reset_sphere_radius, sphere_radius, startup_level,
};
use crate::orbit::{OrbFrame, orb_frame};
use crate::scene::{FADE_TIME, PRISM_SCALE_TIME, SPHERE_SCALE_TIME, START_FADE_TIME};
use crate::time::{ElapsedFractions, WallClockSample, elapsed};

/// Frame delta assumed before the first real tick.
const INITIAL_FRAME_DT: f32 = 1.0 / 60.0;

/// A phase that grows by frame delta and wraps to 0 once it passes `duration`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseAccumulator {
    pub phase: f32,
    pub duration: f32,
}

impl PhaseAccumulator {
    pub const fn new(duration: f32) -> Self {
        Self {
            phase: 0.0,
            duration,
        }
    }

    /// A cycle is in flight.
    pub fn is_running(&self) -> bool {
        self.phase > 0.0
    }

    /// Fraction of the cycle completed, 0..=1.
    pub fn progress(&self) -> f32 {
        (self.phase / self.duration).clamp(0.0, 1.0)
    }

    /// Add `dt` seconds. Returns `true` when the cycle completed and wrapped to 0.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.phase += dt.max(0.0);
        if self.phase > self.duration {
            self.phase = 0.0;
            true
        } else {
            false
        }
    }
}

/// Inputs to one [`AnimationState::update`].
#[derive(Clone, Copy, Debug)]
pub struct UpdateInput {
    pub fractions: ElapsedFractions,
    /// Seconds since the controller was initialised.
    pub elapsed_since_start: f32,
    pub frame_dt: f32,
    /// The fade action fired this tick.
    pub toggle_fade: bool,
}

/// Radius, scale, tints and visibility carried across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationState {
    pub sphere_radius: f32,
    pub prism_scale: f32,
    pub radius_phase: PhaseAccumulator,
    pub scale_phase: PhaseAccumulator,
    pub fade_phase: PhaseAccumulator,
    pub show_clock: bool,
    pub fading: bool,
    pub clock_tint: Vec4,
    pub orb_tint: Vec4,
    pub fade_in: bool,
    pub startup_complete: bool,
}

impl AnimationState {
    pub fn new(fractions: &ElapsedFractions, fade_in: bool) -> Self {
        let start = if fade_in { grey(0.0) } else { grey(1.0) };
        Self {
            sphere_radius: sphere_radius(fractions.seconds_into_hour),
            prism_scale: prism_scale(fractions.seconds_into_hour),
            radius_phase: PhaseAccumulator::new(SPHERE_SCALE_TIME),
            scale_phase: PhaseAccumulator::new(PRISM_SCALE_TIME),
            fade_phase: PhaseAccumulator::new(FADE_TIME),
            show_clock: true,
            fading: false,
            clock_tint: start,
            orb_tint: start,
            fade_in,
            startup_complete: !fade_in,
        }
    }

    /// The top-of-hour reset is due or still running.
    pub fn new_hour(&self, fractions: &ElapsedFractions) -> bool {
        fractions.seconds_into_hour.round() as i64 == 0
            || self.radius_phase.is_running()
            || self.scale_phase.is_running()
    }

    pub fn update(&mut self, input: &UpdateInput) {
        let new_hour = self.new_hour(&input.fractions);
        self.fading = input.toggle_fade || self.fade_phase.is_running();

        if self.fade_in && input.elapsed_since_start < START_FADE_TIME {
            let tint = grey(startup_level(input.elapsed_since_start));
            self.clock_tint = tint;
            self.orb_tint = tint;
        } else {
            if !self.startup_complete {
                self.startup_complete = true;
                self.clock_tint = grey(1.0);
                self.orb_tint = grey(1.0);
                log::debug!("Startup fade-in complete");
            }
            if self.fading {
                self.clock_tint = grey(fade_level(self.fade_phase.phase, self.show_clock));
                if self.fade_phase.advance(input.frame_dt) {
                    self.show_clock = !self.show_clock;
                    self.clock_tint = grey(if self.show_clock { 1.0 } else { 0.0 });
                    log::debug!("Clock fade finished, show_clock={}", self.show_clock);
                }
            }
        }

        if new_hour {
            self.sphere_radius = reset_sphere_radius(self.radius_phase.phase);
            self.prism_scale = reset_prism_scale(self.scale_phase.phase);
            self.radius_phase.advance(input.frame_dt);
            self.scale_phase.advance(input.frame_dt);
        } else {
            self.sphere_radius = sphere_radius(input.fractions.seconds_into_hour);
            self.prism_scale = prism_scale(input.fractions.seconds_into_hour);
        }
    }
}

/// Per-tick input to [`RenderCoreState::update`].
#[derive(Clone, Copy, Debug)]
pub struct TickInput {
    pub sample: WallClockSample,
    pub elapsed_since_start: f32,
    pub frame_dt: f32,
    pub toggle_fade: bool,
    pub toggle_time_display: bool,
}

/// Everything the renderer needs for one frame. Read-only during Render.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameParams {
    pub sample: WallClockSample,
    pub fractions: ElapsedFractions,
    pub prism_color: Vec3,
    /// Degrees.
    pub minute_rotation: f32,
    /// Degrees.
    pub hour_rotation: f32,
    pub sphere_radius: f32,
    pub prism_scale: f32,
    pub clock_tint: Vec4,
    pub orb_tint: Vec4,
    pub show_clock: bool,
    pub fading: bool,
    pub show_time: bool,
    /// Seconds since start, fed to the tunnel shader.
    pub elapsed: f32,
    pub orbs: OrbFrame,
    pub rods: Vec<RodInstance>,
}

impl FrameParams {
    /// Tunnel and clock layers are drawn this frame.
    pub fn clock_visible(&self) -> bool {
        self.show_clock || self.fading
    }
}

/// Owner of all cross-frame state.
#[derive(Clone, Debug)]
pub struct RenderCoreState {
    pub animation: AnimationState,
    pub show_time: bool,
    frame: FrameParams,
}

impl RenderCoreState {
    pub fn new(sample: &WallClockSample, fade_in: bool, show_time: bool) -> Self {
        let fractions = elapsed(sample);
        let animation = AnimationState::new(&fractions, fade_in);
        let frame = build_frame(sample, &fractions, &animation, show_time, 0.0, INITIAL_FRAME_DT);
        Self {
            animation,
            show_time,
            frame,
        }
    }

    /// Run one Update and return the new frame snapshot.
    pub fn update(&mut self, input: TickInput) -> &FrameParams {
        let fractions = elapsed(&input.sample);
        if input.toggle_time_display {
            self.show_time = !self.show_time;
        }

        self.animation.update(&UpdateInput {
            fractions,
            elapsed_since_start: input.elapsed_since_start,
            frame_dt: input.frame_dt,
            toggle_fade: input.toggle_fade,
        });

        self.frame = build_frame(
            &input.sample,
            &fractions,
            &self.animation,
            self.show_time,
            input.elapsed_since_start,
            input.frame_dt,
        );
        &self.frame
    }

    /// The most recent snapshot.
    pub fn frame(&self) -> &FrameParams {
        &self.frame
    }

    pub fn set_show_time(&mut self, show_time: bool) {
        self.show_time = show_time;
        self.frame.show_time = show_time;
    }
}

fn build_frame(
    sample: &WallClockSample,
    fractions: &ElapsedFractions,
    animation: &AnimationState,
    show_time: bool,
    elapsed_since_start: f32,
    frame_dt: f32,
) -> FrameParams {
    let minute_rotation = clock_rotation_angle(fractions.seconds_into_minute);
    let hour_rotation = hour_rotation_angle(sample.hour as f32);
    FrameParams {
        sample: *sample,
        fractions: *fractions,
        prism_color: prism_color(fractions.seconds_into_minute),
        minute_rotation,
        hour_rotation,
        sphere_radius: animation.sphere_radius,
        prism_scale: animation.prism_scale,
        clock_tint: animation.clock_tint,
        orb_tint: animation.orb_tint,
        show_clock: animation.show_clock,
        fading: animation.fading,
        show_time,
        elapsed: elapsed_since_start,
        orbs: orb_frame(sample, fractions, animation.sphere_radius, frame_dt),
        rods: rod_transforms(minute_rotation, hour_rotation, animation.prism_scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MAX_SPHERE_RADIUS, MIN_SPHERE_RADIUS};
    use crate::time::sample_at;
    use chrono::{Duration, Local, TimeZone};

    const DT: f32 = 1.0 / 60.0;

    fn fractions(seconds_into_hour: f32) -> ElapsedFractions {
        ElapsedFractions {
            seconds_into_minute: seconds_into_hour % 60.0,
            seconds_into_hour,
            seconds_into_day: 10.0 * 3600.0 + seconds_into_hour,
        }
    }

    fn input(seconds_into_hour: f32, elapsed: f32) -> UpdateInput {
        UpdateInput {
            fractions: fractions(seconds_into_hour),
            elapsed_since_start: elapsed,
            frame_dt: DT,
            toggle_fade: false,
        }
    }

    #[test]
    fn test_phase_accumulator_wraps_past_duration() {
        let mut p = PhaseAccumulator::new(1.0);
        assert!(!p.is_running());
        assert!(!p.advance(0.6));
        assert!(p.is_running());
        assert!(!p.advance(0.4));
        assert!(p.advance(0.01));
        assert_eq!(p.phase, 0.0);
        p.advance(-1.0);
        assert_eq!(p.phase, 0.0);
    }

    #[test]
    fn test_initial_state_follows_hour() {
        let state = AnimationState::new(&fractions(1800.0), true);
        assert!((state.prism_scale - 0.5).abs() < 1e-5);
        assert_eq!(state.clock_tint, grey(0.0));
        let state = AnimationState::new(&fractions(1800.0), false);
        assert_eq!(state.clock_tint, grey(1.0));
        assert_eq!(state.orb_tint, grey(1.0));
    }

    #[test]
    fn test_boundary_reset_phase_increases_then_wraps() {
        let mut state = AnimationState::new(&fractions(3599.9), false);
        let mut t = 0.0_f32;
        let mut previous = 0.0_f32;
        let mut ticks = 0;

        // First tick at the top of the hour triggers the reset.
        state.update(&input(t, 10.0));
        assert!((state.sphere_radius - MAX_SPHERE_RADIUS).abs() < 1e-5);
        assert!(state.radius_phase.is_running());

        loop {
            t += DT;
            ticks += 1;
            let before = state.radius_phase.phase;
            state.update(&input(t, 10.0));
            let after = state.radius_phase.phase;
            if after == 0.0 {
                assert!(before + DT > SPHERE_SCALE_TIME);
                break;
            }
            assert!((after - before - DT).abs() < 1e-5);
            assert!(after > previous);
            assert!(after <= SPHERE_SCALE_TIME);
            assert!(state.sphere_radius >= MIN_SPHERE_RADIUS - 1e-4);
            assert!(state.sphere_radius <= MAX_SPHERE_RADIUS + 1e-4);
            previous = after;
            assert!(ticks < 200, "reset never finished");
        }

        // Rounded seconds are no longer zero, so normal growth resumes.
        t += DT;
        state.update(&input(t, 10.0));
        assert!(!state.new_hour(&fractions(t)));
        assert!((state.prism_scale - prism_scale(t)).abs() < 1e-5);
    }

    #[test]
    fn test_boundary_reset_continues_after_rounding_window() {
        let mut state = AnimationState::new(&fractions(0.0), false);
        state.update(&input(0.0, 10.0));
        // Rounded seconds are 1 now; the running phase keeps the reset going.
        state.update(&input(1.0, 10.0));
        assert!(state.radius_phase.is_running());
        assert!(state.prism_scale < 0.1);
    }

    #[test]
    fn test_normal_operation_tracks_hour() {
        let mut state = AnimationState::new(&fractions(100.0), false);
        state.update(&input(1800.0, 10.0));
        assert!((state.prism_scale - 0.5).abs() < 1e-5);
        assert!((state.sphere_radius - sphere_radius(1800.0)).abs() < 1e-5);
    }

    #[test]
    fn test_startup_fade_in() {
        let mut state = AnimationState::new(&fractions(600.0), true);
        state.update(&input(600.0, 2.0));
        assert!((state.clock_tint.x - 0.5).abs() < 1e-5);
        assert_eq!(state.clock_tint, state.orb_tint);
        assert!(!state.startup_complete);

        state.update(&input(602.0, 4.01));
        assert!(state.startup_complete);
        assert_eq!(state.clock_tint, grey(1.0));
        assert_eq!(state.orb_tint, grey(1.0));
    }

    #[test]
    fn test_fade_toggle_hides_then_shows_clock() {
        let mut state = AnimationState::new(&fractions(600.0), false);
        let mut step = UpdateInput {
            toggle_fade: true,
            ..input(600.0, 10.0)
        };
        state.update(&step);
        assert!(state.fading);
        assert!(state.show_clock);
        step.toggle_fade = false;

        let mut ticks = 0;
        while state.show_clock {
            state.update(&step);
            assert!(state.fading);
            assert!(state.clock_tint.x <= 1.0 && state.clock_tint.x >= 0.0);
            ticks += 1;
            assert!(ticks < 200);
        }
        assert_eq!(state.clock_tint, grey(0.0));
        assert_eq!(state.orb_tint, grey(1.0));

        state.update(&step);
        assert!(!state.fading);
        assert!(!state.show_clock);

        step.toggle_fade = true;
        state.update(&step);
        step.toggle_fade = false;
        while !state.show_clock {
            state.update(&step);
        }
        assert_eq!(state.clock_tint, grey(1.0));
    }

    #[test]
    fn test_fade_ignored_during_startup() {
        let mut state = AnimationState::new(&fractions(600.0), true);
        let step = UpdateInput {
            toggle_fade: true,
            ..input(600.0, 1.0)
        };
        state.update(&step);
        assert!(!state.fade_phase.is_running());
        assert!(state.show_clock);
    }

    #[test]
    fn test_render_core_state_builds_frame() {
        let sample = sample_at(Local.with_ymd_and_hms(2024, 5, 1, 15, 30, 30).unwrap());
        let mut core = RenderCoreState::new(&sample, false, true);
        let next = sample_at(sample.time_point + Duration::milliseconds(16));
        let frame = core.update(TickInput {
            sample: next,
            elapsed_since_start: 0.016,
            frame_dt: 0.016,
            toggle_fade: false,
            toggle_time_display: true,
        });
        assert!(!frame.show_time);
        assert!((frame.hour_rotation + 90.0).abs() < 1e-5);
        assert!((frame.minute_rotation - 180.0).abs() < 0.2);
        assert_eq!(frame.rods.len(), 13);
        assert_eq!(frame.orbs.trails.len(), 7);
        assert!(frame.clock_visible());
    }

    #[test]
    fn test_set_show_time_updates_snapshot() {
        let sample = sample_at(Local.with_ymd_and_hms(2024, 5, 1, 8, 0, 30).unwrap());
        let mut core = RenderCoreState::new(&sample, true, true);
        core.set_show_time(false);
        assert!(!core.frame().show_time);
        assert!(!core.show_time);
    }
}

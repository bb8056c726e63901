//! Time-to-animation mapping for CrystalClock.
//!
//! Everything here is pure or frame-local: wall-clock sampling, the curves that
//! turn elapsed seconds into angles/colours/scales, the orbiting light and trail
//! positions, the per-rod clock transforms, and the animation state machine that
//! carries fades and top-of-hour resets across frames.

pub mod clock;
pub mod curves;
pub mod orbit;
pub mod scene;
pub mod state;
pub mod time;

pub use clock::{RodInstance, rod_transforms};
pub use curves::{
    clock_rotation_angle, hour_rotation_angle, lerp, normalize, prism_color, prism_scale,
    sphere_radius,
};
pub use orbit::{
    OrbFrame, TrailSample, current_hour_angle, orb_frame, orb_position, rotation_matrix, trail,
};
pub use state::{
    AnimationState, FrameParams, PhaseAccumulator, RenderCoreState, TickInput, UpdateInput,
};
pub use time::{ElapsedFractions, WallClockSample, elapsed, sample, sample_at};

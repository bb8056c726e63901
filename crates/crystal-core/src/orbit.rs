//! Orbiting light positions and their replayed trails.
//!
//! Trails keep no history between frames. Each trail sample is computed by
//! rewinding the wall clock in frame-sized steps and re-running the same
//! rotation function, so the tail follows the exact path the orb took.

use glam::{Mat4, Vec3};

use crate::curves::{hour_rotation_angle, lerp, normalize};
use crate::scene::{
    ANGLE_STEP, ORB_COUNT, TRAIL_SEGMENTS, TRAIL_START_ALPHA, TRAIL_WINDOW, X_ANGLES, X_SPEED,
    Z_SPEED,
};
use crate::time::{ElapsedFractions, WallClockSample, elapsed};

/// Angular phase of orb `index` along its ring, radians.
pub fn orb_rotation_angle(seconds_into_minute: f32, index: usize) -> f32 {
    (seconds_into_minute * index as f32 * ANGLE_STEP).to_radians()
}

/// Base X-axis tilt, blended between two entries of [`X_ANGLES`] across the minute.
pub fn x_rotation_angle(fractions: &ElapsedFractions, minute: u32) -> f32 {
    let m = minute as usize;
    lerp(
        X_ANGLES[m % 3],
        X_ANGLES[(m + 1) % 3],
        normalize(fractions.seconds_into_minute, 0.0, 60.0),
    )
}

/// Z-axis placement of the whole orbit from the hour of day, radians.
pub fn current_hour_angle(fractions: &ElapsedFractions) -> f32 {
    let hours = (fractions.seconds_into_day / 3600.0).rem_euclid(24.0);
    (90.0 + hour_rotation_angle(hours)).to_radians()
}

/// Composite orbit rotation shared by every orb in a frame.
pub fn rotation_matrix(fractions: &ElapsedFractions, minute: u32, hour_angle: f32) -> Mat4 {
    let s = fractions.seconds_into_minute;
    let ax = X_SPEED * s + x_rotation_angle(fractions, minute);
    let az = Z_SPEED * s;
    Mat4::from_rotation_z(hour_angle) * Mat4::from_rotation_x(ax) * Mat4::from_rotation_z(az)
}

/// World position of orb `index`.
pub fn orb_position(seconds_into_minute: f32, radius: f32, index: usize, rotation: &Mat4) -> Vec3 {
    let angle = orb_rotation_angle(seconds_into_minute, index);
    rotation.transform_point3(Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0))
}

/// One replayed point of an orb trail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailSample {
    pub position: Vec3,
    pub alpha: f32,
}

/// Replay orb `index` back across [`TRAIL_WINDOW`], newest first.
///
/// Steps back by `frame_dt` per sample, widened so that no more than
/// [`TRAIL_SEGMENTS`] steps span the window. The last sample lies at or past
/// the window edge, so the tail always fades out fully. The hour angle stays
/// fixed so the tail never jumps across an hour mark.
pub fn trail(
    sample: &WallClockSample,
    radius: f32,
    hour_angle: f32,
    index: usize,
    frame_dt: f32,
) -> Vec<TrailSample> {
    let window_ms = (TRAIL_WINDOW * 1000.0).round() as u64;
    let min_step_ms = window_ms.div_ceil(TRAIL_SEGMENTS as u64);
    let step_ms = ((frame_dt * 1000.0).round() as u64).max(min_step_ms);
    let steps = window_ms.div_ceil(step_ms);
    (0..=steps)
        .map(|j| {
            let rewind_ms = (step_ms * j) as i64;
            let past = sample.rewind(rewind_ms);
            let fractions = elapsed(&past);
            let rotation = rotation_matrix(&fractions, past.minute, hour_angle);
            let position = orb_position(fractions.seconds_into_minute, radius, index, &rotation);
            let rewind = rewind_ms as f32 / 1000.0;
            TrailSample {
                position,
                alpha: (TRAIL_START_ALPHA * (1.0 - rewind / TRAIL_WINDOW)).max(0.0),
            }
        })
        .collect()
}

/// Orb positions and trails for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrbFrame {
    pub positions: [Vec3; ORB_COUNT],
    pub trails: Vec<Vec<TrailSample>>,
}

/// Compute every orb and trail for the current sample.
pub fn orb_frame(
    sample: &WallClockSample,
    fractions: &ElapsedFractions,
    radius: f32,
    frame_dt: f32,
) -> OrbFrame {
    let hour_angle = current_hour_angle(fractions);
    let rotation = rotation_matrix(fractions, sample.minute, hour_angle);

    let positions: [Vec3; ORB_COUNT] = std::array::from_fn(|i| {
        orb_position(fractions.seconds_into_minute, radius, i, &rotation)
    });
    let trails = (0..ORB_COUNT)
        .map(|i| trail(sample, radius, hour_angle, i, frame_dt))
        .collect();

    OrbFrame { positions, trails }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::sample_at;
    use chrono::{Local, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> WallClockSample {
        sample_at(Local.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap())
    }

    #[test]
    fn test_neighbour_orbs_differ_by_angle_step() {
        for s in [0.5_f32, 7.25, 30.0, 59.0] {
            for i in 0..ORB_COUNT - 1 {
                let diff = orb_rotation_angle(s, i + 1) - orb_rotation_angle(s, i);
                let expected = ANGLE_STEP.to_radians() * s;
                assert!((diff - expected).abs() < 1e-4, "s={s} i={i}");
            }
        }
    }

    #[test]
    fn test_orb_stays_on_radius() {
        let fractions = elapsed(&at(14, 22, 41));
        let rotation = rotation_matrix(&fractions, 22, current_hour_angle(&fractions));
        for i in 0..ORB_COUNT {
            let p = orb_position(fractions.seconds_into_minute, 3.2, i, &rotation);
            assert!((p.length() - 3.2).abs() < 1e-4);
        }
    }

    #[test]
    fn test_orb_zero_with_identity_rotation() {
        let p = orb_position(12.0, 2.5, 0, &Mat4::IDENTITY);
        assert!((p - Vec3::new(2.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_hour_angle_repeats_every_twelve_hours() {
        let morning = elapsed(&at(3, 0, 0));
        let evening = elapsed(&at(15, 0, 0));
        assert!((current_hour_angle(&morning) - current_hour_angle(&evening)).abs() < 1e-4);
        let noon = elapsed(&at(12, 0, 0));
        assert!((current_hour_angle(&noon) - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_x_rotation_blends_between_minutes() {
        let start = elapsed(&at(0, 4, 0));
        assert!((x_rotation_angle(&start, 4) - X_ANGLES[1]).abs() < 1e-6);
        let f = ElapsedFractions {
            seconds_into_minute: 60.0,
            ..start
        };
        assert!((x_rotation_angle(&f, 4) - X_ANGLES[2]).abs() < 1e-6);
    }

    #[test]
    fn test_trail_starts_at_orb_and_fades() {
        let sample = at(9, 15, 20);
        let fractions = elapsed(&sample);
        let frame = orb_frame(&sample, &fractions, 3.0, 1.0 / 60.0);
        assert_eq!(frame.trails.len(), ORB_COUNT);

        for (i, trail) in frame.trails.iter().enumerate() {
            assert!(trail.len() <= TRAIL_SEGMENTS + 1);
            assert!((trail[0].position - frame.positions[i]).length() < 1e-4);
            assert!((trail[0].alpha - TRAIL_START_ALPHA).abs() < 1e-6);
            for pair in trail.windows(2) {
                assert!(pair[1].alpha <= pair[0].alpha);
                assert!(pair[1].alpha >= 0.0);
            }
        }
    }

    #[test]
    fn test_trail_alpha_reaches_zero_for_long_frames() {
        let sample = at(9, 15, 20);
        // 50 ms steps: 50 steps reach the window edge.
        let t = trail(&sample, 3.0, 0.0, 2, 0.05);
        assert_eq!(t.len(), 51);
        assert_eq!(t.last().map(|s| s.alpha), Some(0.0));
        // Sample 50 sits exactly 2.5 s back.
        assert!(t[50].alpha.abs() < 1e-5);
        assert!(t[49].alpha > 0.0);
    }

    #[test]
    fn test_trail_fades_out_at_sixty_fps() {
        let sample = at(9, 15, 20);
        for dt in [1.0 / 60.0, 1.0 / 144.0, 0.25] {
            let t = trail(&sample, 3.0, 0.0, 4, dt);
            assert!(t.len() <= TRAIL_SEGMENTS + 1, "dt={dt}");
            assert!(t.last().unwrap().alpha <= 1e-6, "dt={dt}");
            assert!(t[t.len() - 2].alpha > 0.0, "dt={dt}");
        }
    }

    #[test]
    fn test_trail_step_never_zero() {
        let sample = at(9, 15, 20);
        let t = trail(&sample, 3.0, 0.0, 1, 0.0);
        // A zero delta still spans the window in the widest allowed steps.
        assert_eq!(t.len(), TRAIL_SEGMENTS + 1);
        for pair in t.windows(2) {
            assert!((pair[0].position - pair[1].position).length() > 0.0);
        }
    }

    #[test]
    fn test_trail_is_recomputed_identically() {
        let sample = at(23, 59, 59);
        assert_eq!(
            trail(&sample, 4.0, 0.3, 5, 0.016),
            trail(&sample, 4.0, 0.3, 5, 0.016)
        );
    }
}

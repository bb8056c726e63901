//! Pure curves mapping elapsed time to angles, colours and scales.
//!
//! Every function here is total and deterministic. Angles are in degrees unless
//! the name says otherwise.

use glam::{Vec3, Vec4};

use crate::scene::{
    FADE_TIME, MAX_SPHERE_RADIUS, MIN_SPHERE_RADIUS, PRISM_COLORS, PRISM_SCALE_TIME,
    SPHERE_SCALE_TIME, START_FADE_TIME,
};

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Map `value` from `[start, end]` onto `[0, 1]` (unclamped).
#[inline]
pub fn normalize(value: f32, start: f32, end: f32) -> f32 {
    (value - start) / (end - start)
}

/// Sweep of the whole clock: one full turn per minute.
pub fn clock_rotation_angle(seconds_into_minute: f32) -> f32 {
    lerp(0.0, 360.0, normalize(seconds_into_minute, 0.0, 60.0))
}

/// Hour hand placement: -30 degrees per hour on a 12-hour dial.
///
/// Fractional hours rotate continuously between the hour marks.
pub fn hour_rotation_angle(hour: f32) -> f32 {
    hour.rem_euclid(12.0) * -30.0
}

/// Rod colour: walks the 3-entry palette in 10 second steps, so the cycle
/// repeats every 30 seconds of the minute.
pub fn prism_color(seconds_into_minute: f32) -> Vec3 {
    let t = seconds_into_minute.max(0.0);
    let sub_cycle = t % 10.0;
    let index = (t / 10.0).floor() as usize % PRISM_COLORS.len();
    let next = (index + 1) % PRISM_COLORS.len();
    PRISM_COLORS[index].lerp(PRISM_COLORS[next], sub_cycle / 10.0)
}

/// Orb orbit radius: grows from the minimum to the maximum over the hour.
pub fn sphere_radius(seconds_into_hour: f32) -> f32 {
    lerp(
        MIN_SPHERE_RADIUS,
        MAX_SPHERE_RADIUS,
        normalize(seconds_into_hour, 0.0, 3600.0),
    )
}

/// Height of the "time left" rod: 1 at the top of the hour, 0 at its end.
pub fn prism_scale(seconds_into_hour: f32) -> f32 {
    1.0 - seconds_into_hour / 3600.0
}

/// Radius during the top-of-hour reset: snaps back from max to min.
pub fn reset_sphere_radius(phase: f32) -> f32 {
    lerp(
        MAX_SPHERE_RADIUS,
        MIN_SPHERE_RADIUS,
        normalize(phase, 0.0, SPHERE_SCALE_TIME),
    )
}

/// Rod scale during the top-of-hour reset: regrows from 0 to 1.
pub fn reset_prism_scale(phase: f32) -> f32 {
    lerp(0.0, 1.0, normalize(phase, 0.0, PRISM_SCALE_TIME))
}

/// Grey level of both layers during the startup fade-in.
pub fn startup_level(elapsed_since_start: f32) -> f32 {
    lerp(0.0, 1.0, elapsed_since_start / START_FADE_TIME).clamp(0.0, 1.0)
}

/// Grey level of the clock layer during a user fade.
///
/// Fades out when the clock is currently shown and in otherwise.
pub fn fade_level(phase: f32, showing: bool) -> f32 {
    let (from, to) = if showing { (1.0, 0.0) } else { (0.0, 1.0) };
    lerp(from, to, phase / FADE_TIME).clamp(0.0, 1.0)
}

/// Opaque grey tint with the given level.
#[inline]
pub fn grey(level: f32) -> Vec4 {
    Vec4::new(level, level, level, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_clock_rotation_monotonic_over_minute() {
        assert_eq!(clock_rotation_angle(0.0), 0.0);
        let mut previous = clock_rotation_angle(0.0);
        for i in 1..6000 {
            let angle = clock_rotation_angle(i as f32 * 0.01);
            assert!(angle >= previous);
            previous = angle;
        }
        assert!((clock_rotation_angle(59.999) - 360.0).abs() < 0.01);
        assert!(approx(clock_rotation_angle(60.0), 360.0));
    }

    #[test]
    fn test_hour_rotation_period_twelve() {
        for h in 0..12 {
            let h = h as f32;
            assert!(approx(hour_rotation_angle(h), hour_rotation_angle(h + 12.0)));
        }
        assert!(approx(hour_rotation_angle(11.5), hour_rotation_angle(23.5)));
        assert!(approx(hour_rotation_angle(3.0), -90.0));
        assert!(approx(hour_rotation_angle(0.0), 0.0));
    }

    #[test]
    fn test_prism_color_period_thirty() {
        for i in 0..300 {
            let t = i as f32 * 0.1;
            let a = prism_color(t);
            let b = prism_color(t + 30.0);
            assert!((a - b).length() < 1e-4, "mismatch at t={t}: {a} vs {b}");
        }
    }

    #[test]
    fn test_prism_color_hits_palette_at_sub_cycle_start() {
        assert!((prism_color(0.0) - PRISM_COLORS[0]).length() < 1e-6);
        assert!((prism_color(10.0) - PRISM_COLORS[1]).length() < 1e-6);
        assert!((prism_color(20.0) - PRISM_COLORS[2]).length() < 1e-6);
        assert!((prism_color(30.0) - PRISM_COLORS[0]).length() < 1e-6);
        let mid = PRISM_COLORS[0].lerp(PRISM_COLORS[1], 0.5);
        assert!((prism_color(5.0) - mid).length() < 1e-6);
    }

    #[test]
    fn test_prism_scale_bounds() {
        assert_eq!(prism_scale(0.0), 1.0);
        assert_eq!(prism_scale(3600.0), 0.0);
    }

    #[test]
    fn test_half_hour_scenario() {
        assert!(approx(clock_rotation_angle(30.0), 180.0));
        assert!(approx(hour_rotation_angle(15.0), -90.0));
        assert!(approx(prism_scale(1800.0), 0.5));
        assert!(approx(
            sphere_radius(1800.0),
            lerp(MIN_SPHERE_RADIUS, MAX_SPHERE_RADIUS, 0.5)
        ));
    }

    #[test]
    fn test_reset_curves_span_window() {
        assert_eq!(reset_sphere_radius(0.0), MAX_SPHERE_RADIUS);
        assert!(approx(reset_sphere_radius(SPHERE_SCALE_TIME), MIN_SPHERE_RADIUS));
        assert_eq!(reset_prism_scale(0.0), 0.0);
        assert!(approx(reset_prism_scale(PRISM_SCALE_TIME), 1.0));
    }

    #[test]
    fn test_fade_levels() {
        assert_eq!(startup_level(0.0), 0.0);
        assert!(approx(startup_level(2.0), 0.5));
        assert_eq!(startup_level(10.0), 1.0);
        assert_eq!(fade_level(0.0, true), 1.0);
        assert_eq!(fade_level(0.0, false), 0.0);
        assert!(approx(fade_level(1.0, true), 0.5));
    }
}

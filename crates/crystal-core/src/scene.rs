//! Fixed scene parameters: palette, timings, camera framing and lighting.

use glam::{Mat4, Vec3};

/// Base colours the crystal rods cycle through.
pub const PRISM_COLORS: [Vec3; 3] = [
    Vec3::new(0.04, 0.23, 0.46),
    Vec3::new(0.17, 0.03, 0.45),
    Vec3::new(0.03, 0.39, 0.45),
];

/// Number of orbiting light sources.
pub const ORB_COUNT: usize = 7;
/// Most rewind steps one trail takes across [`TRAIL_WINDOW`].
pub const TRAIL_SEGMENTS: usize = 120;
/// Seconds of synthetic rewind over which a trail fades out.
pub const TRAIL_WINDOW: f32 = 2.5;
/// Alpha of the trail sample closest to its orb.
pub const TRAIL_START_ALPHA: f32 = 0.7;

pub const MIN_SPHERE_RADIUS: f32 = 2.5;
pub const MAX_SPHERE_RADIUS: f32 = 4.5;

/// Duration of the top-of-hour radius reset, seconds.
pub const SPHERE_SCALE_TIME: f32 = 1.5;
/// Duration of the top-of-hour rod regrow, seconds.
pub const PRISM_SCALE_TIME: f32 = 1.5;
/// Duration of a user-triggered fade, seconds.
pub const FADE_TIME: f32 = 2.0;
/// Duration of the startup fade-in, seconds.
pub const START_FADE_TIME: f32 = 4.0;

/// Orbit X-axis spin, radians per second of the current minute.
pub const X_SPEED: f32 = std::f32::consts::FRAC_PI_2;
/// Orbit Z-axis spin, radians per second of the current minute.
pub const Z_SPEED: f32 = -std::f32::consts::PI;
/// Angular phase between neighbouring orbs, degrees per second.
pub const ANGLE_STEP: f32 = 360.0 / 60.0;
/// X-axis base angles, one per minute modulo 3.
pub const X_ANGLES: [f32; 3] = [std::f32::consts::FRAC_PI_2, std::f32::consts::PI, 0.0];

/// Vertical field of view used for landscape and square windows, degrees.
pub const FIXED_FOV: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;
pub const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, 30.0);
pub const CAMERA_TARGET: Vec3 = Vec3::new(0.0, 0.0, -1.0);
pub const CAMERA_UP: Vec3 = Vec3::Y;

/// Offset of each rod from the clock centre, before the rod rotations.
pub const CLOCK_POSITION: Vec3 = Vec3::new(0.0, 5.0, 0.0);
pub const ROD_COUNT: usize = 12;

pub const ORB_BILLBOARD_SIZE: f32 = 2.0;
pub const TRAIL_BILLBOARD_SIZE: f32 = 0.3;

pub const TUNNEL_RADIUS: f32 = 20.0;
pub const TUNNEL_LENGTH: f32 = 100.0;
pub const TUNNEL_SLICES: u32 = 30;

/// Phong material of the crystal rods (ambient/diffuse follow the prism colour).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrystalMaterial {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

/// Directional fill light shining into the screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

/// Point light with constant/linear/quadratic attenuation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

pub const CRYSTAL_MATERIAL: CrystalMaterial = CrystalMaterial {
    ambient: PRISM_COLORS[0],
    diffuse: PRISM_COLORS[0],
    specular: Vec3::ONE,
    shininess: 0.4,
};

pub const DIR_LIGHT: DirLight = DirLight {
    direction: Vec3::new(0.0, 0.0, -1.0),
    ambient: Vec3::splat(0.5),
    diffuse: Vec3::splat(0.8),
    specular: Vec3::splat(0.5),
};

/// Template for the orb lights; `position` is replaced every frame.
pub const ORB_LIGHT: PointLight = PointLight {
    position: Vec3::ZERO,
    ambient: Vec3::splat(0.5),
    diffuse: Vec3::splat(0.8),
    specular: Vec3::ONE,
    constant: 1.0,
    linear: 0.7,
    quadratic: 1.8,
};

/// Light carried at the camera to illuminate the tunnel walls.
pub const TUNNEL_LIGHT: PointLight = PointLight {
    position: CAMERA_POSITION,
    ambient: Vec3::splat(0.1),
    diffuse: Vec3::ONE,
    specular: Vec3::ZERO,
    constant: 1.0,
    linear: 0.007,
    quadratic: 0.0002,
};

/// Model matrix of the tunnel cylinder: laid along -Z, starting at the camera plane.
pub fn tunnel_model() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, 30.0))
        * Mat4::from_rotation_x(std::f32::consts::PI + std::f32::consts::FRAC_PI_2)
}

/// Normal matrix of the tunnel cylinder.
pub fn tunnel_normal() -> Mat4 {
    tunnel_model().transpose().inverse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_runs_along_negative_z_from_camera() {
        let model = tunnel_model();
        let base = model.transform_point3(Vec3::ZERO);
        let far = model.transform_point3(Vec3::new(0.0, TUNNEL_LENGTH, 0.0));
        assert!((base - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-4);
        assert!((far - Vec3::new(0.0, 0.0, -70.0)).length() < 1e-3);
    }

    #[test]
    fn test_tunnel_normal_matches_rotation() {
        // Pure rotation + translation: normals rotate like directions.
        let n = tunnel_normal().transform_vector3(Vec3::X);
        assert!((n - Vec3::X).length() < 1e-5);
        let radial = tunnel_normal().transform_vector3(Vec3::Z);
        let expected = tunnel_model().transform_vector3(Vec3::Z);
        assert!((radial - expected).length() < 1e-5);
    }

    #[test]
    fn test_palette_values() {
        assert_eq!(PRISM_COLORS.len(), 3);
        assert_eq!(CRYSTAL_MATERIAL.diffuse, Vec3::new(0.04, 0.23, 0.46));
    }
}

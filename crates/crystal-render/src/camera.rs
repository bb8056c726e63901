//! Fixed look-at camera with aspect-corrected vertical field of view.

use glam::{Mat4, Vec3};

use crystal_core::scene::{
    CAMERA_FAR, CAMERA_NEAR, CAMERA_POSITION, CAMERA_TARGET, CAMERA_UP, FIXED_FOV,
};

use crate::backend::CameraFrame;

/// Vertical field of view in degrees for a `width` x `height` window.
///
/// Portrait windows widen the vertical FOV so the horizontal framing matches
/// a square window; landscape and square windows use [`FIXED_FOV`].
pub fn vertical_fov(width: u32, height: u32) -> f32 {
    if height > width && width > 0 {
        let aspect = width as f32 / height as f32;
        (2.0 * ((FIXED_FOV.to_radians() * 0.5).tan() / aspect).atan()).to_degrees()
    } else {
        FIXED_FOV
    }
}

/// Perspective camera aimed at a fixed target.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view, degrees.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// The scene camera for a window of the given size.
    pub fn for_window(width: u32, height: u32) -> Self {
        let mut camera = Self::default();
        camera.resize(width, height);
        camera
    }

    /// Update aspect ratio and FOV after a resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect_ratio = width.max(1) as f32 / height.max(1) as f32;
        self.fov_y = vertical_fov(width, height);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Standard 0..1 depth range, near plane at 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize()
    }

    /// Up axis orthogonalised against the view direction.
    pub fn true_up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    pub fn frame(&self) -> CameraFrame {
        CameraFrame {
            view_proj: self.view_projection_matrix(),
            eye: self.position,
            right: self.right(),
            up: self.true_up(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: CAMERA_POSITION,
            target: CAMERA_TARGET,
            up: CAMERA_UP,
            fov_y: FIXED_FOV,
            aspect_ratio: 16.0 / 9.0,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_landscape_and_square_use_fixed_fov() {
        assert_eq!(vertical_fov(1920, 1080), FIXED_FOV);
        assert_eq!(vertical_fov(800, 800), FIXED_FOV);
    }

    #[test]
    fn test_portrait_widens_fov() {
        let fov = vertical_fov(1080, 1920);
        assert!(fov > FIXED_FOV);
        // Horizontal FOV of the portrait window equals the fixed FOV.
        let aspect = 1080.0_f32 / 1920.0;
        let horizontal = 2.0 * ((fov.to_radians() * 0.5).tan() * aspect).atan();
        assert!((horizontal.to_degrees() - FIXED_FOV).abs() < 1e-3);
    }

    #[test]
    fn test_camera_looks_down_neg_z() {
        let camera = Camera::default();
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-6);
        assert!((camera.right() - Vec3::X).length() < 1e-6);
        assert!((camera.true_up() - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_clock_centre_projects_to_screen_centre() {
        let camera = Camera::for_window(1280, 720);
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_resize_updates_aspect_and_fov() {
        let mut camera = Camera::for_window(1280, 720);
        camera.resize(720, 1280);
        assert!((camera.aspect_ratio - 0.5625).abs() < 1e-6);
        assert!(camera.fov_y > FIXED_FOV);
    }
}

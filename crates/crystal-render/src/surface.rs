//! Window-size bookkeeping that irons out platform resize quirks.
//!
//! Wayland can report a zero-size window before the compositor assigns one,
//! and scale-factor changes arrive separately from resizes on every platform.
//! [`SurfaceWrapper`] turns both into a single "physical size changed" event.

/// Surfaces never go below one pixel per side.
pub const MIN_SURFACE_DIMENSION: u32 = 1;

/// A change of the drawable size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceResize {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f64,
}

impl SurfaceResize {
    /// Size in logical pixels.
    pub fn logical(&self) -> (f64, f64) {
        (
            self.width as f64 / self.scale_factor,
            self.height as f64 / self.scale_factor,
        )
    }
}

#[derive(Clone, Debug)]
pub struct SurfaceWrapper {
    width: u32,
    height: u32,
    scale_factor: f64,
    /// Set once a real (non-zero) size has been seen.
    configured: bool,
}

impl SurfaceWrapper {
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            width: width.max(MIN_SURFACE_DIMENSION),
            height: height.max(MIN_SURFACE_DIMENSION),
            scale_factor,
            configured: width > 0 && height > 0,
        }
    }

    /// Record a resize; `None` when the clamped size did not change.
    pub fn handle_resize(&mut self, width: u32, height: u32) -> Option<SurfaceResize> {
        if width > 0 && height > 0 {
            self.configured = true;
        }
        let width = width.max(MIN_SURFACE_DIMENSION);
        let height = height.max(MIN_SURFACE_DIMENSION);
        if width == self.width && height == self.height {
            return None;
        }
        self.width = width;
        self.height = height;
        Some(self.current())
    }

    pub fn handle_scale_factor_changed(
        &mut self,
        scale_factor: f64,
        width: u32,
        height: u32,
    ) -> Option<SurfaceResize> {
        self.scale_factor = scale_factor;
        self.handle_resize(width, height)
    }

    pub fn current(&self) -> SurfaceResize {
        SurfaceResize {
            width: self.width,
            height: self.height,
            scale_factor: self.scale_factor,
        }
    }

    pub fn physical_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_surface_waits_for_real_size() {
        let mut surface = SurfaceWrapper::new(0, 0, 1.0);
        assert_eq!(surface.physical_size(), (1, 1));
        assert!(!surface.is_configured());

        let event = surface.handle_resize(1920, 1080).unwrap();
        assert_eq!((event.width, event.height), (1920, 1080));
        assert!(surface.is_configured());
    }

    #[test]
    fn test_same_size_produces_no_event() {
        let mut surface = SurfaceWrapper::new(1280, 720, 1.0);
        assert!(surface.handle_resize(1280, 720).is_none());
    }

    #[test]
    fn test_minimise_clamps_to_one_pixel() {
        let mut surface = SurfaceWrapper::new(800, 600, 1.0);
        let event = surface.handle_resize(0, 0).unwrap();
        assert_eq!((event.width, event.height), (1, 1));
        assert!(surface.is_configured());
    }

    #[test]
    fn test_scale_factor_change_reports_logical_size() {
        let mut surface = SurfaceWrapper::new(1920, 1080, 1.0);
        let event = surface.handle_scale_factor_changed(2.0, 3840, 2160).unwrap();
        let (lw, lh) = event.logical();
        assert!((lw - 1920.0).abs() < 1e-9 && (lh - 1080.0).abs() < 1e-9);
        assert_eq!(surface.scale_factor(), 2.0);
    }
}

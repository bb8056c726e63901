//! Window creation and event handling via winit.
//!
//! [`AppState`] implements winit's [`ApplicationHandler`]: it opens the window
//! described by the config, brings up the GPU, and drives the
//! [`ClockController`] from `RedrawRequested`, sleeping between frames with
//! `ControlFlow::WaitUntil`. Regaining focus re-reads `config.ron` and applies
//! any changed preferences.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crystal_config::Config;
use crystal_input::{ActionMap, GestureTracker, InputFrame, KeyboardState};
use crystal_render::{SurfaceResize, SurfaceWrapper, WgpuBackend, init_render_context_blocking};
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::monitor::MonitorHandle;
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::controller::{ClockController, ClockSettings, TickOutcome};
use crate::error::AppError;
use crate::frame_pacer::FramePacer;
use crate::host::HostAdapter;

/// Poll interval while the clock is hidden.
pub const HIDDEN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Window attributes for the configured flags at the settings' size.
///
/// Fullscreen takes the monitor's largest video mode when one is known;
/// borderless covers the monitor without changing its mode.
pub fn window_attributes(
    config: &Config,
    settings: &ClockSettings,
    monitor: Option<MonitorHandle>,
) -> WindowAttributes {
    let window = &config.window;
    let mut attrs = WindowAttributes::default()
        .with_title(window.title.clone())
        .with_inner_size(LogicalSize::new(
            f64::from(settings.width),
            f64::from(settings.height),
        ))
        .with_decorations(!(window.undecorated || window.borderless));

    if window.fullscreen {
        let mode = monitor.as_ref().and_then(|m| {
            m.video_modes()
                .max_by_key(|v| (v.size().width * v.size().height, v.refresh_rate_millihertz()))
        });
        let fullscreen = match mode {
            Some(mode) => Fullscreen::Exclusive(mode),
            None => Fullscreen::Borderless(monitor),
        };
        attrs = attrs.with_fullscreen(Some(fullscreen));
    } else if window.borderless {
        attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(monitor)));
    } else if let Some(monitor) = monitor {
        attrs = attrs.with_position(monitor.position());
    }
    attrs
}

pub struct AppState {
    pub config: Config,
    /// Where `config.ron` is re-read from on focus. `None` disables reloads.
    config_dir: Option<PathBuf>,
    host: Box<dyn HostAdapter>,
    /// The window handle, shared with the GPU surface.
    pub window: Option<Arc<Window>>,
    pub surface_wrapper: SurfaceWrapper,
    pub controller: ClockController<WgpuBackend>,
    pacer: FramePacer,
    keyboard: KeyboardState,
    gestures: GestureTracker,
    action_map: ActionMap,
    /// First fatal error, reported once the event loop returns.
    error: Option<AppError>,
}

impl AppState {
    pub fn new(config: Config, host: Box<dyn HostAdapter>) -> Self {
        let mut settings = ClockSettings::from_config(&config);
        host.configure(&mut settings);
        Self {
            surface_wrapper: SurfaceWrapper::new(settings.width, settings.height, 1.0),
            pacer: FramePacer::new(config.render.target_fps),
            controller: ClockController::new(settings),
            config,
            config_dir: None,
            host,
            window: None,
            keyboard: KeyboardState::new(),
            gestures: GestureTracker::new(),
            action_map: ActionMap::default(),
            error: None,
        }
    }

    /// Reload `config.ron` from `dir` whenever the window regains focus.
    pub fn with_config_dir(mut self, dir: PathBuf) -> Self {
        self.config_dir = Some(dir);
        self
    }

    pub fn with_bindings(mut self, bindings: ActionMap) -> Self {
        self.action_map = bindings;
        self
    }

    pub fn host_name(&self) -> &'static str {
        self.host.name()
    }

    /// Physical size as last reported by the window.
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_wrapper.physical_size()
    }

    pub fn logical_size(&self) -> (f64, f64) {
        self.surface_wrapper.current().logical()
    }

    #[instrument(skip_all)]
    fn create_window_and_clock(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let display = self.config.window.display as usize;
        let monitor = event_loop
            .available_monitors()
            .nth(display)
            .or_else(|| event_loop.primary_monitor());
        if let Some(monitor) = &monitor {
            let work_area = monitor.size().to_logical::<u32>(monitor.scale_factor());
            self.host.monitor_detected(work_area.width, work_area.height);
        }

        let mut settings = ClockSettings::from_config(&self.config);
        self.host.configure(&mut settings);

        let attrs = window_attributes(&self.config, &settings, monitor);
        let window = Arc::new(event_loop.create_window(attrs)?);

        let scale_factor = window.scale_factor();
        let inner = window.inner_size();
        self.surface_wrapper = SurfaceWrapper::new(inner.width, inner.height, scale_factor);
        let (width, height) = self.surface_size();
        settings.width = width;
        settings.height = height;
        settings.fullscreen = window.fullscreen().is_some();

        let context = init_render_context_blocking(window.clone(), self.config.window.vsync)?;
        self.controller = ClockController::new(settings);
        self.controller.initialize(WgpuBackend::new(context));
        self.pacer = FramePacer::new(self.config.render.target_fps);

        let (logical_width, logical_height) = self.logical_size();
        info!(
            "{} clock running at {width}x{height} ({logical_width:.0}x{logical_height:.0} logical, {:.1} ms/frame)",
            self.host.name(),
            self.pacer.target_interval().as_secs_f64() * 1000.0
        );
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// Re-read `config.ron` and hand changed preferences to the controller.
    ///
    /// Returns whether anything changed. Read or parse failures keep the
    /// current config.
    pub fn reload_config(&mut self) -> bool {
        let Some(dir) = &self.config_dir else {
            return false;
        };
        match self.config.reload(dir) {
            Ok(Some(config)) => {
                let mut settings = ClockSettings::from_config(&config);
                self.host.configure(&mut settings);
                self.controller.apply_preferences(&settings);
                self.config = config;
                info!("Applied reloaded preferences");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Keeping current config: {e}");
                false
            }
        }
    }

    fn apply_resize(&mut self, resize: SurfaceResize) {
        self.controller
            .set_window_resolution(resize.width, resize.height);
        if let Some(window) = &self.window {
            self.controller.set_fullscreen(window.fullscreen().is_some());
        }
        debug!(
            "Window resized to {}x{} (scale: {:.2})",
            resize.width, resize.height, resize.scale_factor
        );
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let actions = InputFrame::poll(&self.keyboard, &mut self.gestures, &self.action_map);
        self.keyboard.clear_transients();
        if actions.quit {
            info!("Quit requested");
            self.shutdown(event_loop);
            return;
        }

        if self.host.should_skip_tick() {
            let resume = Instant::now() + self.host.skip_backoff();
            event_loop.set_control_flow(ControlFlow::WaitUntil(resume));
            return;
        }

        let dt = self.pacer.tick();
        let next = match self.controller.tick(actions, dt) {
            TickOutcome::Rendered | TickOutcome::FrameDropped => self.pacer.next_deadline(),
            TickOutcome::Skipped => Instant::now() + HIDDEN_POLL_INTERVAL,
            TickOutcome::Uninitialized => return,
        };
        event_loop.set_control_flow(ControlFlow::WaitUntil(next));
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if self.controller.uninitialize().is_some() {
            info!(
                frames = self.pacer.frame_count(),
                seconds = self.pacer.total_time(),
                "Clock resources released"
            );
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn new_events(&mut self, _event_loop: &ActiveEventLoop, cause: StartCause) {
        if let StartCause::ResumeTimeReached { .. } = cause
            && let Some(window) = &self.window
        {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window_and_clock(event_loop) {
            error!("{e}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(new_size) => {
                if let Some(resize) = self
                    .surface_wrapper
                    .handle_resize(new_size.width, new_size.height)
                {
                    self.apply_resize(resize);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let Some(inner) = self.window.as_ref().map(|w| w.inner_size()) else {
                    return;
                };
                if let Some(resize) = self.surface_wrapper.handle_scale_factor_changed(
                    scale_factor,
                    inner.width,
                    inner.height,
                ) {
                    self.apply_resize(resize);
                }
            }
            WindowEvent::Occluded(occluded) => {
                self.host.occlusion_changed(occluded);
                self.controller.set_visibility(!occluded);
                if !occluded && let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::Focused(true) => {
                self.reload_config();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.keyboard.process_event(&event);
            }
            WindowEvent::Touch(touch) => {
                self.gestures
                    .process_touch(&touch, self.surface_wrapper.scale_factor());
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.controller.uninitialize();
    }
}

/// Run the clock until the window closes.
#[instrument(skip_all, fields(host = app.host_name()))]
pub fn run(mut app: AppState) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{DesktopHost, WallpaperHost};

    #[test]
    fn test_initial_state() {
        let state = AppState::new(Config::default(), Box::new(DesktopHost));
        assert!(state.window.is_none());
        assert!(!state.controller.is_initialized());
        assert_eq!(state.surface_size(), (1280, 720));
        assert_eq!(state.host_name(), "desktop");
    }

    #[test]
    fn test_host_shapes_initial_settings() {
        let state = AppState::new(Config::default(), Box::new(WallpaperHost::new()));
        assert!(!state.controller.settings().show_time);
    }

    #[test]
    fn test_config_size_used_before_window_exists() {
        let mut config = Config::default();
        config.window.width = 1024;
        config.window.height = 600;
        let state = AppState::new(config, Box::new(DesktopHost));
        assert_eq!(state.surface_size(), (1024, 600));
        let (lw, lh) = state.logical_size();
        assert!((lw - 1024.0).abs() < f64::EPSILON && (lh - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reload_applies_changed_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        let mut state = AppState::new(config, Box::new(DesktopHost))
            .with_config_dir(dir.path().to_path_buf());
        assert!(!state.reload_config());

        let mut edited = Config::default();
        edited.prefs.text_size = 42.0;
        edited.prefs.play_sound = false;
        edited.window.width = 333;
        edited.save(dir.path()).unwrap();

        assert!(state.reload_config());
        let settings = state.controller.settings();
        assert_eq!(settings.text_size, 42.0);
        assert!(!settings.play_sound);
        assert_eq!(settings.width, 1280);
        assert_eq!(state.config.prefs.text_size, 42.0);
    }

    #[test]
    fn test_reload_keeps_host_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut edited = Config::default();
        edited.prefs.text_size = 12.0;
        edited.save(dir.path()).unwrap();
        let mut state = AppState::new(Config::default(), Box::new(WallpaperHost::new()))
            .with_config_dir(dir.path().to_path_buf());

        assert!(state.reload_config());
        assert!(!state.controller.settings().show_time);
        assert_eq!(state.controller.settings().text_size, 12.0);
    }

    #[test]
    fn test_reload_survives_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(crystal_config::CONFIG_FILE_NAME), "(window: (").unwrap();
        let mut state = AppState::new(Config::default(), Box::new(DesktopHost))
            .with_config_dir(dir.path().to_path_buf());
        assert!(!state.reload_config());
        assert_eq!(state.config, Config::default());
    }

    #[test]
    fn test_reload_without_config_dir_is_noop() {
        let mut state = AppState::new(Config::default(), Box::new(DesktopHost));
        assert!(!state.reload_config());
    }

    #[test]
    fn test_custom_bindings_are_used() {
        use crystal_input::ClockAction;
        use winit::keyboard::{KeyCode, PhysicalKey};

        let mut bindings = ActionMap::default();
        bindings.set_bindings(ClockAction::Quit, &[KeyCode::KeyQ]);
        let state = AppState::new(Config::default(), Box::new(DesktopHost)).with_bindings(bindings);
        assert_eq!(
            state.action_map.keys(ClockAction::Quit),
            vec![PhysicalKey::Code(KeyCode::KeyQ)]
        );
    }

    #[test]
    fn test_window_attributes_for_every_mode() {
        let settings = ClockSettings::default();
        for (fullscreen, borderless, undecorated) in [
            (false, false, false),
            (true, false, false),
            (false, true, false),
            (false, false, true),
        ] {
            let mut config = Config::default();
            config.window.fullscreen = fullscreen;
            config.window.borderless = borderless;
            config.window.undecorated = undecorated;
            let attrs = window_attributes(&config, &settings, None);
            assert_eq!(attrs.title, "CrystalClock");
            assert_eq!(attrs.decorations, !(borderless || undecorated));
            assert_eq!(attrs.fullscreen.is_some(), fullscreen || borderless);
        }
    }
}

//! The clock lifecycle every host drives: initialize once, tick once per
//! frame (one Update then one Render), uninitialize on the way out.

use std::time::Instant;

use crystal_config::Config;
use crystal_core::state::{FrameParams, RenderCoreState, TickInput};
use crystal_core::time::{self, WallClockSample};
use crystal_input::ActionSet;
use crystal_render::{RenderBackend, SceneCompositor};
use tracing::{debug, info, warn};

/// Settings the core consumes. Hosts adjust them before [`ClockController::initialize`].
#[derive(Clone, Debug, PartialEq)]
pub struct ClockSettings {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub text_size: f32,
    pub fade_in: bool,
    pub play_sound: bool,
    pub show_time: bool,
    pub antialias: bool,
}

impl ClockSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.window.width,
            height: config.window.height,
            fullscreen: config.window.fullscreen,
            text_size: config.prefs.text_size,
            fade_in: config.prefs.fade_in,
            play_sound: config.prefs.play_sound,
            show_time: config.prefs.show_time,
            antialias: config.render.antialias,
        }
    }
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What a call to [`ClockController::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Updated, but the backend had no frame to draw into.
    FrameDropped,
    /// Hidden or occluded: nothing ran.
    Skipped,
    Uninitialized,
}

struct Running<B: RenderBackend> {
    compositor: SceneCompositor<B>,
    state: RenderCoreState,
    started: Instant,
}

pub struct ClockController<B: RenderBackend> {
    settings: ClockSettings,
    visible: bool,
    running: Option<Running<B>>,
}

impl<B: RenderBackend> ClockController<B> {
    pub fn new(settings: ClockSettings) -> Self {
        Self {
            settings,
            visible: true,
            running: None,
        }
    }

    /// Allocate the layers and seed the animation state from the current time.
    pub fn initialize(&mut self, backend: B) {
        if self.running.is_some() {
            warn!("Clock already initialized, ignoring");
            return;
        }
        let s = &self.settings;
        let mut compositor = SceneCompositor::new(backend, s.width, s.height);
        compositor.set_text_size(s.text_size);
        let state = RenderCoreState::new(&time::sample(), s.fade_in, s.show_time);
        if s.play_sound {
            info!("Ambient sound requested; audio output is not available in this build");
        }
        info!(
            width = s.width,
            height = s.height,
            fade_in = s.fade_in,
            show_time = s.show_time,
            "Clock initialized"
        );
        self.running = Some(Running {
            compositor,
            state,
            started: Instant::now(),
        });
    }

    /// Free every layer and return the backend. `None` if never initialized.
    pub fn uninitialize(&mut self) -> Option<B> {
        let running = self.running.take()?;
        info!("Clock uninitialized");
        Some(running.compositor.into_backend())
    }

    /// One Update followed by one Render, sampling the wall clock now.
    pub fn tick(&mut self, actions: ActionSet, frame_dt: f32) -> TickOutcome {
        let Some(running) = &self.running else {
            return TickOutcome::Uninitialized;
        };
        let elapsed = running.started.elapsed().as_secs_f32();
        self.tick_at(actions, frame_dt, time::sample(), elapsed)
    }

    /// [`tick`](Self::tick) with an explicit wall-clock sample and time since
    /// initialize.
    pub fn tick_at(
        &mut self,
        actions: ActionSet,
        frame_dt: f32,
        sample: WallClockSample,
        elapsed_since_start: f32,
    ) -> TickOutcome {
        if !self.visible {
            return TickOutcome::Skipped;
        }
        let Some(Running {
            compositor, state, ..
        }) = &mut self.running
        else {
            return TickOutcome::Uninitialized;
        };

        let (width, height) = (self.settings.width, self.settings.height);
        if compositor.size() != (width, height) {
            compositor.resize(width, height, self.settings.fullscreen);
        }

        let frame = state.update(TickInput {
            sample,
            elapsed_since_start,
            frame_dt,
            toggle_fade: actions.toggle_fade,
            toggle_time_display: actions.toggle_time_display,
        });
        self.settings.show_time = frame.show_time;

        if compositor.render(frame, self.settings.antialias) {
            TickOutcome::Rendered
        } else {
            TickOutcome::FrameDropped
        }
    }

    /// Record a new window size. The layers follow on the next visible,
    /// non-fullscreen tick.
    pub fn set_window_resolution(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!("Ignoring {width}x{height} window resolution");
            return;
        }
        self.settings.width = width;
        self.settings.height = height;
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.settings.fullscreen = fullscreen;
    }

    pub fn set_text_size(&mut self, px: f32) {
        self.settings.text_size = px;
        if let Some(running) = &mut self.running {
            running.compositor.set_text_size(px);
        }
    }

    /// Takes effect at the next initialize, or immediately while the startup
    /// fade is still running.
    pub fn set_fade_in(&mut self, fade: bool) {
        self.settings.fade_in = fade;
        if let Some(running) = &mut self.running {
            running.state.animation.fade_in = fade;
        }
    }

    pub fn set_play_sound(&mut self, play: bool) {
        if play != self.settings.play_sound {
            info!(play, "Ambient sound preference changed");
        }
        self.settings.play_sound = play;
    }

    pub fn set_show_time(&mut self, show: bool) {
        self.settings.show_time = show;
        if let Some(running) = &mut self.running {
            running.state.set_show_time(show);
        }
    }

    /// Take the preference half of `prefs`. Geometry stays with the window.
    pub fn apply_preferences(&mut self, prefs: &ClockSettings) {
        self.set_text_size(prefs.text_size);
        self.set_fade_in(prefs.fade_in);
        self.set_play_sound(prefs.play_sound);
        self.set_show_time(prefs.show_time);
        self.settings.antialias = prefs.antialias;
    }

    /// Hidden controllers skip ticks entirely, including resizes.
    pub fn set_visibility(&mut self, visible: bool) {
        if visible != self.visible {
            debug!(visible, "Clock visibility changed");
        }
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_initialized(&self) -> bool {
        self.running.is_some()
    }

    pub fn settings(&self) -> &ClockSettings {
        &self.settings
    }

    /// The most recent frame snapshot.
    pub fn frame(&self) -> Option<&FrameParams> {
        self.running.as_ref().map(|r| r.state.frame())
    }

    pub fn compositor(&self) -> Option<&SceneCompositor<B>> {
        self.running.as_ref().map(|r| &r.compositor)
    }
}

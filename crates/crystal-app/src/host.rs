//! Host shells around the one clock core.
//!
//! A desktop window, an animated wallpaper and an embedded (touch or browser)
//! view all run the same initialize/tick/uninitialize lifecycle. They only
//! differ in how settings are seeded and when ticks are skipped.

use std::time::Duration;

use crystal_config::{CliArgs, Config};

use crate::controller::ClockSettings;

/// How long the wallpaper host sleeps between checks while covered.
pub const OCCLUDED_BACKOFF: Duration = Duration::from_millis(100);

/// The host the command line asks for: `--embedded`, `--prefs-only`
/// (wallpaper) or a plain desktop window.
pub fn host_for(args: &CliArgs, config: &Config) -> Box<dyn HostAdapter> {
    if args.embedded {
        Box::new(EmbeddedHost::new(
            config.window.width,
            config.window.height,
            config.prefs.text_size,
        ))
    } else if args.prefs_only {
        Box::new(WallpaperHost::new())
    } else {
        Box::new(DesktopHost)
    }
}

pub trait HostAdapter {
    fn name(&self) -> &'static str;

    /// Adjust the settings before the clock is initialized.
    fn configure(&self, settings: &mut ClockSettings);

    /// Whether this tick should not run at all.
    fn should_skip_tick(&self) -> bool {
        false
    }

    /// Delay before checking again after a skipped tick.
    fn skip_backoff(&self) -> Duration {
        Duration::ZERO
    }

    /// The size of the monitor the clock is placed on, physical pixels.
    fn monitor_detected(&mut self, _width: u32, _height: u32) {}

    /// The window was covered or uncovered.
    fn occlusion_changed(&mut self, _occluded: bool) {}
}

/// A normal window. Settings come straight from the config.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopHost;

impl HostAdapter for DesktopHost {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn configure(&self, _settings: &mut ClockSettings) {}
}

/// Animated wallpaper filling a monitor's work area.
///
/// Only preference flags apply; geometry comes from the monitor. The time
/// overlay is off and ticks are skipped while the desktop is covered.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallpaperHost {
    work_area: Option<(u32, u32)>,
    occluded: bool,
}

impl WallpaperHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostAdapter for WallpaperHost {
    fn name(&self) -> &'static str {
        "wallpaper"
    }

    fn configure(&self, settings: &mut ClockSettings) {
        settings.show_time = false;
        if let Some((width, height)) = self.work_area {
            settings.width = width;
            settings.height = height;
        }
    }

    fn should_skip_tick(&self) -> bool {
        self.occluded
    }

    fn skip_backoff(&self) -> Duration {
        OCCLUDED_BACKOFF
    }

    fn monitor_detected(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.work_area = Some((width, height));
        }
    }

    fn occlusion_changed(&mut self, occluded: bool) {
        self.occluded = occluded;
    }
}

/// A clock embedded in a touch device or web page. The page decides the size
/// and text size and tells the clock when it scrolls out of view.
#[derive(Clone, Copy, Debug)]
pub struct EmbeddedHost {
    width: u32,
    height: u32,
    text_size: f32,
    page_visible: bool,
}

impl EmbeddedHost {
    pub fn new(width: u32, height: u32, text_size: f32) -> Self {
        Self {
            width,
            height,
            text_size,
            page_visible: true,
        }
    }

    pub fn set_page_visible(&mut self, visible: bool) {
        self.page_visible = visible;
    }
}

impl HostAdapter for EmbeddedHost {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn configure(&self, settings: &mut ClockSettings) {
        settings.fade_in = false;
        settings.show_time = false;
        settings.text_size = self.text_size;
        settings.width = self.width;
        settings.height = self.height;
    }

    fn should_skip_tick(&self) -> bool {
        !self.page_visible
    }

    fn skip_backoff(&self) -> Duration {
        OCCLUDED_BACKOFF
    }

    fn occlusion_changed(&mut self, occluded: bool) {
        self.set_page_visible(!occluded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_keeps_settings() {
        let mut settings = ClockSettings::default();
        let before = settings.clone();
        DesktopHost.configure(&mut settings);
        assert_eq!(settings, before);
        assert!(!DesktopHost.should_skip_tick());
    }

    #[test]
    fn test_wallpaper_uses_work_area_and_hides_time() {
        let mut host = WallpaperHost::new();
        host.monitor_detected(2560, 1400);
        let mut settings = ClockSettings::default();
        host.configure(&mut settings);
        assert_eq!((settings.width, settings.height), (2560, 1400));
        assert!(!settings.show_time);
        assert!(settings.fade_in);
    }

    #[test]
    fn test_wallpaper_without_monitor_keeps_size() {
        let host = WallpaperHost::new();
        let mut settings = ClockSettings::default();
        host.configure(&mut settings);
        assert_eq!((settings.width, settings.height), (1280, 720));
    }

    #[test]
    fn test_wallpaper_skips_while_occluded() {
        let mut host = WallpaperHost::new();
        assert!(!host.should_skip_tick());
        host.occlusion_changed(true);
        assert!(host.should_skip_tick());
        assert_eq!(host.skip_backoff(), OCCLUDED_BACKOFF);
        host.occlusion_changed(false);
        assert!(!host.should_skip_tick());
    }

    #[test]
    fn test_embedded_configuration() {
        let mut host = EmbeddedHost::new(390, 844, 18.0);
        let mut settings = ClockSettings::default();
        host.configure(&mut settings);
        assert!(!settings.fade_in);
        assert!(!settings.show_time);
        assert_eq!(settings.text_size, 18.0);
        assert_eq!((settings.width, settings.height), (390, 844));

        host.set_page_visible(false);
        assert!(host.should_skip_tick());
    }

    #[test]
    fn test_embedded_pauses_while_covered() {
        let mut host = EmbeddedHost::new(390, 844, 18.0);
        host.occlusion_changed(true);
        assert!(host.should_skip_tick());
        assert_eq!(host.skip_backoff(), OCCLUDED_BACKOFF);
        host.occlusion_changed(false);
        assert!(!host.should_skip_tick());
    }

    #[test]
    fn test_host_for_command_line() {
        let mut config = Config::default();
        config.window.width = 480;
        config.window.height = 320;
        config.prefs.text_size = 14.0;

        let embedded = CliArgs {
            embedded: true,
            ..Default::default()
        };
        let host = host_for(&embedded, &config);
        assert_eq!(host.name(), "embedded");
        let mut settings = ClockSettings::from_config(&config);
        host.configure(&mut settings);
        assert_eq!((settings.width, settings.height), (480, 320));
        assert_eq!(settings.text_size, 14.0);
        assert!(!settings.fade_in);

        let wallpaper = CliArgs {
            prefs_only: true,
            ..Default::default()
        };
        assert_eq!(host_for(&wallpaper, &config).name(), "wallpaper");
        assert_eq!(host_for(&CliArgs::default(), &config).name(), "desktop");
    }

    #[test]
    fn test_hosts_usable_as_trait_objects() {
        let hosts: Vec<Box<dyn HostAdapter>> = vec![
            Box::new(DesktopHost),
            Box::new(WallpaperHost::new()),
            Box::new(EmbeddedHost::new(800, 600, 20.0)),
        ];
        let names: Vec<_> = hosts.iter().map(|h| h.name()).collect();
        assert_eq!(names, ["desktop", "wallpaper", "embedded"]);
    }
}

//! Command-line argument parsing for CrystalClock.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::{Config, ConfigError};

/// File name of the legacy `key=value` config.
pub const LEGACY_INI_FILE: &str = "config.ini";

/// Directory beside the executable that holds the bundled legacy config.
pub const LEGACY_RESOURCE_DIR: &str = "resources";

/// CrystalClock command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "crystalclock", about = "Animated 3D crystal clock")]
pub struct CliArgs {
    /// Window width.
    #[arg(long, short = 'W')]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long, short = 'H')]
    pub height: Option<u32>,

    /// Monitor index to open the window on.
    #[arg(long, short = 'd')]
    pub display: Option<u32>,

    /// Borderless window covering the monitor.
    #[arg(long)]
    pub borderless: bool,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: bool,

    /// Remove window decorations.
    #[arg(long)]
    pub undecorated: bool,

    /// Skip the startup fade-in.
    #[arg(long)]
    pub nofadein: bool,

    /// Do not play the ambience track.
    #[arg(long)]
    pub nosound: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Legacy `key=value` file consulted when the command line is rejected.
    ///
    /// Without it, `resources/config.ini` beside the executable and then
    /// `config.ini` in the config directory are tried.
    #[arg(long)]
    pub ini: Option<PathBuf>,

    /// Accept preference flags only; the host decides the window geometry.
    #[arg(long)]
    pub prefs_only: bool,

    /// Run as an embedded view: no startup fade, no time text, paused while
    /// the view is hidden.
    #[arg(long, conflicts_with = "prefs_only")]
    pub embedded: bool,
}

impl CliArgs {
    /// Legacy files to try when the command line is rejected, in order.
    ///
    /// An explicit `--ini` is the only candidate.
    pub fn ini_candidates(&self, config_dir: &Path) -> Vec<PathBuf> {
        if let Some(ini) = &self.ini {
            return vec![ini.clone()];
        }
        let mut candidates = Vec::new();
        if let Ok(exe) = std::env::current_exe()
            && let Some(exe_dir) = exe.parent()
        {
            candidates.push(exe_dir.join(LEGACY_RESOURCE_DIR).join(LEGACY_INI_FILE));
        }
        candidates.push(config_dir.join(LEGACY_INI_FILE));
        candidates
    }

    /// Names of window-geometry flags present on the command line.
    fn window_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.width.is_some() {
            flags.push("--width");
        }
        if self.height.is_some() {
            flags.push("--height");
        }
        if self.display.is_some() {
            flags.push("--display");
        }
        if self.borderless {
            flags.push("--borderless");
        }
        if self.fullscreen {
            flags.push("--fullscreen");
        }
        if self.undecorated {
            flags.push("--undecorated");
        }
        flags
    }
}

impl Config {
    /// Validate the CLI overrides and return the resulting config.
    ///
    /// `self` is never modified; on error nothing of the command line is applied.
    pub fn resolve_cli(&self, args: &CliArgs) -> Result<Config, ConfigError> {
        if args.prefs_only
            && let Some(flag) = args.window_flags().first()
        {
            return Err(ConfigError::UnknownArgument((*flag).to_string()));
        }

        let mut resolved = self.clone();

        match (args.width, args.height) {
            (Some(w), Some(h)) => {
                if w == 0 {
                    return Err(invalid("--width", w));
                }
                if h == 0 {
                    return Err(invalid("--height", h));
                }
                resolved.window.width = w;
                resolved.window.height = h;
            }
            (None, None) => {}
            _ => return Err(ConfigError::MissingDimensions),
        }

        if let Some(display) = args.display {
            resolved.window.display = display;
        }
        if args.borderless {
            resolved.window.borderless = true;
        }
        if args.fullscreen {
            resolved.window.fullscreen = true;
        }
        if args.undecorated {
            resolved.window.undecorated = true;
        }
        if args.nofadein {
            resolved.prefs.fade_in = false;
        }
        if args.nosound {
            resolved.prefs.play_sound = false;
        }
        if let Some(ref level) = args.log_level {
            if level.trim().is_empty() {
                return Err(invalid("--log-level", level));
            }
            resolved.debug.log_level = level.clone();
        }

        Ok(resolved)
    }

    /// Resolve the command line, falling back to a legacy INI file when the
    /// command line is rejected.
    ///
    /// The file is the `--ini` path if one was given, otherwise the first
    /// existing entry of [`CliArgs::ini_candidates`]. Fails with
    /// [`ConfigError::Unreadable`] when the file is unusable too, or with the
    /// command-line error itself when there is no file to try.
    pub fn resolve_with_fallback(
        &self,
        args: &CliArgs,
        config_dir: &Path,
    ) -> Result<Config, ConfigError> {
        let cli_err = match self.resolve_cli(args) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };
        let explicit = args.ini.is_some();
        let Some(ini) = args
            .ini_candidates(config_dir)
            .into_iter()
            .find(|path| explicit || path.is_file())
        else {
            return Err(cli_err);
        };
        log::warn!("Command line rejected ({cli_err}), trying {}", ini.display());
        self.resolve_ini_file(&ini, args.prefs_only).map_err(|ini_err| {
            log::error!("Fallback config rejected: {ini_err}");
            ConfigError::Unreadable
        })
    }
}

fn invalid(flag: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}

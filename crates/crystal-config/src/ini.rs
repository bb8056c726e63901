//! Legacy `key=value` configuration files.
//!
//! Only flat pairs are understood. Section headers and `;`/`#` comment lines are
//! skipped, keys and values are trimmed, and surrounding quotes are stripped from
//! values. Keys carry the same names as the command-line flags.

use std::path::Path;

use crate::{Config, ConfigError};

const WINDOW_KEYS: [&str; 6] = [
    "width",
    "height",
    "display",
    "borderless",
    "fullscreen",
    "undecorated",
];

impl Config {
    /// Validate an INI document and return the resulting config.
    ///
    /// With `prefs_only`, window-geometry keys are rejected because the host
    /// supplies the geometry itself.
    pub fn resolve_ini_str(&self, text: &str, prefs_only: bool) -> Result<Config, ConfigError> {
        let mut resolved = self.clone();
        let mut width = None;
        let mut height = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(['[', ';', '#']) {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::UnknownArgument(line.to_string()));
            };
            let key = key.trim().to_ascii_lowercase();
            let value = unquote(value.trim());

            if prefs_only && WINDOW_KEYS.contains(&key.as_str()) {
                return Err(ConfigError::UnknownArgument(key));
            }

            match key.as_str() {
                "width" => width = Some(parse_dimension(&key, value)?),
                "height" => height = Some(parse_dimension(&key, value)?),
                "display" => resolved.window.display = parse_u32(&key, value)?,
                "borderless" => resolved.window.borderless = parse_flag(&key, value)?,
                "fullscreen" => resolved.window.fullscreen = parse_flag(&key, value)?,
                "undecorated" => resolved.window.undecorated = parse_flag(&key, value)?,
                "nofadein" => resolved.prefs.fade_in = !parse_flag(&key, value)?,
                "nosound" => resolved.prefs.play_sound = !parse_flag(&key, value)?,
                _ => return Err(ConfigError::UnknownArgument(key)),
            }
        }

        match (width, height) {
            (Some(w), Some(h)) => {
                resolved.window.width = w;
                resolved.window.height = h;
            }
            (None, None) => {}
            _ => return Err(ConfigError::MissingDimensions),
        }

        Ok(resolved)
    }

    /// Read and validate an INI file from disk.
    pub fn resolve_ini_file(&self, path: &Path, prefs_only: bool) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let resolved = self.resolve_ini_str(&text, prefs_only)?;
        log::info!("Applied legacy settings from {}", path.display());
        Ok(resolved)
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        flag: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid(key, value))
}

fn parse_dimension(key: &str, value: &str) -> Result<u32, ConfigError> {
    match parse_u32(key, value)? {
        0 => Err(invalid(key, value)),
        v => Ok(v),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

//! Configuration for CrystalClock.
//!
//! Settings persist to disk as a RON file and can be overridden from the command
//! line or from a legacy `key=value` INI file. Validation is atomic: a rejected
//! override leaves the previously loaded config untouched.

mod cli;
mod config;
mod error;
mod ini;

pub use cli::{CliArgs, LEGACY_INI_FILE, LEGACY_RESOURCE_DIR};
pub use config::{CONFIG_FILE_NAME, Config, DebugConfig, PrefsConfig, RenderConfig, WindowConfig};
pub use error::ConfigError;

//! The CrystalClock binary: a desktop window, a wallpaper with `--prefs-only`,
//! or an embedded view with `--embedded`.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use crystal_app::{AppState, PlatformDirs, host_for, run};
use crystal_config::{CliArgs, Config, ConfigError};
use crystal_input::ActionMap;

/// The stored config, or the defaults plus the error that replaced it.
/// Logging is not up yet, so the error is reported by the caller.
fn load_stored(config_dir: &Path) -> (Config, Option<ConfigError>) {
    match Config::load_or_create(config_dir) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve_and_create() {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to initialize platform directories: {e}");
            return ExitCode::FAILURE;
        }
    };
    let config_dir = args.config.clone().unwrap_or_else(|| dirs.config_dir.clone());
    let (stored, stored_err) = load_stored(&config_dir);

    // A valid command line already decides the log level.
    let log_config = stored.resolve_cli(&args).unwrap_or_else(|_| stored.clone());
    crystal_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&log_config));
    if let Some(e) = stored_err {
        tracing::warn!("Ignoring stored config: {e}");
    }

    let config = match stored.resolve_with_fallback(&args, &config_dir) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(config_dir = %config_dir.display(), "CrystalClock starting");

    let bindings = ActionMap::load_or_create(&config_dir);
    let host = host_for(&args, &config);
    let app = AppState::new(config, host)
        .with_config_dir(config_dir)
        .with_bindings(bindings);

    match run(app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

//! CrystalClock application: the clock lifecycle, the host shells that embed
//! it, frame pacing, and the winit window that drives it all.

pub mod controller;
pub mod error;
pub mod frame_pacer;
pub mod host;
pub mod platform;
pub mod window;

pub use controller::{ClockController, ClockSettings, TickOutcome};
pub use error::AppError;
pub use frame_pacer::FramePacer;
pub use host::{DesktopHost, EmbeddedHost, HostAdapter, WallpaperHost, host_for};
pub use platform::{PlatformDirs, PlatformError};
pub use window::{AppState, run};

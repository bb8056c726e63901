use crystal_config::ConfigError;
use crystal_render::RenderContextError;

use crate::platform::PlatformError;

/// Everything that can stop the application before or during the event loop.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    WindowCreation(#[from] winit::error::OsError),

    #[error("GPU initialization failed: {0}")]
    RenderInit(#[from] RenderContextError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message_is_kept() {
        let err = AppError::from(ConfigError::Unreadable);
        assert_eq!(err.to_string(), "could not read config");
    }

    #[test]
    fn test_render_error_is_prefixed() {
        let err = AppError::from(RenderContextError::NoAdapter);
        assert_eq!(
            err.to_string(),
            "GPU initialization failed: no compatible GPU adapter found"
        );
    }
}

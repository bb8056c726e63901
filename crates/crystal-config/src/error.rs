//! Configuration error types.

/// Errors that can occur when loading, saving, parsing, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    /// A flag or INI key that is not understood in this context.
    #[error("unknown argument: {0}")]
    UnknownArgument(String),

    /// A recognised flag or key carried a value that could not be accepted.
    #[error("invalid value passed to {flag}: {value:?}")]
    InvalidValue { flag: String, value: String },

    /// Only one of width/height was supplied.
    #[error("window dimensions missing")]
    MissingDimensions,

    /// Neither the command line nor the fallback file produced a usable config.
    #[error("could not read config")]
    Unreadable,
}

//! Configuration error types.

/// Errors from loading, saving or checking `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    /// A setting parsed but holds a value the viewer cannot use.
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// No config directory was given and the platform has none.
    #[error("no config directory available")]
    NoConfigDir,
}

use std::io;

/// Errors surfaced by the lifecycle and configuration surface.
///
/// None of these are ever produced by an individual log call: the logging
/// path either blocks (queue full) or silently degrades.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The configured threshold is outside `DEBUG..=CRITICAL`.
    #[error("invalid log level {0}: expected a value between DEBUG and CRITICAL")]
    InvalidLevel(i32),

    #[error("log writer is already running")]
    AlreadyStarted,

    #[error("log writer has been closed")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to install log bridge: {0}")]
    SetLogger(#[from] log::SetLoggerError),

    #[error("failed to install diagnostics subscriber: {0}")]
    Diagnostics(#[from] tracing::subscriber::SetGlobalDefaultError),
}

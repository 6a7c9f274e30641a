//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the console
//! loop so `main` can propagate with `?`. Tick-level failures never reach
//! here; the scheduler reports those through its outcome.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: vintner_core::config::ConfigError,
    },

    /// The configured start date is not a valid calendar position.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: vintner_core::clock::ClockError,
    },

    /// Reading console input failed.
    #[error("console error: {source}")]
    Console {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

//! Error types for the Refbox engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and while the match clock runs.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: refbox_core::config::ConfigError,
    },

    /// The persistence files could not be opened or recovered.
    #[error("persistence error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: refbox_core::persist::PersistError,
    },

    /// The match clock stopped after a fatal controller failure.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: refbox_core::runner::RunnerError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

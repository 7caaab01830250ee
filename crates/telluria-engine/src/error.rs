//! Engine-level errors and their exit codes.
//!
//! Exit code contract: 0 clean shutdown, 1 state corruption (store failure,
//! stale snapshot), 2 fatal provider misconfiguration (an oracle was
//! declared required but is unusable).

use telluria_core::config::ConfigError;
use telluria_core::{RunnerError, StoreError};

/// Errors that can end the engine process.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration failed to load or parse.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The state store failed or handed back a corrupt snapshot.
    #[error("state store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The simulation loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: RunnerError,
    },

    /// An oracle was declared required but no endpoint is usable.
    #[error("oracle required but not configured")]
    OracleRequired,
}

impl EngineError {
    /// The process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Store { .. } | Self::Runner { .. } => 1,
            Self::Config { .. } | Self::OracleRequired => 2,
        }
    }
}

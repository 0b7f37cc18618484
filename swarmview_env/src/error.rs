//! Error types for the SwarmView environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The control API refused or failed a command
    #[error("Control API error: {0}")]
    ControlError(String),
}

impl EnvError {
    /// Creates a control API error.
    pub fn control(msg: impl Into<String>) -> Self {
        Self::ControlError(msg.into())
    }
}

//! Error type for the simulation harness.

use swarmview_core::SceneError;
use swarmview_env::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    #[error("Encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Invalid distribution: {0}")]
    Distribution(String),
}

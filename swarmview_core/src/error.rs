//! Scene lifecycle errors.

use thiserror::Error;

use crate::render::RenderError;

#[derive(Error, Debug)]
pub enum SceneError {
    /// Surface acquisition failed during `initialize`. Fatal, never retried.
    #[error("Render surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Scene not initialized")]
    NotInitialized,

    #[error("Scene torn down")]
    TornDown,

    #[error(transparent)]
    Render(#[from] RenderError),
}

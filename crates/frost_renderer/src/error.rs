//! Error types for rendering.

use thiserror::Error;

use crate::accel::BuildError;

/// A frame that could not be traced. The accumulation state is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("no viewport set, call resize() before rendering")]
    NoViewport,

    #[error("render worker panicked: {message}")]
    WorkerPanicked { message: String },

    #[error("camera resolution {camera:?} does not match target {target:?}")]
    BufferMismatch {
        camera: (u32, u32),
        target: (u32, u32),
    },
}

/// Errors while setting up a renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to start render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("thread count must be at least 1")]
    NoThreads,

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type RenderResult<T> = Result<T, RenderError>;

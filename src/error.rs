//! Error types for the engine
//!
//! Errors are split by how the engine reacts to them: [`EngineError`] aborts
//! startup, [`UploadError`] and [`AssetError`] reject a single scene edit,
//! [`FrameError`] ends the current frame. Resize failures never surface as
//! errors; they are logged and the previous surface configuration is kept.

use std::path::PathBuf;

use thiserror::Error;

use crate::gfx::rendering::FrameState;

/// Fatal initialization failure. No engine is returned to the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to create presentation surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,

    #[error("failed to create surface resources: {0}")]
    SurfaceResources(String),

    #[error("failed to create render pipeline: {0}")]
    Pipeline(String),

    #[error("failed to create frame slot resources: {0}")]
    FrameSlots(String),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Geometry upload failure. The mesh being created is not added to the scene.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no vertices to upload")]
    Empty,

    #[error("vertex stream of {0} vertices exceeds the addressable buffer size")]
    TooLarge(usize),

    #[error("vertex buffer allocation failed: {0}")]
    Allocation(String),
}

/// Failure while waiting on GPU completion.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fence value {0} was never signalled")]
    NeverSignalled(u64),

    #[error("device poll failed: {0}")]
    Poll(String),
}

/// Failure in the middle of a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("surface ran out of memory while acquiring a back buffer")]
    OutOfMemory,

    #[error("illegal frame transition {from:?} -> {to:?}")]
    Transition { from: FrameState, to: FrameState },
}

/// Failure loading an asset from disk.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} contains no triangles")]
    NoGeometry(PathBuf),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

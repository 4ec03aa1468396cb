//! Error types for the showroom.
//!
//! Only unrecoverable conditions surface here. Benign situations such as a
//! rejected scene switch or a stand without an environment are logged instead.

use thiserror::Error;

/// Errors produced while configuring, loading or presenting the showroom.
#[derive(Debug, Error)]
pub enum VitrineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to load asset '{name}': {reason}")]
    AssetLoad { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create render surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to acquire frame: {0}")]
    Frame(#[from] wgpu::SurfaceError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Result type for showroom operations.
pub type Result<T> = std::result::Result<T, VitrineError>;

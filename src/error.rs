//! Error types for startup, configuration and asset loading.
//!
//! Everything that can fail does so before the first frame is drawn. Once the
//! frame loop is running, GPU problems are only logged (see
//! [`GpuContext::poll_errors`](crate::GpuContext::poll_errors)).

use std::path::PathBuf;

/// Errors that can occur when loading or parsing the viewer configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid RON for [`ViewerConfig`](crate::ViewerConfig).
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    /// A placement refers to a model or anchor that does not exist.
    #[error("invalid scene: {0}")]
    InvalidScene(String),
}

/// Errors raised while loading meshes, textures or cubemaps.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File format could not be determined from the extension.
    #[error("unknown model format '{0}'")]
    UnknownFormat(String),

    /// OBJ parsing failed.
    #[error("failed to load OBJ {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    /// STL parsing failed.
    #[error("failed to parse STL {path}: {message}")]
    Stl { path: PathBuf, message: String },

    /// An image (texture or cubemap face) could not be decoded.
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The six faces of a cubemap do not share one square size.
    #[error("cubemap faces must be square and equally sized, got {0}")]
    CubemapSize(String),
}

/// Top-level error for anything that prevents the viewer from starting.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    /// The event loop could not be created or exited abnormally.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The OS refused to create the window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// The surface reports no usable formats for this adapter.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,

    /// The GPU ran out of memory while acquiring a frame.
    #[error("GPU out of memory")]
    OutOfMemory,
}

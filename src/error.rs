//! Error types for renderer sessions and configuration.

use thiserror::Error;

use crate::config::RenderMode;

/// Failures that end a render session or prevent one from starting.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No GPU adapter could be found
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// The adapter refused to create a device
    #[error("request_device failed: {0}")]
    RequestDevice(String),

    /// Device memory allocation failed
    #[error("device out of memory while allocating {what}")]
    OutOfMemory { what: &'static str },

    /// Host memory allocation failed
    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    /// A buffer would exceed the device limits
    #[error("{what} needs {requested} bytes, device limit is {limit}")]
    BufferTooLarge { what: &'static str, requested: u64, limit: u64 },

    /// Zero-sized image
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Caller's output buffer does not match the image size
    #[error("output buffer holds {actual} pixels, expected {expected}")]
    OutputSize { expected: usize, actual: usize },

    /// `render` called before `init` or after `teardown`
    #[error("renderer is not initialized")]
    NotInitialized,

    /// The backend has no implementation of the requested mode
    #[error("{backend} backend does not support {mode:?} mode")]
    UnsupportedMode { backend: &'static str, mode: RenderMode },

    /// Copying the accumulator back to the host failed
    #[error("accumulator readback failed: {0}")]
    Readback(String),

    /// Image encoding or file output failed
    #[error("image output failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Invalid command-line overrides.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("unknown scene preset: {0}")]
    UnknownScene(String),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

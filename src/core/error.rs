//! Error types for the culler

use thiserror::Error;

/// Main error type for the culler
#[derive(Debug, Error)]
pub enum Error {
    /// A render pass was requested before the named state was set up
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Scene error: {0}")]
    Scene(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("OBJ parse error at line {line}: {message}")]
    Obj { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

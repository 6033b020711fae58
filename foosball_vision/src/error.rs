//! Error types for foosball_vision

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    /// A frame could not be read or decoded. The loop treats this as end of stream.
    #[error("Frame read error: {0}")]
    SourceRead(String),

    /// The region of interest is empty even after clamping to the frame.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, VisionError>;

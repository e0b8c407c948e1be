use thiserror::Error;

pub use crate::json::ParseError;

#[derive(Debug, Error)]
pub enum SpriteBoxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid project document: {0}")]
    InvalidDocument(String),
    #[error("Decoding error: {0}")]
    Decode(String),
    #[error("Encoding error: {0}")]
    Encode(String),
    #[error("Sprite not found: {0}")]
    SpriteNotFound(String),
    #[error("Composition not found: {0}")]
    CompositionNotFound(String),
}

pub type Result<T> = std::result::Result<T, SpriteBoxError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MomentsError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image encode error: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MomentsError>;

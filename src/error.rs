//! Error taxonomy for the encoder lifecycle.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("encoder method called after finish()")]
    AlreadyFinished,

    #[error("frame buffer length {actual} does not match 4*width*height ({expected}) for a {width}x{height} canvas")]
    FrameSizeMismatch {
        width: u16,
        height: u16,
        expected: usize,
        actual: usize,
    },

    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EncodeError>;

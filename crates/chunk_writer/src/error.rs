//! Writer-internal errors
//!
//! Converted to `ContractError::ChunkWrite` at the `ChunkSink` boundary.

use contracts::{ContractError, SensorRole};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("jpeg encode: {0}")]
    Jpeg(#[from] image::ImageError),

    #[error("tiff encode: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("wav encode: {0}")]
    Wav(#[from] hound::Error),

    #[error("persist: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Frame payload does not match the chunk format
    #[error("{format} chunk cannot hold a {got} frame")]
    PayloadMismatch {
        format: &'static str,
        got: &'static str,
    },

    /// Frames within one chunk disagree (dimensions, sample rate, ...)
    #[error("inconsistent chunk: {0}")]
    Inconsistent(String),
}

impl WriterError {
    pub fn into_contract(self, role: SensorRole) -> ContractError {
        ContractError::chunk_write(role, self.to_string())
    }
}

//! ChunkSink trait - Capture Unit 输出接口
//!
//! Defines the abstract interface for chunk persistence.

use std::path::PathBuf;

use crate::{ContractError, Frame};

/// Metadata of a persisted chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Final file path
    pub path: PathBuf,
    /// Number of frames in the chunk
    pub frames: usize,
    /// File size in bytes
    pub bytes: u64,
}

/// Chunk persistence trait
///
/// All writers must implement this trait.
pub trait ChunkSink: Send {
    /// Persist `frames` as one immutable chunk.
    ///
    /// An empty slice is a no-op returning `Ok(None)` and never creates a file.
    /// Once `Ok(Some(_))` is returned the data is durable and the caller may
    /// discard its buffer.
    ///
    /// # Errors
    /// `ContractError::ChunkWrite` with context
    fn flush(&mut self, session: &str, frames: &[Frame])
        -> Result<Option<ChunkInfo>, ContractError>;
}

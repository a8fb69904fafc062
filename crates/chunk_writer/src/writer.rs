//! ChunkWriter - 分块写盘
//!
//! Each flush encodes into a hidden temp file in the role directory, syncs it,
//! then links it to its final name without overwriting anything. A chunk file
//! is therefore either absent or complete.

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use contracts::{ChunkInfo, ChunkSink, ContractError, Frame, SensorRole};
use tempfile::{NamedTempFile, PersistError};
use tracing::{debug, instrument, warn};

use crate::encode::ChunkFormat;
use crate::error::WriterError;
use crate::naming::{chunk_file_name, ChunkClock};

/// Name collisions tolerated before giving up
const MAX_NAME_ATTEMPTS: usize = 16;

/// Builds the chunk sink of one role
pub trait SinkFactory: Send + Sync {
    /// # Errors
    /// `ChunkWrite` when the output directory cannot be prepared.
    fn build(
        &self,
        role: SensorRole,
        directory: PathBuf,
    ) -> Result<Box<dyn ChunkSink>, ContractError>;
}

/// Default factory: one `ChunkWriter` per role directory
#[derive(Debug, Default, Clone, Copy)]
pub struct ChunkWriterFactory;

impl SinkFactory for ChunkWriterFactory {
    fn build(
        &self,
        role: SensorRole,
        directory: PathBuf,
    ) -> Result<Box<dyn ChunkSink>, ContractError> {
        Ok(Box::new(ChunkWriter::new(role, directory)?))
    }
}

/// Chunked writer of one role
#[derive(Debug)]
pub struct ChunkWriter {
    role: SensorRole,
    directory: PathBuf,
    format: ChunkFormat,
    clock: ChunkClock,
}

impl ChunkWriter {
    /// Create a writer; the output directory is created if missing.
    pub fn new(role: SensorRole, directory: impl Into<PathBuf>) -> Result<Self, ContractError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|e| {
            ContractError::chunk_write(
                role,
                format!("cannot create {}: {e}", directory.display()),
            )
        })?;

        Ok(Self {
            role,
            directory,
            format: ChunkFormat::for_role(role),
            clock: ChunkClock::new(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_chunk(&mut self, session: &str, frames: &[Frame]) -> Result<ChunkInfo, WriterError> {
        let mut tmp = tempfile::Builder::new()
            .prefix(".chunk-")
            .suffix(".partial")
            .tempfile_in(&self.directory)?;

        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            self.format.encode(frames, &mut out)?;
            out.flush()?;
        }
        tmp.as_file().sync_all()?;

        let path = self.persist(session, tmp)?;
        sync_directory(&self.directory);

        let bytes = fs::metadata(&path)?.len();
        Ok(ChunkInfo {
            path,
            frames: frames.len(),
            bytes,
        })
    }

    /// Link the temp file to a fresh name, never clobbering an existing file.
    fn persist(&mut self, session: &str, mut tmp: NamedTempFile) -> Result<PathBuf, WriterError> {
        let mut stamp = self.clock.next();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self
                .directory
                .join(chunk_file_name(session, &stamp, self.format.extension()));
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(PersistError { error, file }) if error.kind() == ErrorKind::AlreadyExists => {
                    warn!(path = %path.display(), "chunk name taken, retrying");
                    tmp = file;
                    stamp = self.clock.bump();
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(WriterError::Inconsistent(format!(
            "no free chunk name after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }
}

impl ChunkSink for ChunkWriter {
    #[instrument(
        name = "chunk_writer_flush",
        skip(self, frames),
        fields(role = %self.role, frames = frames.len())
    )]
    fn flush(
        &mut self,
        session: &str,
        frames: &[Frame],
    ) -> Result<Option<ChunkInfo>, ContractError> {
        if frames.is_empty() {
            return Ok(None);
        }
        let chunk = self
            .write_chunk(session, frames)
            .map_err(|e| e.into_contract(self.role))?;
        debug!(path = %chunk.path.display(), bytes = chunk.bytes, "chunk persisted");
        Ok(Some(chunk))
    }
}

/// Make the new directory entry durable
#[cfg(unix)]
fn sync_directory(directory: &Path) {
    if let Err(e) = fs::File::open(directory).and_then(|dir| dir.sync_all()) {
        warn!(directory = %directory.display(), error = %e, "directory sync failed");
    }
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) {}

//! # Chunk Writer
//!
//! 按时间分块的持久化写入器。
//!
//! 负责：
//! - 分块文件命名 (`{session}_{timestamp}.{ext}`，时间戳严格递增)
//! - 按角色编码 (TIFF / MJPEG / WAV)
//! - 临时文件 + fsync + 不覆盖重命名，保证分块要么完整要么不存在

mod encode;
mod error;
mod naming;
mod writer;

pub use encode::{ChunkFormat, DEFAULT_JPEG_QUALITY};
pub use error::WriterError;
pub use naming::{chunk_file_name, sanitize_session, ChunkClock, TIMESTAMP_FORMAT};
pub use writer::{ChunkWriter, ChunkWriterFactory, SinkFactory};

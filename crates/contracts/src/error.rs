//! Layered error definitions
//!
//! Categorized by source: config / device / chunk write

use thiserror::Error;

use crate::SensorRole;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Device Errors =====
    /// Device absent or could not be opened
    #[error("device init error for '{role}': {message}")]
    DeviceInit { role: SensorRole, message: String },

    /// Device read failed mid-capture
    #[error("device read error for '{role}': {message}")]
    DeviceRead { role: SensorRole, message: String },

    /// Frame could not be transformed
    #[error("frame transform error for '{role}': {message}")]
    Transform { role: SensorRole, message: String },

    // ===== Writer Errors =====
    /// Chunk could not be persisted
    #[error("chunk write error for '{role}': {message}")]
    ChunkWrite { role: SensorRole, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create device init error
    pub fn device_init(role: SensorRole, message: impl Into<String>) -> Self {
        Self::DeviceInit {
            role,
            message: message.into(),
        }
    }

    /// Create device read error
    pub fn device_read(role: SensorRole, message: impl Into<String>) -> Self {
        Self::DeviceRead {
            role,
            message: message.into(),
        }
    }

    /// Create frame transform error
    pub fn transform(role: SensorRole, message: impl Into<String>) -> Self {
        Self::Transform {
            role,
            message: message.into(),
        }
    }

    /// Create chunk write error
    pub fn chunk_write(role: SensorRole, message: impl Into<String>) -> Self {
        Self::ChunkWrite {
            role,
            message: message.into(),
        }
    }

    /// Parse and validation errors are fatal at session start.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::ConfigParse { .. } | Self::ConfigValidation { .. })
    }
}

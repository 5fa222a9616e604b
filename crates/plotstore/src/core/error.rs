//! Core error types for the graphical-object store
//!
//! Every fallible store operation returns [`StoreError`]. The producer-facing
//! graph API turns these into a boolean plus a log line, so nothing here
//! crosses the producer boundary as a panic.

use thiserror::Error;

/// Core error types for the graphical-object store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Out of memory: could not allocate {requested} bytes (limit {limit})")]
    OutOfMemory { requested: usize, limit: usize },

    #[error(
        "Corruption detected in chunk {chunk} at offset 0x{offset:08x}: expected tag 0x{expected:04x}, found 0x{found:04x}"
    )]
    CorruptionDetected {
        chunk: usize,
        offset: usize,
        expected: u16,
        found: u16,
    },

    #[error("Geometry anomaly: {message}")]
    GeometryAnomaly { message: String },

    #[error("Record too large: {size} bytes exceeds maximum of {max}")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Decode error at offset 0x{offset:08x}: {message}")]
    Decode { offset: usize, message: String },

    #[error("Invalid label: {message}")]
    InvalidLabel { message: String },

    #[error("Stale handle: {message}")]
    StaleHandle { message: String },

    #[error("Unknown sub-plot: {id}")]
    UnknownSubPlot { id: usize },

    #[error("Unknown graph: {message}")]
    UnknownGraph { message: String },
}

impl StoreError {
    /// Create a new out-of-memory error
    pub fn out_of_memory(requested: usize, limit: usize) -> Self {
        Self::OutOfMemory { requested, limit }
    }

    /// Create a new corruption error
    pub fn corruption(chunk: usize, offset: usize, expected: u16, found: u16) -> Self {
        Self::CorruptionDetected {
            chunk,
            offset,
            expected,
            found,
        }
    }

    /// Create a new geometry anomaly
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::GeometryAnomaly {
            message: message.into(),
        }
    }

    /// Create a new record-too-large error
    pub fn record_too_large(size: usize, max: usize) -> Self {
        Self::RecordTooLarge { size, max }
    }

    /// Create a new decode error
    pub fn decode(offset: usize, message: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            message: message.into(),
        }
    }

    /// Create a new invalid label error
    pub fn invalid_label(message: impl Into<String>) -> Self {
        Self::InvalidLabel {
            message: message.into(),
        }
    }

    /// Create a new stale handle error
    pub fn stale_handle(message: impl Into<String>) -> Self {
        Self::StaleHandle {
            message: message.into(),
        }
    }

    /// Create a new unknown graph error
    pub fn unknown_graph(message: impl Into<String>) -> Self {
        Self::UnknownGraph {
            message: message.into(),
        }
    }

    /// True for errors that mean the arena bytes can no longer be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptionDetected { .. } | Self::Decode { .. })
    }
}

/// Result alias used across the store
pub type Result<T> = std::result::Result<T, StoreError>;

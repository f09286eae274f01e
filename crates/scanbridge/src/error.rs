//! Error types for transfer operations

use crate::segment::SegmentId;
use crate::stream::StreamOperation;
use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// Errors that can occur while moving bytes through a transfer session
#[derive(Debug, Error)]
pub enum TransferError {
    /// Retire was requested but the session holds no segment
    #[error("No segment available to retire")]
    NoSegment,

    /// Retire was requested on the tail segment while the transfer is running
    #[error("Segment {0} is still being written")]
    SegmentStillWriting(SegmentId),

    /// A read handle outlived its position at the head of the session
    #[error("Segment {0} is no longer the head segment")]
    NotHeadSegment(SegmentId),

    /// A read was issued against a segment that has already been retired
    #[error("Segment {0} has been retired")]
    SegmentRetired(SegmentId),

    /// A read was issued with a zero-length destination
    ///
    /// Zero bytes read is reserved for end-of-stream, so an empty destination
    /// can never be answered truthfully.
    #[error("Read buffer must not be empty")]
    EmptyReadBuffer,

    /// Allocating storage for an appended chunk failed
    #[error("Failed to allocate {requested} bytes for chunk")]
    OutOfMemory {
        /// Size of the rejected chunk
        requested: usize,
        /// Allocator failure
        #[source]
        source: TryReserveError,
    },

    /// A write arrived before any segment exists and implicit creation is off
    #[error("No write segment available")]
    NoWriteSegment,

    /// Legacy stream operation that an append-only stream cannot honour
    #[error("Unsupported stream operation: {0}")]
    Unsupported(StreamOperation),

    /// Invalid transfer configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransferError {
    /// Whether this error reports a violation of the calling protocol
    /// rather than a runtime condition.
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::NoSegment
                | Self::SegmentStillWriting(_)
                | Self::NotHeadSegment(_)
                | Self::SegmentRetired(_)
                | Self::EmptyReadBuffer
        )
    }
}

impl From<TransferError> for io::Error {
    fn from(err: TransferError) -> Self {
        let kind = match &err {
            TransferError::Unsupported(_) => io::ErrorKind::Unsupported,
            TransferError::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
            TransferError::EmptyReadBuffer | TransferError::Config(_) => {
                io::ErrorKind::InvalidInput
            }
            TransferError::NoWriteSegment => io::ErrorKind::NotConnected,
            TransferError::NoSegment
            | TransferError::SegmentStillWriting(_)
            | TransferError::NotHeadSegment(_)
            | TransferError::SegmentRetired(_) => io::ErrorKind::Other,
        };
        Self::new(kind, err)
    }
}

/// Result type for transfer operations
pub type Result<T> = std::result::Result<T, TransferError>;

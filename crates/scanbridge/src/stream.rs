//! Legacy stream surface
//!
//! Acquisition hosts talk to a page sink through a general random-access
//! stream interface. A segment is append-only and forward-only, so only
//! append, read, length queries, stat and commit are honoured. Every other
//! operation answers [`TransferError::Unsupported`] and is reported to the
//! session's log sink.

use crate::log::LogLevel;
use crate::segment::SegmentBuffer;
use crate::{Result, TransferError};
use std::fmt;
use std::io::SeekFrom;
use std::ops::Range;

/// Operations of the legacy stream interface a segment does not implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamOperation {
    /// Duplicate the stream with an independent cursor
    Clone,
    /// Copy a byte range into another stream
    CopyTo,
    /// Lock a byte range
    LockRegion,
    /// Unlock a byte range
    UnlockRegion,
    /// Discard uncommitted changes
    Revert,
    /// Truncate or extend the stream
    SetSize,
    /// Move the cursor anywhere but "end, offset zero"
    Seek,
}

impl fmt::Display for StreamOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Kind of storage object reported by [`SegmentBuffer::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// A byte stream
    Stream,
}

/// Snapshot returned by [`SegmentBuffer::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamStat {
    /// Always [`StorageKind::Stream`]
    pub kind: StorageKind,
    /// Bytes written to the segment so far
    pub size: u64,
}

impl SegmentBuffer {
    /// Describe the stream; `size` is the total written so far
    pub fn stat(&self) -> StreamStat {
        StreamStat {
            kind: StorageKind::Stream,
            size: self.stream_length(),
        }
    }

    /// Accepted and ignored; appended bytes are visible immediately
    pub fn commit(&self) -> Result<()> {
        Ok(())
    }

    /// Answer a seek.
    ///
    /// Only `SeekFrom::End(0)` is meaningful: it reports the current length
    /// without moving anything. There is no random access.
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        match pos {
            SeekFrom::End(0) => Ok(self.stream_length()),
            other => {
                self.unsupported(StreamOperation::Seek, &format!("seek to {other:?}"))
            }
        }
    }

    /// Cloning a forward-only segment is not supported
    pub fn clone_stream(&self) -> Result<Self> {
        self.unsupported(StreamOperation::Clone, "clone")
    }

    /// Copying into another stream is not supported
    pub fn copy_to(&self, _target: &Self, _len: u64) -> Result<u64> {
        self.unsupported(StreamOperation::CopyTo, "copy_to")
    }

    /// Region locking is not supported
    pub fn lock_region(&self, range: Range<u64>) -> Result<()> {
        self.unsupported(StreamOperation::LockRegion, &format!("lock {range:?}"))
    }

    /// Region unlocking is not supported
    pub fn unlock_region(&self, range: Range<u64>) -> Result<()> {
        self.unsupported(StreamOperation::UnlockRegion, &format!("unlock {range:?}"))
    }

    /// Reverting is not supported
    pub fn revert(&self) -> Result<()> {
        self.unsupported(StreamOperation::Revert, "revert")
    }

    /// Resizing is not supported
    pub fn set_size(&self, size: u64) -> Result<()> {
        self.unsupported(StreamOperation::SetSize, &format!("set_size({size})"))
    }

    fn unsupported<T>(&self, op: StreamOperation, detail: &str) -> Result<T> {
        if self.warn_on_unsupported {
            self.emit(
                LogLevel::Warning,
                &format!("unsupported stream call: {detail}"),
            );
        }
        Err(TransferError::Unsupported(op))
    }
}

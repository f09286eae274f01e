//! Blocking, partially consumable byte queue for one page
//!
//! A [`SegmentBuffer`] is written by exactly one producer thread and read by
//! exactly one consumer thread. Appends never block beyond the buffer lock.
//! Reads block while the queue is empty and the caller-supplied liveness
//! predicate says more data may still arrive.
//!
//! # Wake semantics
//!
//! A reader parked on an empty queue is released by either an append or a
//! [`wake`](SegmentBuffer::wake). Every wake bumps an epoch counter; the reader
//! records the epoch before parking and keeps waiting only while the queue is
//! empty and the epoch is unchanged. A wake with no parked reader therefore has
//! no effect on later reads, and a parked reader that finds no data after a
//! wake reports end-of-stream instead of parking again.

use crate::chunk::Chunk;
use crate::log::{LogLevel, LogRecord, LogSink, TracingSink};
use crate::{Result, TransferError};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Identity of a segment within its session, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Wrap a raw segment number
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw segment number
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a single blocking read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// At least one byte was copied; more may follow
    Data(usize),
    /// The segment is closed and fully drained
    EndOfStream,
}

impl ReadOutcome {
    /// Number of bytes copied, zero at end-of-stream
    pub const fn bytes_read(self) -> usize {
        match self {
            Self::Data(n) => n,
            Self::EndOfStream => 0,
        }
    }

    /// Whether this read reported end-of-stream
    pub const fn is_end_of_stream(self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

#[derive(Debug, Default)]
struct SegmentState {
    chunks: VecDeque<Chunk>,
    total_bytes_written: u64,
    wake_epoch: u64,
    retired: bool,
}

/// Thread-safe byte queue backing one page of a transfer
pub struct SegmentBuffer {
    id: SegmentId,
    state: Mutex<SegmentState>,
    arrival: Condvar,
    pub(crate) label: Arc<str>,
    pub(crate) log: Arc<dyn LogSink>,
    pub(crate) warn_on_unsupported: bool,
}

impl SegmentBuffer {
    /// Create a standalone segment that logs through [`TracingSink`]
    pub fn new(id: SegmentId) -> Self {
        Self::with_log(id, Arc::from("segment"), Arc::new(TracingSink), true)
    }

    pub(crate) fn with_log(
        id: SegmentId,
        label: Arc<str>,
        log: Arc<dyn LogSink>,
        warn_on_unsupported: bool,
    ) -> Self {
        Self {
            id,
            state: Mutex::new(SegmentState::default()),
            arrival: Condvar::new(),
            label,
            log,
            warn_on_unsupported,
        }
    }

    /// Identity of this segment
    pub const fn id(&self) -> SegmentId {
        self.id
    }

    /// Append a copy of `bytes` and wake a parked reader.
    ///
    /// Returns the number of bytes accepted, which is zero for an empty slice.
    /// On allocation failure nothing is enqueued and the length is unchanged.
    pub fn append(&self, bytes: &[u8]) -> Result<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }

        let chunk = match Chunk::try_copy_from(bytes) {
            Ok(chunk) => chunk,
            Err(err) => {
                self.emit(LogLevel::Error, &err.to_string());
                return Err(err);
            }
        };
        let len = chunk.len();

        let mut state = self.state.lock();
        state.chunks.push_back(chunk);
        state.total_bytes_written += len as u64;
        self.arrival.notify_all();
        Ok(len)
    }

    /// Read up to `buf.len()` bytes, blocking while the queue is empty.
    ///
    /// A single read never crosses a chunk boundary. When the queue is empty
    /// `still_producing` decides whether to park: `false` means end-of-stream
    /// right away, `true` parks until an append or a wake.
    ///
    /// `still_producing` runs with this segment's lock held and must not touch
    /// this segment.
    pub fn read<F>(&self, buf: &mut [u8], still_producing: F) -> Result<ReadOutcome>
    where
        F: FnOnce() -> bool,
    {
        if buf.is_empty() {
            self.emit(LogLevel::Error, "read called with an empty buffer");
            return Err(TransferError::EmptyReadBuffer);
        }

        Ok(self
            .read_head(still_producing, |head| head.take_into(buf))?
            .map_or(ReadOutcome::EndOfStream, ReadOutcome::Data))
    }

    /// Like [`read`](Self::read), but returns the bytes in a new `Vec`.
    ///
    /// The allocation is sized by the head chunk, never by `max_len`, so a
    /// huge limit costs nothing extra. `None` means end-of-stream.
    pub fn read_to_vec<F>(&self, max_len: usize, still_producing: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce() -> bool,
    {
        if max_len == 0 {
            self.emit(LogLevel::Error, "read called with an empty buffer");
            return Err(TransferError::EmptyReadBuffer);
        }

        self.read_head(still_producing, |head| head.take_vec(max_len))
    }

    /// Wait for a queued chunk and hand it to `take`, retiring it once
    /// consumed. `None` means end-of-stream.
    fn read_head<F, G, T>(&self, still_producing: F, take: G) -> Result<Option<T>>
    where
        F: FnOnce() -> bool,
        G: FnOnce(&mut Chunk) -> T,
    {
        let mut state = self.state.lock();
        if state.retired {
            drop(state);
            self.emit(LogLevel::Error, "read after retirement");
            return Err(TransferError::SegmentRetired(self.id));
        }

        if state.chunks.is_empty() {
            if !still_producing() {
                return Ok(None);
            }

            let epoch = state.wake_epoch;
            while state.chunks.is_empty() && state.wake_epoch == epoch {
                self.arrival.wait(&mut state);
            }
        }

        let Some(head) = state.chunks.front_mut() else {
            return Ok(None);
        };

        let taken = take(head);
        if head.is_consumed() {
            state.chunks.pop_front();
        }

        Ok(Some(taken))
    }

    /// Release a parked reader without adding data
    pub fn wake(&self) {
        let mut state = self.state.lock();
        state.wake_epoch = state.wake_epoch.wrapping_add(1);
        self.arrival.notify_all();
    }

    /// Mark the segment as retired and release any reader still parked on it
    pub(crate) fn retire(&self) {
        let mut state = self.state.lock();
        state.retired = true;
        state.wake_epoch = state.wake_epoch.wrapping_add(1);
        self.arrival.notify_all();
    }

    /// Whether the owning session has retired this segment
    pub fn is_retired(&self) -> bool {
        self.state.lock().retired
    }

    /// Total bytes ever appended, independent of what has been read
    pub fn stream_length(&self) -> u64 {
        self.state.lock().total_bytes_written
    }

    /// Bytes appended but not yet read
    pub fn pending_bytes(&self) -> u64 {
        self.state
            .lock()
            .chunks
            .iter()
            .map(|chunk| chunk.remaining() as u64)
            .sum()
    }

    /// Whether every appended byte has been read
    pub fn is_drained(&self) -> bool {
        self.state.lock().chunks.is_empty()
    }

    pub(crate) fn emit(&self, level: LogLevel, message: &str) {
        self.log.log(&LogRecord {
            level,
            label: &self.label,
            segment: Some(self.id),
            message,
        });
    }
}

impl fmt::Debug for SegmentBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SegmentBuffer")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("chunks", &state.chunks.len())
            .field("total_bytes_written", &state.total_bytes_written)
            .finish_non_exhaustive()
    }
}

//! Acquisition-facing and consumer-facing halves of a transfer
//!
//! [`channel`] splits a [`TransferSession`] into a [`ScanWriter`], driven by
//! the acquisition callbacks, and a [`ScanReader`], driven by the consumer.
//! Both halves are `Send` and are meant to live on different threads.

use crate::config::TransferConfig;
use crate::log::LogSink;
use crate::segment::{ReadOutcome, SegmentBuffer, SegmentId};
use crate::session::{RetiredSegment, TransferSession};
use crate::stream::StreamStat;
use crate::Result;
use std::io;
use std::sync::Arc;

/// Message delivered by the acquisition subsystem's transfer callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMessage {
    /// Progress report; does not change the segment sequence
    Status {
        /// Percentage of the transfer completed
        percent_complete: u8,
    },
    /// A new page begins
    NewPage,
    /// The device finished the whole transfer
    EndOfTransfer,
}

/// Bytes returned by [`ScanReader::read_bytes`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadBytes {
    /// Bytes read, empty only at end-of-stream
    pub data: Vec<u8>,
    /// Whether the current segment is exhausted
    pub end_of_stream: bool,
}

impl ReadBytes {
    fn end_of_stream() -> Self {
        Self {
            data: Vec::new(),
            end_of_stream: true,
        }
    }

    /// Number of bytes read
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no bytes were read
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Create a session with the default log sink and split it
pub fn channel(config: TransferConfig) -> Result<(ScanWriter, ScanReader)> {
    Ok(split(Arc::new(TransferSession::new(config)?)))
}

/// Create a session with an injected log sink and split it
pub fn channel_with_log_sink(
    config: TransferConfig,
    log: Arc<dyn LogSink>,
) -> Result<(ScanWriter, ScanReader)> {
    Ok(split(Arc::new(TransferSession::with_log_sink(config, log)?)))
}

/// Split an existing session into its two halves
pub fn split(session: Arc<TransferSession>) -> (ScanWriter, ScanReader) {
    let writer = ScanWriter {
        session: Arc::clone(&session),
    };
    let reader = ScanReader {
        session,
        last_retired_length: None,
    };
    (writer, reader)
}

/// Acquisition-side entry points
#[derive(Debug, Clone)]
pub struct ScanWriter {
    session: Arc<TransferSession>,
}

impl ScanWriter {
    /// A new page begins
    pub fn notify_new_segment(&self) -> SegmentId {
        self.session.on_new_page().id()
    }

    /// The transfer is complete
    pub fn notify_transfer_ended(&self) {
        self.session.on_end_of_transfer();
    }

    /// Append bytes to the current page; zero-length writes accept nothing
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<usize> {
        self.session.write(bytes)
    }

    /// Handle for the page currently being written, creating the first one
    pub fn write_sink(&self) -> SegmentWriter {
        SegmentWriter {
            segment: self.session.write_sink(),
        }
    }

    /// Dispatch a transfer callback message
    pub fn handle_message(&self, message: TransferMessage) {
        match message {
            TransferMessage::Status { percent_complete } => {
                self.session.record_progress(percent_complete);
            }
            TransferMessage::NewPage => {
                self.session.on_new_page();
            }
            TransferMessage::EndOfTransfer => self.session.on_end_of_transfer(),
        }
    }

    /// Shared session
    pub fn session(&self) -> &Arc<TransferSession> {
        &self.session
    }
}

/// Write handle bound to one page segment
#[derive(Debug, Clone)]
pub struct SegmentWriter {
    segment: Arc<SegmentBuffer>,
}

impl SegmentWriter {
    /// Identity of the target segment
    pub fn id(&self) -> SegmentId {
        self.segment.id()
    }

    /// Append bytes to the target segment
    pub fn append(&self, bytes: &[u8]) -> Result<usize> {
        self.segment.append(bytes)
    }

    /// Describe the target segment
    pub fn stat(&self) -> StreamStat {
        self.segment.stat()
    }

    /// No-op commit
    pub fn commit(&self) -> Result<()> {
        self.segment.commit()
    }

    /// Underlying segment buffer
    pub fn segment(&self) -> &SegmentBuffer {
        &self.segment
    }
}

impl io::Write for SegmentWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.segment.append(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.segment.commit()?)
    }
}

/// Consumer-side entry points
#[derive(Debug)]
pub struct ScanReader {
    session: Arc<TransferSession>,
    last_retired_length: Option<u64>,
}

impl ScanReader {
    /// Read up to `max_length` bytes from the current page.
    ///
    /// Blocks until the first page exists. When the transfer ended without a
    /// page left to read, returns an empty end-of-stream result immediately.
    pub fn read_bytes(&mut self, max_length: usize) -> Result<ReadBytes> {
        let Some(segment) = self.session.current_read_segment() else {
            return Ok(ReadBytes::end_of_stream());
        };

        match segment.read_vec(max_length)? {
            Some(data) => Ok(ReadBytes {
                data,
                end_of_stream: false,
            }),
            None => Ok(ReadBytes::end_of_stream()),
        }
    }

    /// Read into a caller-provided buffer from the current page
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        match self.session.current_read_segment() {
            Some(segment) => segment.read_some(buf),
            None => Ok(ReadOutcome::EndOfStream),
        }
    }

    /// Total bytes written to the current page, or to the last retired page
    /// when none is left
    pub fn stream_length(&self) -> u64 {
        self.session.peek_read_segment().map_or_else(
            || self.last_retired_length.unwrap_or(0),
            |segment| segment.stream_length(),
        )
    }

    /// Retire the current page and move on to the next one
    pub fn advance_to_next_segment(&mut self) -> Result<RetiredSegment> {
        let retired = self.session.retire_read_segment()?;
        self.last_retired_length = Some(retired.stream_length);
        Ok(retired)
    }

    /// Whether another page is available or may still arrive
    ///
    /// Blocks like [`read_bytes`](Self::read_bytes) until that is known.
    pub fn has_segment(&self) -> bool {
        self.session.current_read_segment().is_some()
    }

    /// Shared session
    pub fn session(&self) -> &Arc<TransferSession> {
        &self.session
    }
}

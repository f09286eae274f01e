//! Multi-page transfer sequencing
//!
//! A [`TransferSession`] owns the ordered list of segments produced by one
//! acquisition. The writer side always targets the newest segment (the tail),
//! the reader side drains the oldest (the head). Head and tail are the same
//! segment in the common single-page case.
//!
//! # Locking
//!
//! The session lock guards the segment list, the running flag and progress.
//! Each segment has its own lock. The only nesting is segment → session: a
//! parked read evaluates [`TransferSession::still_writing_to`] while holding
//! its segment lock. The session therefore never touches a segment lock while
//! holding its own; wakes and appends happen after the session lock is
//! released.

use crate::config::TransferConfig;
use crate::log::{LogLevel, LogRecord, LogSink, TracingSink};
use crate::segment::{ReadOutcome, SegmentBuffer, SegmentId};
use crate::{Result, TransferError};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Lifecycle of a transfer session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// No segment has been created yet
    Empty,
    /// At least one segment exists and the transfer is running
    Active,
    /// End of transfer was signalled
    Ended,
}

/// Summary of a segment removed by [`ReadSegment::retire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetiredSegment {
    /// Identity of the retired segment
    pub id: SegmentId,
    /// Total bytes written to it
    pub stream_length: u64,
    /// Bytes that were written but never read
    pub unread_bytes: u64,
}

#[derive(Debug)]
struct SessionState {
    segments: VecDeque<Arc<SegmentBuffer>>,
    running: bool,
    started: bool,
    next_id: u64,
    progress: Option<u8>,
}

/// Sequence of page segments shared by one writer and one reader thread
pub struct TransferSession {
    state: Mutex<SessionState>,
    segment_available: Condvar,
    config: TransferConfig,
    label: Arc<str>,
    log: Arc<dyn LogSink>,
}

impl TransferSession {
    /// Create a session that logs through [`TracingSink`]
    pub fn new(config: TransferConfig) -> Result<Self> {
        Self::with_log_sink(config, Arc::new(TracingSink))
    }

    /// Create a session with an injected log sink
    pub fn with_log_sink(config: TransferConfig, log: Arc<dyn LogSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(SessionState {
                segments: VecDeque::new(),
                running: true,
                started: false,
                next_id: 1,
                progress: None,
            }),
            segment_available: Condvar::new(),
            label: Arc::from(config.label.as_str()),
            config,
            log,
        })
    }

    /// Session configuration
    pub const fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Start a new segment and make it the write target.
    ///
    /// The previous tail, if any, is woken so a reader parked on it observes
    /// that it has been superseded.
    pub fn on_new_page(&self) -> Arc<SegmentBuffer> {
        let (previous, segment, running) = {
            let mut state = self.state.lock();
            let previous = state.segments.back().cloned();
            let segment = self.push_segment(&mut state);
            (previous, segment, state.running)
        };

        self.emit(LogLevel::Debug, Some(segment.id()), "new page segment");
        if !running {
            self.emit(
                LogLevel::Warning,
                Some(segment.id()),
                "new page signalled after end of transfer",
            );
        }

        if let Some(previous) = previous {
            let unread = previous.pending_bytes();
            if unread > 0 {
                self.emit(
                    LogLevel::Warning,
                    Some(previous.id()),
                    &format!("superseded with {unread} unread bytes"),
                );
            }
            previous.wake();
        }

        segment
    }

    /// Mark the transfer as finished.
    ///
    /// Releases a reader waiting for the first segment. When
    /// [`TransferConfig::wake_reader_on_end`] is set the tail is woken as well,
    /// so a reader parked inside it re-checks liveness and reports
    /// end-of-stream.
    pub fn on_end_of_transfer(&self) {
        let tail = {
            let mut state = self.state.lock();
            state.running = false;
            self.segment_available.notify_all();
            state.segments.back().cloned()
        };

        self.emit(
            LogLevel::Info,
            tail.as_ref().map(|t| t.id()),
            "end of transfer",
        );

        if self.config.wake_reader_on_end
            && let Some(tail) = tail
        {
            tail.wake();
        }
    }

    /// Record a progress report from the acquisition side
    pub fn record_progress(&self, percent_complete: u8) {
        let percent = percent_complete.min(100);
        self.state.lock().progress = Some(percent);
        self.emit(LogLevel::Debug, None, &format!("progress {percent}%"));
    }

    /// Last progress report, if any
    pub fn progress(&self) -> Option<u8> {
        self.state.lock().progress
    }

    /// Append `bytes` to the tail segment.
    ///
    /// An empty slice is accepted as a no-op. When no segment exists one is
    /// created first, unless implicit creation is disabled.
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        self.write_target()?.append(bytes)
    }

    /// Tail segment for the acquisition side, created if none exists yet
    pub fn write_sink(&self) -> Arc<SegmentBuffer> {
        let (segment, created) = {
            let mut state = self.state.lock();
            match state.segments.back() {
                Some(tail) => (Arc::clone(tail), false),
                None => (self.push_segment(&mut state), true),
            }
        };

        if created {
            self.emit(LogLevel::Debug, Some(segment.id()), "new page segment");
        }
        segment
    }

    /// Tail segment, without blocking or creating one
    pub fn current_write_segment(&self) -> Option<Arc<SegmentBuffer>> {
        self.state.lock().segments.back().cloned()
    }

    /// Head segment, blocking until one exists or the transfer ends.
    ///
    /// `None` means the transfer ended without producing any segment, or all
    /// segments have been retired.
    pub fn current_read_segment(&self) -> Option<ReadSegment<'_>> {
        let mut state = self.state.lock();
        while state.segments.is_empty() && state.running {
            self.segment_available.wait(&mut state);
        }
        let segment = state.segments.front().cloned()?;
        drop(state);

        Some(ReadSegment {
            session: self,
            segment,
        })
    }

    /// Head segment without blocking
    pub fn peek_read_segment(&self) -> Option<Arc<SegmentBuffer>> {
        self.state.lock().segments.front().cloned()
    }

    /// Remove the head segment.
    ///
    /// Fails when there is no segment, or when the head is still the write
    /// target of a running transfer.
    pub fn retire_read_segment(&self) -> Result<RetiredSegment> {
        self.retire_head(None)
    }

    /// Whether `segment` may still receive data.
    ///
    /// False once the transfer has ended or a newer segment has become the
    /// tail.
    pub fn still_writing_to(&self, segment: &SegmentBuffer) -> bool {
        let state = self.state.lock();
        state.running
            && state
                .segments
                .back()
                .is_some_and(|tail| std::ptr::eq(Arc::as_ptr(tail), segment))
    }

    /// Current lifecycle state
    pub fn state(&self) -> TransferState {
        let state = self.state.lock();
        if !state.running {
            TransferState::Ended
        } else if state.started {
            TransferState::Active
        } else {
            TransferState::Empty
        }
    }

    /// Whether end of transfer has not been signalled yet
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Number of segments not yet retired
    pub fn segment_count(&self) -> usize {
        self.state.lock().segments.len()
    }

    fn push_segment(&self, state: &mut SessionState) -> Arc<SegmentBuffer> {
        let id = SegmentId::new(state.next_id);
        state.next_id += 1;

        let segment = Arc::new(SegmentBuffer::with_log(
            id,
            Arc::clone(&self.label),
            Arc::clone(&self.log),
            self.config.warn_on_unsupported,
        ));
        state.segments.push_back(Arc::clone(&segment));
        state.started = true;
        self.segment_available.notify_all();
        segment
    }

    fn write_target(&self) -> Result<Arc<SegmentBuffer>> {
        let created = {
            let mut state = self.state.lock();
            if let Some(tail) = state.segments.back() {
                return Ok(Arc::clone(tail));
            }
            if self.config.implicit_segment_on_write {
                Some(self.push_segment(&mut state))
            } else {
                None
            }
        };

        match created {
            Some(segment) => {
                self.emit(
                    LogLevel::Debug,
                    Some(segment.id()),
                    "segment created implicitly by write",
                );
                Ok(segment)
            }
            None => {
                self.emit(
                    LogLevel::Warning,
                    None,
                    "write before any page and implicit segments disabled",
                );
                Err(TransferError::NoWriteSegment)
            }
        }
    }

    fn retire_head(&self, expected: Option<&Arc<SegmentBuffer>>) -> Result<RetiredSegment> {
        let outcome = {
            let mut state = self.state.lock();
            let check = match (state.segments.front(), expected) {
                (None, _) => Err(TransferError::NoSegment),
                (Some(head), Some(handle)) if !Arc::ptr_eq(head, handle) => {
                    Err(TransferError::NotHeadSegment(handle.id()))
                }
                (Some(head), _) if state.running && state.segments.len() == 1 => {
                    Err(TransferError::SegmentStillWriting(head.id()))
                }
                (Some(_), _) => Ok(()),
            };
            check.and_then(|()| state.segments.pop_front().ok_or(TransferError::NoSegment))
        };

        let segment = match outcome {
            Ok(segment) => segment,
            Err(err) => {
                let id = match &err {
                    TransferError::SegmentStillWriting(id) | TransferError::NotHeadSegment(id) => {
                        Some(*id)
                    }
                    _ => None,
                };
                self.emit(LogLevel::Error, id, &format!("cannot retire segment: {err}"));
                return Err(err);
            }
        };

        let retired = RetiredSegment {
            id: segment.id(),
            stream_length: segment.stream_length(),
            unread_bytes: segment.pending_bytes(),
        };
        segment.retire();

        if retired.unread_bytes > 0 {
            self.emit(
                LogLevel::Warning,
                Some(retired.id),
                &format!("retired with {} unread bytes", retired.unread_bytes),
            );
        } else {
            self.emit(LogLevel::Debug, Some(retired.id), "segment retired");
        }

        Ok(retired)
    }

    fn emit(&self, level: LogLevel, segment: Option<SegmentId>, message: &str) {
        self.log.log(&LogRecord {
            level,
            label: &self.label,
            segment,
            message,
        });
    }
}

impl fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransferSession")
            .field("label", &self.label)
            .field("segments", &state.segments.len())
            .field("running", &state.running)
            .field("progress", &state.progress)
            .finish_non_exhaustive()
    }
}

/// Borrowed handle to the head segment.
///
/// Valid until [`retire`](Self::retire) consumes it. Reads consult the owning
/// session to decide whether the segment may still grow.
pub struct ReadSegment<'s> {
    session: &'s TransferSession,
    segment: Arc<SegmentBuffer>,
}

impl ReadSegment<'_> {
    /// Identity of the segment
    pub fn id(&self) -> SegmentId {
        self.segment.id()
    }

    /// Underlying segment buffer
    pub fn segment(&self) -> &SegmentBuffer {
        &self.segment
    }

    /// Blocking read of up to `buf.len()` bytes
    pub fn read_some(&self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let session = self.session;
        let segment = &self.segment;
        segment.read(buf, || session.still_writing_to(segment))
    }

    /// Blocking read of up to `max_len` bytes into a new `Vec`.
    ///
    /// `None` means end-of-stream.
    pub fn read_vec(&self, max_len: usize) -> Result<Option<Vec<u8>>> {
        let session = self.session;
        let segment = &self.segment;
        segment.read_to_vec(max_len, || session.still_writing_to(segment))
    }

    /// Total bytes written to this segment so far
    pub fn stream_length(&self) -> u64 {
        self.segment.stream_length()
    }

    /// Remove this segment from the session
    pub fn retire(self) -> Result<RetiredSegment> {
        self.session.retire_head(Some(&self.segment))
    }
}

impl fmt::Debug for ReadSegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSegment")
            .field("segment", &self.segment)
            .finish_non_exhaustive()
    }
}

impl io::Read for ReadSegment<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        Ok(self.read_some(buf)?.bytes_read())
    }
}

impl io::Seek for ReadSegment<'_> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        Ok(self.segment.seek(pos)?)
    }
}

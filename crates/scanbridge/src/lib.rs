//! Blocking byte bridge between scanner acquisition and pull-style readers.
//!
//! Scanner drivers push image bytes from their own thread, in chunks of any
//! size, and announce page boundaries and the end of the transfer through
//! callbacks. Consumers want to pull bytes on demand. This crate connects the
//! two:
//!
//! - **[`SegmentBuffer`]**: one page. An append-only queue of byte chunks with
//!   a blocking, partially consuming read and an explicit wake.
//! - **[`TransferSession`]**: the ordered pages of one transfer. The writer
//!   targets the newest page while the reader drains the oldest.
//! - **[`ScanWriter`] / [`ScanReader`]**: the acquisition-facing and
//!   consumer-facing halves returned by [`channel`].
//!
//! # End of stream
//!
//! A read reports [`ReadOutcome::EndOfStream`] once its page is drained and
//! either the transfer has ended or a newer page has started. A page that is
//! superseded while it still holds unread bytes is abandoned: its reader is
//! woken and sees end-of-stream once the queued bytes are gone.
//!
//! # Example
//!
//! ```rust
//! use scanbridge::{TransferConfig, channel};
//! use std::thread;
//!
//! # fn main() -> Result<(), scanbridge::TransferError> {
//! let (writer, mut reader) = channel(TransferConfig::default())?;
//!
//! let device = thread::spawn(move || -> Result<(), scanbridge::TransferError> {
//!     writer.notify_new_segment();
//!     writer.write_bytes(b"page one")?;
//!     writer.notify_transfer_ended();
//!     Ok(())
//! });
//!
//! let mut page = Vec::new();
//! loop {
//!     let chunk = reader.read_bytes(4096)?;
//!     if chunk.end_of_stream {
//!         break;
//!     }
//!     page.extend_from_slice(&chunk.data);
//! }
//! reader.advance_to_next_segment()?;
//!
//! assert_eq!(page, b"page one");
//! # device.join().ok();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunk;

pub mod bridge;
pub mod config;
pub mod error;
pub mod log;
pub mod segment;
pub mod session;
pub mod stream;

pub use bridge::{
    ReadBytes, ScanReader, ScanWriter, SegmentWriter, TransferMessage, channel,
    channel_with_log_sink, split,
};
pub use config::TransferConfig;
pub use error::{Result, TransferError};
pub use log::{LogLevel, LogRecord, LogSink, NullSink, TracingSink};
pub use segment::{ReadOutcome, SegmentBuffer, SegmentId};
pub use session::{ReadSegment, RetiredSegment, TransferSession, TransferState};
pub use stream::{StorageKind, StreamOperation, StreamStat};

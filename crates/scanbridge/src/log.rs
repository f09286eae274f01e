//! Injectable logging capability
//!
//! Sessions and segments never log through a global. Each session owns a
//! [`LogSink`] and hands it to the segments it creates. [`TracingSink`] is the
//! default and forwards every record as a single `tracing` event.

use crate::segment::SegmentId;
use std::fmt;

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Per-operation detail
    Debug,
    /// Transfer lifecycle events
    Info,
    /// Unexpected but recoverable calls
    Warning,
    /// Contract violations and failed writes
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// One log record
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    /// Severity
    pub level: LogLevel,
    /// Session label from the configuration
    pub label: &'a str,
    /// Segment the record concerns, if any
    pub segment: Option<SegmentId>,
    /// Human-readable message
    pub message: &'a str,
}

/// Destination for log records emitted by sessions and segments
pub trait LogSink: Send + Sync {
    /// Record one event
    fn log(&self, record: &LogRecord<'_>);
}

/// Forwards records to the `tracing` ecosystem
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, record: &LogRecord<'_>) {
        let segment = record.segment.map(SegmentId::get);
        let label = record.label;
        let message = record.message;
        match record.level {
            LogLevel::Debug => tracing::debug!(label, segment, "{message}"),
            LogLevel::Info => tracing::info!(label, segment, "{message}"),
            LogLevel::Warning => tracing::warn!(label, segment, "{message}"),
            LogLevel::Error => tracing::error!(label, segment, "{message}"),
        }
    }
}

/// Drops every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _record: &LogRecord<'_>) {}
}

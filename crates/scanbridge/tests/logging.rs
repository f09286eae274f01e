//! Log records emitted through injected sinks.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use common::RecordingSink;
use scanbridge::{
    LogLevel, TracingSink, TransferConfig, TransferError, TransferMessage, TransferSession,
    channel_with_log_sink,
};
use std::io::SeekFrom;
use std::sync::Arc;

fn recorded(config: TransferConfig) -> (Arc<RecordingSink>, Arc<TransferSession>) {
    let sink = Arc::new(RecordingSink::default());
    let session = TransferSession::with_log_sink(config, sink.clone()).unwrap();
    (sink, Arc::new(session))
}

#[test]
fn unsupported_calls_are_reported_once_each() {
    let (sink, session) = recorded(TransferConfig::default());
    let segment = session.on_new_page();

    assert!(matches!(
        segment.seek(SeekFrom::Current(4)),
        Err(TransferError::Unsupported(_))
    ));
    assert!(segment.set_size(0).is_err());
    assert_eq!(segment.seek(SeekFrom::End(0)).unwrap(), 0);

    let warnings = sink.messages_at(LogLevel::Warning);
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("seek"));
    assert!(warnings[1].contains("set_size"));
}

#[test]
fn usage_errors_are_logged_at_error_level() {
    let (sink, session) = recorded(TransferConfig::default());

    assert!(session.retire_read_segment().is_err());
    session.on_new_page();
    assert!(session.retire_read_segment().is_err());

    assert_eq!(sink.count_at(LogLevel::Error), 2);
}

#[test]
fn abandoning_unread_bytes_warns() {
    let (sink, session) = recorded(TransferConfig::default().with_label("adf"));
    session.write(b"unread").unwrap();
    session.on_new_page();

    let warnings = sink.messages_at(LogLevel::Warning);
    assert_eq!(warnings, vec!["superseded with 6 unread bytes".to_string()]);
}

#[test]
fn lifecycle_events_are_recorded() {
    let sink = Arc::new(RecordingSink::default());
    let (writer, _reader) =
        channel_with_log_sink(TransferConfig::default(), sink.clone()).unwrap();

    writer.handle_message(TransferMessage::Status {
        percent_complete: 50,
    });
    writer.handle_message(TransferMessage::NewPage);
    writer.handle_message(TransferMessage::EndOfTransfer);

    assert_eq!(sink.messages_at(LogLevel::Info), vec!["end of transfer".to_string()]);
    let debug = sink.messages_at(LogLevel::Debug);
    assert!(debug.contains(&"progress 50%".to_string()));
    assert!(debug.contains(&"new page segment".to_string()));
}

#[test]
fn tracing_sink_emits_under_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("scanbridge=debug")
        .with_test_writer()
        .try_init();

    let session =
        TransferSession::with_log_sink(TransferConfig::default(), Arc::new(TracingSink)).unwrap();
    session.write(b"traced").unwrap();
    session.on_end_of_transfer();
    assert!(session.retire_read_segment().is_ok());
}

//! End-to-end transfer scenarios across writer and reader threads.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use common::{DEADLINE, settle, spawn_bounded};
use pretty_assertions::assert_eq;
use scanbridge::{
    NullSink, ReadBytes, ScanReader, ScanWriter, TransferConfig, TransferSession, TransferState,
    channel_with_log_sink,
};
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;

fn halves() -> (ScanWriter, ScanReader) {
    channel_with_log_sink(TransferConfig::default(), Arc::new(NullSink)).unwrap()
}

fn data(bytes: &[u8]) -> ReadBytes {
    ReadBytes {
        data: bytes.to_vec(),
        end_of_stream: false,
    }
}

fn eof() -> ReadBytes {
    ReadBytes {
        data: Vec::new(),
        end_of_stream: true,
    }
}

/// Drain one page, returning its bytes.
fn read_page(reader: &mut ScanReader, max: usize) -> Vec<u8> {
    let mut page = Vec::new();
    loop {
        let chunk = reader.read_bytes(max).unwrap();
        if chunk.end_of_stream {
            assert!(chunk.data.is_empty());
            return page;
        }
        assert!(!chunk.data.is_empty());
        page.extend_from_slice(&chunk.data);
    }
}

#[test]
fn two_pages_read_in_order() {
    let (writer, mut reader) = halves();

    writer.write_bytes(b"AB").unwrap();
    writer.write_bytes(b"CDE").unwrap();
    writer.notify_new_segment();
    writer.write_bytes(b"F").unwrap();
    writer.notify_transfer_ended();

    assert_eq!(reader.read_bytes(10).unwrap(), data(b"AB"));
    assert_eq!(reader.read_bytes(10).unwrap(), data(b"CDE"));
    assert_eq!(reader.read_bytes(10).unwrap(), eof());
    reader.advance_to_next_segment().unwrap();

    assert_eq!(reader.read_bytes(10).unwrap(), data(b"F"));
    assert_eq!(reader.read_bytes(10).unwrap(), eof());
    reader.advance_to_next_segment().unwrap();

    assert!(reader.session().current_read_segment().is_none());
    assert_eq!(reader.read_bytes(10).unwrap(), eof());
}

#[test]
fn abandoned_empty_page_releases_reader() {
    let (writer, mut reader) = halves();
    writer.notify_new_segment();

    let session = Arc::clone(reader.session());
    let rx = spawn_bounded(move || {
        let head = session.current_read_segment().unwrap();
        let mut buf = [0u8; 16];
        (head.id(), head.read_some(&mut buf).unwrap())
    });

    settle();
    writer.notify_new_segment();

    let (id, outcome) = rx.recv_timeout(DEADLINE).expect("reader released by new page");
    assert_eq!(id.get(), 1);
    assert!(outcome.is_end_of_stream());

    writer.write_bytes(b"X").unwrap();
    writer.notify_transfer_ended();

    reader.advance_to_next_segment().unwrap();
    assert_eq!(reader.read_bytes(16).unwrap(), data(b"X"));
    assert_eq!(reader.read_bytes(16).unwrap(), eof());
}

#[test]
fn superseded_page_still_delivers_queued_bytes() {
    let (writer, mut reader) = halves();
    writer.write_bytes(b"old").unwrap();
    writer.notify_new_segment();
    writer.write_bytes(b"new").unwrap();

    assert_eq!(read_page(&mut reader, 2), b"old");
    reader.advance_to_next_segment().unwrap();

    writer.notify_transfer_ended();
    assert_eq!(read_page(&mut reader, 2), b"new");
}

#[test]
fn reader_waits_for_first_page() {
    let (writer, reader) = halves();
    let session = Arc::clone(reader.session());

    let rx = spawn_bounded(move || session.current_read_segment().map(|s| s.id()));
    settle();
    assert_eq!(rx.try_recv(), Err(std::sync::mpsc::TryRecvError::Empty));

    let id = writer.notify_new_segment();
    assert_eq!(rx.recv_timeout(DEADLINE).unwrap(), Some(id));
}

#[test]
fn reader_released_when_transfer_ends_without_pages() {
    let (writer, mut reader) = halves();

    let rx = spawn_bounded(move || reader.read_bytes(32).unwrap());
    settle();
    assert_eq!(rx.recv_timeout(std::time::Duration::ZERO), Err(RecvTimeoutError::Timeout));

    writer.notify_transfer_ended();
    assert_eq!(rx.recv_timeout(DEADLINE).unwrap(), eof());
}

#[test]
fn pages_are_isolated() {
    let (writer, mut reader) = halves();
    for page in [b"first".as_slice(), b"second", b"third"] {
        writer.notify_new_segment();
        writer.write_bytes(page).unwrap();
    }
    writer.notify_transfer_ended();

    let mut pages = Vec::new();
    while reader.has_segment() {
        pages.push(read_page(&mut reader, 3));
        reader.advance_to_next_segment().unwrap();
    }
    assert_eq!(pages, vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
}

#[test]
fn concurrent_multi_page_transfer_preserves_bytes() {
    const PAGES: usize = 4;
    const CHUNKS: usize = 200;

    let (writer, mut reader) = halves();

    let expected: Vec<Vec<u8>> = (0..PAGES)
        .map(|page| {
            (0..CHUNKS)
                .flat_map(|chunk| {
                    let len = 1 + (chunk * 7 + page) % 23;
                    std::iter::repeat_n((chunk % 251) as u8, len)
                })
                .collect()
        })
        .collect();

    let pages = expected.clone();
    let producer = thread::spawn(move || {
        for page in &pages {
            writer.notify_new_segment();
            let mut rest = page.as_slice();
            let mut step = 1;
            while !rest.is_empty() {
                let take = step.min(rest.len());
                writer.write_bytes(&rest[..take]).unwrap();
                rest = &rest[take..];
                step = step % 23 + 1;
            }
        }
        writer.notify_transfer_ended();
    });

    let rx = spawn_bounded(move || {
        let mut received = Vec::new();
        while reader.has_segment() {
            received.push(read_page(&mut reader, 5));
            reader.advance_to_next_segment().unwrap();
        }
        received
    });

    let received = rx.recv_timeout(DEADLINE).expect("reader finished");
    producer.join().unwrap();
    assert_eq!(received, expected);
}

#[test]
fn streaming_single_page_with_slow_writer() {
    let (writer, mut reader) = halves();
    let expected: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

    let source = expected.clone();
    let producer = thread::spawn(move || {
        writer.notify_new_segment();
        for chunk in source.chunks(97) {
            writer.write_bytes(chunk).unwrap();
            thread::yield_now();
        }
        writer.notify_transfer_ended();
    });

    let rx = spawn_bounded(move || {
        let page = read_page(&mut reader, 64);
        let length = reader.stream_length();
        reader.advance_to_next_segment().unwrap();
        (page, length)
    });

    let (page, length) = rx.recv_timeout(DEADLINE).expect("reader finished");
    producer.join().unwrap();
    assert_eq!(page, expected);
    assert_eq!(length, 4096);
}

#[test]
fn session_state_follows_transfer() {
    let session =
        Arc::new(TransferSession::with_log_sink(TransferConfig::default(), Arc::new(NullSink)).unwrap());
    let (writer, _reader) = scanbridge::split(Arc::clone(&session));

    assert_eq!(session.state(), TransferState::Empty);
    writer.write_bytes(b"implicit").unwrap();
    assert_eq!(session.state(), TransferState::Active);
    writer.notify_transfer_ended();
    assert_eq!(session.state(), TransferState::Ended);
}

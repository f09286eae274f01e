//! Shared helpers for integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use scanbridge::{LogLevel, LogRecord, LogSink};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Upper bound for any blocking step; a hang fails the test instead.
pub const DEADLINE: Duration = Duration::from_secs(5);

/// Log sink that keeps every record for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<(LogLevel, Option<u64>, String)>>,
}

impl RecordingSink {
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|(l, _, _)| *l == level)
            .map(|(_, _, m)| m.clone())
            .collect()
    }

    pub fn count_at(&self, level: LogLevel) -> usize {
        self.messages_at(level).len()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, record: &LogRecord<'_>) {
        self.records.lock().push((
            record.level,
            record.segment.map(|s| s.get()),
            record.message.to_string(),
        ));
    }
}

/// Run `f` on a new thread and return its result, failing after `DEADLINE`.
pub fn spawn_bounded<T, F>(f: F) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx
}

/// Give a freshly spawned thread time to reach its blocking call.
pub fn settle() {
    thread::sleep(Duration::from_millis(50));
}

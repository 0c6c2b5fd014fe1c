//! Status reporting
//!
//! The conversion core only ever writes human-readable lines to a
//! [`StatusSink`]. Each accepted line gets the next sequence number and a
//! timestamp; lines are never edited, only cleared in bulk before a new run.

use chrono::{DateTime, Local};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One reported line
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub sequence: u64,
    pub timestamp: DateTime<Local>,
    pub text: String,
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:>4}] {} {}",
            self.sequence,
            self.timestamp.format("%H:%M:%S"),
            self.text
        )
    }
}

/// Append-only destination for status lines. Appends from different threads
/// never interleave within a line.
pub trait StatusSink: Send + Sync {
    fn clear(&self);
    fn append(&self, line: &str);
}

#[derive(Debug, Default)]
struct Sequenced<T> {
    next: u64,
    state: T,
}

impl<T> Sequenced<T> {
    fn stamp(&mut self, line: &str) -> StatusMessage {
        self.next += 1;
        StatusMessage {
            sequence: self.next,
            timestamp: Local::now(),
            text: line.to_string(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<Sequenced<Vec<StatusMessage>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<StatusMessage> {
        lock(&self.inner).state.clone()
    }

    /// Message texts in append order
    pub fn lines(&self) -> Vec<String> {
        lock(&self.inner)
            .state
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }
}

impl StatusSink for MemorySink {
    fn clear(&self) {
        let mut inner = lock(&self.inner);
        inner.state.clear();
        inner.next = 0;
    }

    fn append(&self, line: &str) {
        let mut inner = lock(&self.inner);
        let message = inner.stamp(line);
        inner.state.push(message);
    }
}

/// Prints each message to stdout as it arrives
#[derive(Debug, Default)]
pub struct ConsoleSink {
    inner: Mutex<Sequenced<()>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusSink for ConsoleSink {
    fn clear(&self) {
        lock(&self.inner).next = 0;
    }

    fn append(&self, line: &str) {
        let mut inner = lock(&self.inner);
        let message = inner.stamp(line);
        println!("{}", message);
    }
}

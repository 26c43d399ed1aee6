//! Incrementally-updating output streams
//!
//! A streamable value is a single-producer, multi-reader cell: the writer
//! publishes successive values and finally marks the stream done; readers
//! observe the latest value and wait for changes. Built on `tokio::sync::watch`,
//! so a slow reader never blocks the writer and never sees a torn value.

use crate::render::Artifact;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("Stream already closed")]
    Closed,
}

/// Latest value of a stream plus whether the producer has finished
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub value: T,
    pub done: bool,
}

/// Create a connected writer/reader pair
pub fn streamable<T>(initial: T) -> (StreamWriter<T>, StreamReader<T>) {
    let (tx, rx) = watch::channel(Snapshot {
        value: initial,
        done: false,
    });
    (StreamWriter { tx }, StreamReader { rx })
}

/// Producing side. Dropping the writer closes the stream.
#[derive(Debug)]
pub struct StreamWriter<T> {
    tx: watch::Sender<Snapshot<T>>,
}

impl<T> StreamWriter<T> {
    /// Replace the current value
    pub fn update(&self, value: T) -> Result<(), StreamError> {
        self.modify(|current| *current = value)
    }

    /// Mutate the current value in place and notify readers
    pub fn modify(&self, f: impl FnOnce(&mut T)) -> Result<(), StreamError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|snapshot| {
            if snapshot.done {
                result = Err(StreamError::Closed);
                return false;
            }
            f(&mut snapshot.value);
            true
        });
        result
    }

    /// Mark the stream finished. Idempotent.
    pub fn done(&self) {
        self.tx.send_if_modified(|snapshot| {
            let was_open = !snapshot.done;
            snapshot.done = true;
            was_open
        });
    }

    pub fn is_done(&self) -> bool {
        self.tx.borrow().done
    }

    /// Another reader on this stream
    pub fn reader(&self) -> StreamReader<T> {
        StreamReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T> Drop for StreamWriter<T> {
    fn drop(&mut self) {
        self.done();
    }
}

/// Consuming side; cheap to clone
#[derive(Debug, Clone)]
pub struct StreamReader<T> {
    rx: watch::Receiver<Snapshot<T>>,
}

impl<T: Clone> StreamReader<T> {
    pub fn get(&self) -> T {
        self.rx.borrow().value.clone()
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.rx.borrow().clone()
    }
}

impl<T> StreamReader<T> {
    pub fn is_done(&self) -> bool {
        self.rx.borrow().done
    }

    /// Wait until a value newer than the last seen one is published.
    /// Returns false once no further change can arrive.
    pub async fn changed(&mut self) -> bool {
        if self.rx.has_changed().unwrap_or(false) {
            self.rx.borrow_and_update();
            return true;
        }
        if self.rx.borrow().done {
            return false;
        }
        self.rx.changed().await.is_ok()
    }
}

impl<T> PartialEq for StreamReader<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rx.same_channel(&other.rx)
    }
}

// ============================================================================
// Text accumulators
// ============================================================================

pub type TextWriter = StreamWriter<String>;
pub type TextReader = StreamReader<String>;

pub fn text_stream() -> (TextWriter, TextReader) {
    streamable(String::new())
}

impl StreamWriter<String> {
    /// Append a fragment to the accumulated text
    pub fn append(&self, delta: &str) -> Result<(), StreamError> {
        self.modify(|text| text.push_str(delta))
    }
}

// ============================================================================
// Display artifact streams
// ============================================================================

pub type DisplayWriter = StreamWriter<Option<Artifact>>;
pub type DisplayReader = StreamReader<Option<Artifact>>;

pub fn display_stream() -> (DisplayWriter, DisplayReader) {
    streamable(None)
}

// ============================================================================
// Transcript (ordered UI sequence)
// ============================================================================

/// One entry of a turn's transcript
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    /// AI message rendered live from a text accumulator
    AiMessage(TextReader),
    /// Inline error artifact
    Error { title: String, message: String },
}

impl TranscriptEntry {
    pub fn to_json(&self) -> Value {
        match self {
            TranscriptEntry::AiMessage(text) => {
                let snapshot = text.snapshot();
                json!({
                    "type": "ai_message",
                    "text": snapshot.value,
                    "done": snapshot.done
                })
            }
            TranscriptEntry::Error { title, message } => json!({
                "type": "error",
                "title": title,
                "message": message
            }),
        }
    }
}

pub type TranscriptWriter = StreamWriter<Vec<TranscriptEntry>>;
pub type TranscriptReader = StreamReader<Vec<TranscriptEntry>>;

pub fn transcript_stream() -> (TranscriptWriter, TranscriptReader) {
    streamable(Vec::new())
}

impl StreamWriter<Vec<TranscriptEntry>> {
    pub fn push(&self, entry: TranscriptEntry) -> Result<(), StreamError> {
        self.modify(|entries| entries.push(entry))
    }
}

//! Per-turn state owned by the event router

use crate::feed::{EventKind, FeedError, StreamEvent};
use crate::render::ArtifactKind;
use crate::stream::{
    display_stream, transcript_stream, DisplayReader, DisplayWriter, TextWriter, TranscriptEntry,
    TranscriptReader, TranscriptWriter,
};
use std::collections::{HashMap, HashSet};

/// Title of the inline error shown when the feed breaks mid-turn
pub const CONNECTION_LOST_TITLE: &str = "Connection lost";

/// Tool selection progress for one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    /// No tool selected yet
    #[default]
    Idle,
    /// Loading artifact published; waiting for the tool result
    Selected { kind: ArtifactKind },
    /// Final artifact published and display closed
    Finalized { kind: ArtifactKind },
}

impl SelectionState {
    pub fn kind(&self) -> Option<ArtifactKind> {
        match self {
            SelectionState::Idle => None,
            SelectionState::Selected { kind } | SelectionState::Finalized { kind } => Some(*kind),
        }
    }
}

/// Mutable context of one turn. Created when the turn starts, dropped when
/// its feed closes; never shared across turns.
#[derive(Debug, Default)]
pub struct TurnContext {
    pub selection: SelectionState,
    /// One accumulator per run, created on the run's first token
    pub run_text_streams: HashMap<String, TextWriter>,
    /// Lifecycles already ended, keyed by end kind and run
    pub completed_runs: HashSet<(EventKind, String)>,
}

impl TurnContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an end event; true if this lifecycle already ended
    pub fn is_duplicate_end(&mut self, event: &StreamEvent) -> bool {
        event.kind.is_end() && !self.completed_runs.insert((event.kind, event.run_id.clone()))
    }

    /// Close every accumulator, keeping partial text as final
    pub fn close_streams(&mut self) {
        for writer in self.run_text_streams.values() {
            writer.done();
        }
    }
}

/// Output streams one turn writes to
#[derive(Debug)]
pub struct TurnSinks {
    pub display: DisplayWriter,
    pub transcript: TranscriptWriter,
}

impl TurnSinks {
    /// Fresh sinks plus the readers handed to consumers
    pub fn channel() -> (Self, DisplayReader, TranscriptReader) {
        let (display, display_reader) = display_stream();
        let (transcript, transcript_reader) = transcript_stream();
        (Self { display, transcript }, display_reader, transcript_reader)
    }

    /// Surface a broken feed as an inline error entry
    pub fn report_feed_error(&self, error: &FeedError) {
        let entry = TranscriptEntry::Error {
            title: CONNECTION_LOST_TITLE.to_string(),
            message: error.message.clone(),
        };
        if self.transcript.push(entry).is_err() {
            tracing::debug!("Transcript already closed; dropping feed error entry");
        }
    }

    pub fn close(&self) {
        self.display.done();
        self.transcript.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_end_detection() {
        let mut ctx = TurnContext::new();
        let end = StreamEvent::tool_end("t1", serde_json::Value::Null);
        assert!(!ctx.is_duplicate_end(&end));
        assert!(ctx.is_duplicate_end(&end));
        assert!(!ctx.is_duplicate_end(&StreamEvent::tool_end("t2", serde_json::Value::Null)));
        assert!(!ctx.is_duplicate_end(&StreamEvent::model_end("t1", vec![])));

        let progress = StreamEvent::tool_progress("t1");
        assert!(!ctx.is_duplicate_end(&progress));
        assert!(!ctx.is_duplicate_end(&progress));
    }

    #[test]
    fn test_report_feed_error_then_close() {
        let (sinks, display, transcript) = TurnSinks::channel();
        sinks.report_feed_error(&FeedError::interrupted("socket closed"));
        sinks.close();
        assert!(display.is_done());
        assert_eq!(display.get(), None);
        let entries = transcript.get();
        assert_eq!(
            entries,
            vec![TranscriptEntry::Error {
                title: CONNECTION_LOST_TITLE.to_string(),
                message: "socket closed".to_string(),
            }]
        );
        assert!(transcript.is_done());
    }
}

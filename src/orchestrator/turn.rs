//! Handles to a running turn

use super::router::RouterSummary;
use crate::stream::{DisplayReader, TranscriptEntry, TranscriptReader};
use tokio::task::JoinHandle;

/// Streams of one turn, readable while the turn is still running
#[derive(Debug)]
pub struct TurnOutput {
    pub id: String,
    /// Ordered UI sequence: AI messages and inline errors
    pub transcript: TranscriptReader,
    /// Rich artifact for the display pane
    pub display: DisplayReader,
    pub handle: JoinHandle<RouterSummary>,
}

impl TurnOutput {
    /// Final text of every AI message, in transcript order. Waits for the
    /// turn to finish.
    pub async fn reply_text(&self) -> String {
        final_reply(self.transcript.clone()).await
    }

    /// Wait for the turn task and return its summary
    pub async fn finish(self) -> Option<RouterSummary> {
        match self.handle.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::error!(turn_id = %self.id, error = %e, "Turn task failed");
                None
            }
        }
    }
}

/// Wait for a transcript to close and concatenate its AI messages
pub async fn final_reply(mut transcript: TranscriptReader) -> String {
    while !transcript.is_done() && transcript.changed().await {}

    let mut reply = String::new();
    for entry in transcript.get() {
        if let TranscriptEntry::AiMessage(mut text) = entry {
            while !text.is_done() && text.changed().await {}
            reply.push_str(&text.get());
        }
    }
    reply
}

//! Token stream multiplexer
//!
//! Routes token chunks into one text accumulator per run. The first token of
//! a run opens its accumulator and appends a live AI message to the turn's
//! transcript, so concurrent runs never share text.

use super::router::{EventHandler, HandlerError};
use super::state::{TurnContext, TurnSinks};
use crate::feed::{EventKind, Payload, StreamEvent};
use crate::stream::{text_stream, TranscriptEntry};
use std::collections::hash_map::Entry;

#[derive(Debug, Default)]
pub struct TokenStreamHandler;

impl EventHandler for TokenStreamHandler {
    fn name(&self) -> &'static str {
        "token_stream"
    }

    fn handle(
        &mut self,
        event: &StreamEvent,
        ctx: &mut TurnContext,
        sinks: &TurnSinks,
    ) -> Result<(), HandlerError> {
        if event.kind != EventKind::TokenChunk {
            return Ok(());
        }
        let Payload::TextDelta(delta) = &event.payload else {
            return Err(HandlerError::MalformedPayload {
                expected: "text delta",
                kind: event.kind,
            });
        };

        let writer = match ctx.run_text_streams.entry(event.run_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (writer, reader) = text_stream();
                sinks.transcript.push(TranscriptEntry::AiMessage(reader))?;
                tracing::debug!(run_id = %event.run_id, "Opened text stream for run");
                entry.insert(writer)
            }
        };
        writer.append(delta)?;
        Ok(())
    }
}

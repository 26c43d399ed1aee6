//! Server-Sent Events support
//!
//! Turns and the display pane are exposed as SSE. Each event carries a
//! complete value (the whole transcript, the whole artifact) so a client
//! that misses an event never renders a torn state.

use crate::orchestrator::TurnOutput;
use crate::render::Artifact;
use crate::session::ChatSession;
use crate::stream::{DisplayReader, TextReader, TranscriptEntry, TranscriptReader};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::future::{select_all, BoxFuture, FutureExt};
use futures::stream::{Stream, StreamExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;

fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(Duration::from_secs(15)).text("ping")
}

fn event(event_type: &str, data: &Value) -> Event {
    Event::default().event(event_type).data(data.to_string())
}

struct TurnStreamState {
    turn_id: String,
    transcript: TranscriptReader,
    display: DisplayReader,
    /// Readers for every AI message seen so far, in transcript order
    texts: Vec<TextReader>,
    tracked_entries: usize,
    last_transcript: Option<Value>,
    last_display: Option<Value>,
    pending: VecDeque<Event>,
    finished: bool,
}

impl TurnStreamState {
    fn new(turn: TurnOutput) -> Self {
        Self {
            turn_id: turn.id,
            transcript: turn.transcript,
            display: turn.display,
            texts: Vec::new(),
            tracked_entries: 0,
            last_transcript: None,
            last_display: None,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn track_new_texts(&mut self, entries: &[TranscriptEntry]) {
        for entry in entries.iter().skip(self.tracked_entries) {
            if let TranscriptEntry::AiMessage(text) = entry {
                self.texts.push(text.clone());
            }
        }
        self.tracked_entries = entries.len();
    }

    /// Queue events for whatever changed since the last emission
    fn collect(&mut self) {
        let entries = self.transcript.get();
        self.track_new_texts(&entries);

        let transcript = Value::Array(entries.iter().map(TranscriptEntry::to_json).collect());
        if self.last_transcript.as_ref() != Some(&transcript) {
            self.pending.push_back(event("transcript", &transcript));
            self.last_transcript = Some(transcript);
        }

        let display = serde_json::to_value(self.display.get()).unwrap_or(Value::Null);
        if self.last_display.as_ref() != Some(&display) {
            self.pending.push_back(event("display", &display));
            self.last_display = Some(display);
        }

        let all_done = self.transcript.is_done()
            && self.display.is_done()
            && self.texts.iter().all(TextReader::is_done);
        if all_done {
            self.pending
                .push_back(event("done", &json!({ "turn_id": self.turn_id })));
            self.finished = true;
        }
    }

    /// Wait until the transcript, the display, or any open text changes
    async fn wait(&mut self) {
        let mut waiters: Vec<BoxFuture<'_, bool>> = self
            .texts
            .iter_mut()
            .filter(|text| !text.is_done())
            .map(|text| text.changed().boxed())
            .collect();
        if !self.transcript.is_done() {
            waiters.push(self.transcript.changed().boxed());
        }
        if !self.display.is_done() {
            waiters.push(self.display.changed().boxed());
        }
        if waiters.is_empty() {
            return;
        }
        select_all(waiters).await;
    }
}

/// Stream one turn: `transcript` and `display` events as they change, then
/// a final `done`
pub fn turn_stream(turn: TurnOutput) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let state = TurnStreamState::new(turn);

    let events = futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            state.collect();
            if state.pending.is_empty() {
                state.wait().await;
            }
        }
    });

    Sse::new(events).keep_alive(keep_alive())
}

/// Stream the display pane: the current artifact now and after every change
pub fn display_stream(session: ChatSession) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = session.aggregator().subscribe();
    let events = subscription.into_stream().map(move |current: Option<Artifact>| {
        let artifact = session.display_for(current);
        let data = serde_json::to_value(&artifact).unwrap_or(Value::Null);
        Ok(event("display", &data))
    });

    Sse::new(events).keep_alive(keep_alive())
}

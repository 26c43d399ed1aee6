//! Wire decoding for the pipeline's server-sent event stream
//!
//! Frames are `event:`/`data:` line groups separated by a blank line. Each
//! `data` frame carries one run event shaped `{event, name, run_id, data}`.

use super::{EventKind, FeedError, Payload, StreamEvent, ToolCallProposal};
use serde::Deserialize;
use serde_json::Value;

/// One complete server-sent event frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Accumulates lines into frames
#[derive(Debug, Default)]
pub struct SseDecoder {
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed one line (without its terminator); returns a frame when a blank
    /// line completes one.
    pub fn push_line(&mut self, line: &str) -> Option<SseFrame> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return self.flush();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    /// Emit any partially accumulated frame (used when the body ends without
    /// a trailing blank line).
    pub fn flush(&mut self) -> Option<SseFrame> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = self.event.take().unwrap_or_else(|| "message".to_string());
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data })
    }
}

/// What a frame means for the feed
#[derive(Debug)]
pub enum FrameOutcome {
    Event(StreamEvent),
    Skip,
    End,
    Error(FeedError),
}

/// Run event as serialized by the pipeline
#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    run_id: String,
    #[serde(default)]
    data: Value,
}

pub fn decode_frame(frame: &SseFrame) -> FrameOutcome {
    match frame.event.as_str() {
        "end" => FrameOutcome::End,
        "error" => FrameOutcome::Error(FeedError::interrupted(format!(
            "Pipeline reported an error: {}",
            frame.data
        ))),
        "data" | "message" => match serde_json::from_str::<RawEvent>(&frame.data) {
            Ok(raw) => classify(raw).map_or(FrameOutcome::Skip, FrameOutcome::Event),
            Err(e) => FrameOutcome::Error(FeedError::decode(format!("Invalid event frame: {e}"))),
        },
        _ => FrameOutcome::Skip,
    }
}

fn classify(raw: RawEvent) -> Option<StreamEvent> {
    if raw.event == "on_chat_model_stream" {
        let text = raw
            .data
            .get("chunk")
            .and_then(|chunk| chunk.get("content"))
            .and_then(Value::as_str)?;
        // Tool-call chunks stream with empty content; they carry no text
        if text.is_empty() {
            return None;
        }
        return Some(StreamEvent {
            kind: EventKind::TokenChunk,
            run_id: raw.run_id,
            node_name: raw.name,
            payload: Payload::TextDelta(text.to_string()),
        });
    }

    let phase = raw.event.strip_prefix("on_chain_")?;
    let kind = match (raw.name.as_str(), phase) {
        (StreamEvent::MODEL_NODE, "end") => EventKind::ModelInvocationEnd,
        (StreamEvent::MODEL_NODE, "start" | "stream") => EventKind::ModelInvocationProgress,
        (StreamEvent::TOOL_NODE, "end") => EventKind::ToolInvocationEnd,
        (StreamEvent::TOOL_NODE, "start" | "stream") => EventKind::ToolInvocationProgress,
        _ => return None,
    };

    let output = raw.data.get("output");
    let payload = match kind {
        EventKind::ModelInvocationEnd => Payload::ToolCalls(tool_calls(output)),
        EventKind::ToolInvocationEnd => Payload::ToolResult(
            output
                .and_then(|o| o.get("tool_result"))
                .cloned()
                .unwrap_or(Value::Null),
        ),
        _ => Payload::Empty,
    };

    Some(StreamEvent {
        kind,
        run_id: raw.run_id,
        node_name: raw.name,
        payload,
    })
}

fn tool_calls(output: Option<&Value>) -> Vec<ToolCallProposal> {
    output
        .and_then(|o| o.get("tool_calls"))
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let kind = call.get("type").and_then(Value::as_str)?;
                    let args = call.get("args").cloned().unwrap_or(Value::Null);
                    Some(ToolCallProposal::new(kind, args))
                })
                .collect()
        })
        .unwrap_or_default()
}

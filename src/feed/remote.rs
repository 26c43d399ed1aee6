//! HTTP transport for the remote reasoning pipeline

use super::wire::{decode_frame, FrameOutcome, SseDecoder};
use super::{EventFeed, FeedError, PipelineClient, PipelineRequest, StreamEvent};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use serde_json::{json, Value};
use std::fmt::Display;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

/// Pipeline reached over HTTP, streaming run events as server-sent events
pub struct RemotePipeline {
    client: reqwest::Client,
    base_url: String,
}

impl RemotePipeline {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/stream_events", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PipelineClient for RemotePipeline {
    async fn stream_events(&self, request: &PipelineRequest) -> Result<EventFeed, FeedError> {
        let endpoint = self.endpoint();
        tracing::debug!(endpoint = %endpoint, history_len = request.history.len(), "Invoking pipeline");

        let response = self
            .client
            .post(&endpoint)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| FeedError::connect(format!("Failed to reach pipeline: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FeedError::http(format!("Pipeline returned {status}: {text}")));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let lines = FramedRead::new(StreamReader::new(bytes), LinesCodec::new());
        Ok(decode_lines(lines).boxed())
    }
}

/// Request body: prior turns followed by the new utterance
fn request_body(request: &PipelineRequest) -> Value {
    let mut messages: Vec<Value> = request
        .history
        .iter()
        .map(|entry| json!({ "type": entry.role.as_str(), "content": entry.content }))
        .collect();
    messages.push(json!({ "type": "human", "content": request.input }));

    json!({
        "input": { "input": messages },
        "config": {},
        "version": "v1"
    })
}

struct DecodeState<S> {
    lines: S,
    decoder: SseDecoder,
    finished: bool,
}

/// Turn a stream of body lines into pipeline events
fn decode_lines<S, E>(lines: S) -> impl Stream<Item = Result<StreamEvent, FeedError>> + Send + 'static
where
    S: Stream<Item = Result<String, E>> + Send + Unpin + 'static,
    E: Display,
{
    let state = DecodeState {
        lines,
        decoder: SseDecoder::default(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        while !state.finished {
            let frame = match state.lines.next().await {
                Some(Ok(line)) => state.decoder.push_line(&line),
                Some(Err(e)) => {
                    state.finished = true;
                    let error = FeedError::interrupted(format!("Pipeline stream failed: {e}"));
                    return Some((Err(error), state));
                }
                None => {
                    state.finished = true;
                    state.decoder.flush()
                }
            };

            let Some(frame) = frame else { continue };
            match decode_frame(&frame) {
                FrameOutcome::Event(event) => return Some((Ok(event), state)),
                FrameOutcome::Skip => {}
                FrameOutcome::End => state.finished = true,
                FrameOutcome::Error(e) => {
                    if e.kind.is_terminal() {
                        state.finished = true;
                    }
                    return Some((Err(e), state));
                }
            }
        }
        None
    })
}

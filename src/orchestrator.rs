//! Streaming orchestration of one conversational turn
//!
//! A turn invokes the pipeline, then routes its event feed through the
//! standard handlers: tool selection publishes the display artifact, the
//! token multiplexer builds the transcript. Both outputs are readable live
//! while the turn runs.

mod multiplexer;
mod router;
mod selection;
mod state;
mod turn;

#[cfg(test)]
mod proptests;

pub use multiplexer::TokenStreamHandler;
pub use router::{EventHandler, EventRouter, HandlerError, RouterSummary, ToolSelectionHandler};
pub use selection::{transition, SelectionEffect, SelectionTransition};
pub use state::{SelectionState, TurnContext, TurnSinks, CONNECTION_LOST_TITLE};
pub use turn::{final_reply, TurnOutput};

use crate::feed::{PipelineClient, PipelineRequest};
use crate::render::ToolRenderers;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Starts turns against one pipeline with one renderer configuration
#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<dyn PipelineClient>,
    renderers: ToolRenderers,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn PipelineClient>, renderers: ToolRenderers) -> Self {
        Self { client, renderers }
    }

    pub fn renderers(&self) -> &ToolRenderers {
        &self.renderers
    }

    /// Spawn the turn and return its output streams immediately
    pub fn start_turn(&self, request: PipelineRequest) -> TurnOutput {
        let id = Uuid::new_v4().to_string();
        let (sinks, display, transcript) = TurnSinks::channel();
        let client = Arc::clone(&self.client);
        let router = EventRouter::standard(self.renderers.clone());
        let span = tracing::info_span!("turn", turn_id = %id);

        let handle = tokio::spawn(
            async move {
                tracing::info!(history_len = request.history.len(), "Turn started");
                let summary = match client.stream_events(&request).await {
                    Ok(feed) => router.run(feed, TurnContext::new(), sinks).await,
                    Err(e) => {
                        tracing::error!(error = %e, kind = ?e.kind, "Failed to open pipeline feed");
                        sinks.report_feed_error(&e);
                        sinks.close();
                        RouterSummary {
                            feed_error: Some(e),
                            ..RouterSummary::default()
                        }
                    }
                };
                tracing::info!(
                    events = summary.events,
                    handler_failures = summary.handler_failures,
                    failed = summary.feed_error.is_some(),
                    "Turn finished"
                );
                summary
            }
            .instrument(span),
        );

        TurnOutput {
            id,
            transcript,
            display,
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::MockPipeline;
    use crate::feed::{FeedError, HistoryEntry, StreamEvent, ToolCallProposal};
    use crate::render::Artifact;
    use crate::stream::TranscriptEntry;
    use serde_json::json;

    fn request(input: &str) -> PipelineRequest {
        PipelineRequest {
            history: vec![HistoryEntry::ai("Welcome")],
            input: input.to_string(),
        }
    }

    #[tokio::test]
    async fn test_turn_streams_reply_and_display() {
        let pipeline = Arc::new(MockPipeline::new());
        pipeline.queue_events(vec![
            StreamEvent::model_end(
                "m1",
                vec![ToolCallProposal::new("product-details", json!({"product_id": "7"}))],
            ),
            StreamEvent::tool_end("t1", json!({"name": "X"})),
            StreamEvent::token("m2", "Here are "),
            StreamEvent::token("m2", "the details."),
        ]);
        let orchestrator = Orchestrator::new(pipeline.clone(), ToolRenderers::default());

        let turn = orchestrator.start_turn(request("tell me about 7"));
        assert_eq!(turn.reply_text().await, "Here are the details.");
        assert!(matches!(turn.display.get(), Some(Artifact::ProductDetail(_))));

        let summary = turn.finish().await.unwrap();
        assert_eq!(summary.events, 4);
        assert_eq!(pipeline.recorded_requests()[0].input, "tell me about 7");
    }

    #[tokio::test]
    async fn test_connect_failure_renders_inline_error() {
        let pipeline = Arc::new(MockPipeline::new());
        pipeline.queue_error(FeedError::connect("refused"));
        let orchestrator = Orchestrator::new(pipeline, ToolRenderers::default());

        let turn = orchestrator.start_turn(request("hi"));
        assert_eq!(turn.reply_text().await, "");
        assert!(turn.display.is_done());
        assert!(matches!(
            turn.transcript.get().as_slice(),
            [TranscriptEntry::Error { message, .. }] if message == "refused"
        ));
        assert!(turn.finish().await.unwrap().feed_error.is_some());
    }

    #[tokio::test]
    async fn test_turns_have_distinct_ids() {
        let pipeline = Arc::new(MockPipeline::new());
        pipeline.queue_events(vec![]);
        pipeline.queue_events(vec![]);
        let orchestrator = Orchestrator::new(pipeline, ToolRenderers::default());
        let first = orchestrator.start_turn(request("a"));
        let second = orchestrator.start_turn(request("b"));
        assert_ne!(first.id, second.id);
        first.finish().await;
        second.finish().await;
    }
}

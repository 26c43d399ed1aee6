//! Event feed from the remote reasoning pipeline
//!
//! The pipeline is an opaque producer: one invocation per user turn, yielding
//! an ordered feed of lifecycle and token events. This module owns the event
//! model and the client seam; the orchestrator is a pure consumer.

mod error;
mod event;
mod remote;
mod wire;

#[cfg(test)]
pub mod testing;

pub use error::{FeedError, FeedErrorKind};
pub use event::{EventKind, HistoryEntry, Payload, PipelineRequest, Role, StreamEvent, ToolCallProposal};
pub use remote::RemotePipeline;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Ordered feed of events for one turn
pub type EventFeed = BoxStream<'static, Result<StreamEvent, FeedError>>;

/// Common interface for pipeline transports
#[async_trait]
pub trait PipelineClient: Send + Sync {
    /// Invoke the pipeline for one turn and return its live event feed
    async fn stream_events(&self, request: &PipelineRequest) -> Result<EventFeed, FeedError>;
}

#[async_trait]
impl<T: PipelineClient + ?Sized> PipelineClient for Arc<T> {
    async fn stream_events(&self, request: &PipelineRequest) -> Result<EventFeed, FeedError> {
        (**self).stream_events(request).await
    }
}

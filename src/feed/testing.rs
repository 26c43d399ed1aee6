//! Mock pipeline implementations for testing

use super::{EventFeed, FeedError, PipelineClient, PipelineRequest, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Build a feed that yields the given events and then closes
pub fn scripted_feed(events: Vec<StreamEvent>) -> EventFeed {
    futures::stream::iter(events.into_iter().map(Ok)).boxed()
}

/// Build a live feed driven by the returned sender; dropping the sender
/// closes the feed.
pub fn live_feed() -> (mpsc::UnboundedSender<Result<StreamEvent, FeedError>>, EventFeed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, UnboundedReceiverStream::new(rx).boxed())
}

/// Pipeline that hands out queued feeds in order
pub struct MockPipeline {
    feeds: Mutex<VecDeque<Result<EventFeed, FeedError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<PipelineRequest>>,
}

#[allow(dead_code)]
impl MockPipeline {
    pub fn new() -> Self {
        Self {
            feeds: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a scripted feed
    pub fn queue_events(&self, events: Vec<StreamEvent>) {
        self.feeds.lock().unwrap().push_back(Ok(scripted_feed(events)));
    }

    /// Queue an arbitrary feed
    pub fn queue_feed(&self, feed: EventFeed) {
        self.feeds.lock().unwrap().push_back(Ok(feed));
    }

    /// Queue a connection failure
    pub fn queue_error(&self, error: FeedError) {
        self.feeds.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<PipelineRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineClient for MockPipeline {
    async fn stream_events(&self, request: &PipelineRequest) -> Result<EventFeed, FeedError> {
        self.requests.lock().unwrap().push(request.clone());
        self.feeds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FeedError::connect("No mock feed queued")))
    }
}

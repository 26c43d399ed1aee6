//! Stream aggregator
//!
//! Holds the display streams of every turn that produced display activity,
//! in append order, and derives the artifact to show: the latest value of
//! the highest-indexed stream that is non-empty. Recency is positional, so
//! an old turn finishing late never overrides a newer turn's artifact.

use crate::render::Artifact;
use crate::stream::DisplayReader;
use futures::future::select_all;
use futures::Stream;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

#[derive(Debug)]
struct Inner {
    streams: Mutex<Vec<DisplayReader>>,
    /// Bumped on every append/reset, under the `streams` lock
    revision: watch::Sender<u64>,
}

/// Ordered, append-only set of display streams; cheap to clone
#[derive(Debug, Clone)]
pub struct DisplayAggregator {
    inner: Arc<Inner>,
}

impl Default for DisplayAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn current_of(streams: &[DisplayReader]) -> Option<Artifact> {
    streams.iter().rev().find_map(DisplayReader::get)
}

impl DisplayAggregator {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                streams: Mutex::new(Vec::new()),
                revision,
            }),
        }
    }

    fn streams(&self) -> MutexGuard<'_, Vec<DisplayReader>> {
        self.inner.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, stream: DisplayReader) {
        let mut streams = self.streams();
        streams.push(stream);
        self.inner.revision.send_modify(|rev| *rev += 1);
        tracing::debug!(len = streams.len(), "Display stream appended");
    }

    /// Drop every stream. In-flight turns keep writing to their own
    /// streams, but nothing here observes them any more.
    pub fn reset(&self) {
        let mut streams = self.streams();
        streams.clear();
        self.inner.revision.send_modify(|rev| *rev += 1);
        tracing::debug!("Display aggregator reset");
    }

    pub fn current_artifact(&self) -> Option<Artifact> {
        current_of(&self.streams())
    }

    pub fn len(&self) -> usize {
        self.streams().len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams().is_empty()
    }

    /// Follow the current artifact as it changes
    pub fn subscribe(&self) -> AggregatorSubscription {
        let mut revision = self.inner.revision.subscribe();
        revision.borrow_and_update();
        AggregatorSubscription {
            aggregator: self.clone(),
            revision,
            readers: self.streams().clone(),
            last: None,
        }
    }
}

/// Live view of the aggregator's current artifact
#[derive(Debug)]
pub struct AggregatorSubscription {
    aggregator: DisplayAggregator,
    revision: watch::Receiver<u64>,
    /// Own copies of the readers, replaced wholesale on every revision
    readers: Vec<DisplayReader>,
    last: Option<Option<Artifact>>,
}

impl AggregatorSubscription {
    /// The current artifact on first call; afterwards, wait for it to take
    /// a different value and return that.
    pub async fn next(&mut self) -> Option<Artifact> {
        loop {
            if self.revision.has_changed().unwrap_or(false) {
                self.revision.borrow_and_update();
                self.readers = self.aggregator.streams().clone();
            }

            let current = current_of(&self.readers);
            if self.last.as_ref() != Some(&current) {
                self.last = Some(current.clone());
                return current;
            }
            self.wait_for_change().await;
        }
    }

    /// Wait for a list change or an update on any still-open stream
    async fn wait_for_change(&mut self) {
        let waiters: Vec<_> = self
            .readers
            .iter_mut()
            .filter(|reader| !reader.is_done())
            .map(|reader| Box::pin(reader.changed()))
            .collect();

        if waiters.is_empty() {
            wait_revision(&mut self.revision).await;
            return;
        }
        tokio::select! {
            () = wait_revision(&mut self.revision) => {}
            _ = select_all(waiters) => {}
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Option<Artifact>> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            let artifact = subscription.next().await;
            Some((artifact, subscription))
        })
    }
}

async fn wait_revision(revision: &mut watch::Receiver<u64>) {
    if revision.changed().await.is_err() {
        // Aggregator gone; the list can no longer change
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ArtifactKind;
    use crate::stream::display_stream;
    use std::time::Duration;

    fn loading(kind: ArtifactKind) -> Option<Artifact> {
        Some(Artifact::Loading { kind })
    }

    fn final_artifact(title: &str) -> Option<Artifact> {
        Some(Artifact::error(title, "done"))
    }

    #[test]
    fn test_empty_aggregator_has_no_artifact() {
        let aggregator = DisplayAggregator::new();
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.current_artifact(), None);
    }

    #[test]
    fn test_recency_is_positional() {
        let aggregator = DisplayAggregator::new();
        let (first, first_reader) = display_stream();
        let (second, second_reader) = display_stream();
        aggregator.append(first_reader);
        aggregator.append(second_reader);

        first.update(final_artifact("first")).unwrap();
        assert_eq!(aggregator.current_artifact(), final_artifact("first"));

        second.update(final_artifact("second")).unwrap();
        assert_eq!(aggregator.current_artifact(), final_artifact("second"));

        // A later update to an older stream does not win
        first.update(final_artifact("first again")).unwrap();
        assert_eq!(aggregator.current_artifact(), final_artifact("second"));
    }

    #[test]
    fn test_empty_stream_after_non_empty_changes_nothing() {
        let aggregator = DisplayAggregator::new();
        let (first, first_reader) = display_stream();
        first.update(final_artifact("first")).unwrap();
        aggregator.append(first_reader);

        let (second, second_reader) = display_stream();
        aggregator.append(second_reader);
        assert_eq!(aggregator.len(), 2);
        assert_eq!(aggregator.current_artifact(), final_artifact("first"));

        // A closed stream that never published stays invisible
        second.done();
        assert_eq!(aggregator.current_artifact(), final_artifact("first"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let aggregator = DisplayAggregator::new();
        let (writer, reader) = display_stream();
        writer.update(final_artifact("x")).unwrap();
        aggregator.append(reader);
        aggregator.reset();
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.current_artifact(), None);

        // Orphaned stream updates are not observed
        writer.update(final_artifact("late")).unwrap();
        assert_eq!(aggregator.current_artifact(), None);
    }

    #[test]
    fn test_two_turns_second_wins_while_first_open() {
        let aggregator = DisplayAggregator::new();
        let (turn1, reader1) = display_stream();
        aggregator.append(reader1);
        turn1.update(loading(ArtifactKind::ProductDetails)).unwrap();

        let (turn2, reader2) = display_stream();
        aggregator.append(reader2);
        turn2.update(loading(ArtifactKind::ProductTiles)).unwrap();
        turn2.update(final_artifact("tiles")).unwrap();
        turn2.done();

        turn1.update(final_artifact("details")).unwrap();
        turn1.done();
        assert_eq!(aggregator.current_artifact(), final_artifact("tiles"));
    }

    #[tokio::test]
    async fn test_subscription_yields_distinct_changes() {
        let aggregator = DisplayAggregator::new();
        let mut subscription = aggregator.subscribe();
        assert_eq!(subscription.next().await, None);

        let (writer, reader) = display_stream();
        aggregator.append(reader);
        writer.update(loading(ArtifactKind::ProductTiles)).unwrap();
        assert_eq!(subscription.next().await, loading(ArtifactKind::ProductTiles));

        let pending = tokio::time::timeout(Duration::from_millis(20), subscription.next()).await;
        assert!(pending.is_err(), "no change should be reported");

        let waiter = tokio::spawn(async move {
            let artifact = subscription.next().await;
            (artifact, subscription)
        });
        tokio::task::yield_now().await;
        writer.update(final_artifact("tiles")).unwrap();
        let (artifact, mut subscription) = waiter.await.unwrap();
        assert_eq!(artifact, final_artifact("tiles"));

        aggregator.reset();
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn test_subscription_ignores_orphaned_streams() {
        let aggregator = DisplayAggregator::new();
        let (old, old_reader) = display_stream();
        aggregator.append(old_reader);
        let mut subscription = aggregator.subscribe();
        assert_eq!(subscription.next().await, None);

        aggregator.reset();
        old.update(final_artifact("orphan")).unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(20), subscription.next()).await;
        assert!(pending.is_err());
    }
}

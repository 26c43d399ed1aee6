//! Client session
//!
//! Ties the pieces together for one conversation: persisted history, turns
//! started through the orchestrator, the display aggregator over every
//! turn's display stream, and the carousel over the catalog.

use crate::aggregator::DisplayAggregator;
use crate::carousel::CarouselHandle;
use crate::catalog::Catalog;
use crate::db::{self, Database};
use crate::feed::{HistoryEntry, PipelineRequest};
use crate::orchestrator::{final_reply, Orchestrator, TurnOutput};
use crate::render::Artifact;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Greeting shown when history cannot be loaded
pub const FALLBACK_GREETING: &str = "Welcome! How can I help you today?";

#[derive(Clone)]
pub struct ChatSession {
    orchestrator: Orchestrator,
    db: Database,
    catalog: Catalog,
    product_type: String,
    aggregator: DisplayAggregator,
    carousel: CarouselHandle,
    products: Arc<Mutex<Vec<Value>>>,
    /// Bumped by `reset`; turns started under an older value are orphaned.
    /// Held across the history write it guards.
    generation: Arc<Mutex<u64>>,
}

impl ChatSession {
    pub fn new(
        orchestrator: Orchestrator,
        db: Database,
        catalog: Catalog,
        product_type: impl Into<String>,
        carousel: CarouselHandle,
    ) -> Self {
        Self {
            orchestrator,
            db,
            catalog,
            product_type: product_type.into(),
            aggregator: DisplayAggregator::new(),
            carousel,
            products: Arc::new(Mutex::new(Vec::new())),
            generation: Arc::new(Mutex::new(0)),
        }
    }

    pub fn product_type(&self) -> &str {
        &self.product_type
    }

    pub fn aggregator(&self) -> &DisplayAggregator {
        &self.aggregator
    }

    pub fn carousel(&self) -> &CarouselHandle {
        &self.carousel
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn products_lock(&self) -> MutexGuard<'_, Vec<Value>> {
        lock(&self.products)
    }

    fn greeting(&self) -> String {
        db::greeting(&self.product_type)
    }

    /// Prior messages, oldest first. Never fails: a broken store yields the
    /// fallback greeting.
    pub fn history(&self) -> Vec<HistoryEntry> {
        match self.db.load_history(&self.greeting()) {
            Ok(records) => records.into_iter().map(HistoryEntry::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load history, using fallback greeting");
                vec![HistoryEntry::ai(FALLBACK_GREETING)]
            }
        }
    }

    /// Start a turn for the user's input
    pub fn submit(&self, input: impl Into<String>) -> TurnOutput {
        let input = input.into();
        let history = self.history();
        if let Err(e) = self.db.append(&HistoryEntry::human(input.clone())) {
            tracing::warn!(error = %e, "Failed to persist user message");
        }

        let turn = self.orchestrator.start_turn(PipelineRequest { history, input });
        // Every turn is appended at start, text-only ones included, so
        // positional order matches turn order. A stream that never publishes
        // is skipped when deriving the current artifact.
        self.aggregator.append(turn.display.clone());

        let db = self.db.clone();
        let transcript = turn.transcript.clone();
        let turn_id = turn.id.clone();
        let generation = Arc::clone(&self.generation);
        let started_in = *lock(&generation);
        tokio::spawn(async move {
            let reply = final_reply(transcript).await;
            if !reply.is_empty() {
                persist_reply(&db, &generation, started_in, &turn_id, reply);
            }
        });

        turn
    }

    /// Start over: fresh history, no artifacts, carousel back to autoplay
    pub async fn reset(&self) -> Vec<HistoryEntry> {
        let history = {
            let mut generation = lock(&self.generation);
            *generation += 1;
            match self.db.reset(&self.greeting()) {
                Ok(records) => records.into_iter().map(HistoryEntry::from).collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to reset history, using fallback greeting");
                    vec![HistoryEntry::ai(FALLBACK_GREETING)]
                }
            }
        };
        self.aggregator.reset();
        self.carousel.clear_manual_navigation().await;
        tracing::info!("Conversation reset");
        history
    }

    /// Reload the catalog and reseed the carousel. Failures yield an empty
    /// catalog.
    pub async fn refresh_catalog(&self) -> Vec<Value> {
        let products = match self.catalog.products(&self.product_type).await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(error = %e, product_type = %self.product_type, "Failed to load catalog");
                Vec::new()
            }
        };
        *self.products_lock() = products.clone();
        self.carousel.replace_items(products.len()).await;
        tracing::info!(count = products.len(), "Catalog loaded");
        products
    }

    pub fn products(&self) -> Vec<Value> {
        self.products_lock().clone()
    }

    /// Artifact for the display pane: the aggregator's current artifact, or
    /// the catalog carousel before any turn produced one
    pub fn display(&self) -> Artifact {
        self.display_for(self.aggregator.current_artifact())
    }

    /// Resolve an aggregator value to what the display pane shows
    pub fn display_for(&self, current: Option<Artifact>) -> Artifact {
        current.unwrap_or_else(|| {
            self.orchestrator
                .renderers()
                .default_carousel(&self.products_lock())
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Append a finished reply unless the conversation was reset since the
/// turn started
fn persist_reply(db: &Database, generation: &Mutex<u64>, started_in: u64, turn_id: &str, reply: String) {
    let current = lock(generation);
    if *current != started_in {
        tracing::info!(turn_id = %turn_id, "Conversation was reset, dropping reply");
        return;
    }
    if let Err(e) = db.append(&HistoryEntry::ai(reply)) {
        tracing::warn!(turn_id = %turn_id, error = %e, "Failed to persist assistant reply");
    }
}

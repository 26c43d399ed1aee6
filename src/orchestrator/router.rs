//! Event router
//!
//! Pulls one turn's feed event by event and hands each event to every
//! registered handler in registration order. A failing handler is logged
//! and skipped; it never stops delivery to other handlers or later events.

use super::multiplexer::TokenStreamHandler;
use super::selection::{self, SelectionEffect, SelectionTransition};
use super::state::{TurnContext, TurnSinks};
use crate::feed::{EventFeed, EventKind, FeedError, StreamEvent};
use crate::render::{SelectionError, ToolRenderers};
use crate::stream::StreamError;
use futures::StreamExt;
use thiserror::Error;

/// Failure of one handler on one event
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("Expected {expected} payload on {kind:?} event")]
    MalformedPayload { expected: &'static str, kind: EventKind },
    #[error("Output stream rejected write: {0}")]
    Stream(#[from] StreamError),
}

/// Classifier invoked for every event of a turn. Must not block.
pub trait EventHandler: Send {
    fn name(&self) -> &'static str;

    fn handle(
        &mut self,
        event: &StreamEvent,
        ctx: &mut TurnContext,
        sinks: &TurnSinks,
    ) -> Result<(), HandlerError>;
}

/// Drives the tool selection state machine and applies its effects
#[derive(Debug)]
pub struct ToolSelectionHandler {
    renderers: ToolRenderers,
}

impl ToolSelectionHandler {
    pub fn new(renderers: ToolRenderers) -> Self {
        Self { renderers }
    }
}

impl EventHandler for ToolSelectionHandler {
    fn name(&self) -> &'static str {
        "tool_selection"
    }

    fn handle(
        &mut self,
        event: &StreamEvent,
        ctx: &mut TurnContext,
        sinks: &TurnSinks,
    ) -> Result<(), HandlerError> {
        let SelectionTransition { new_state, effects } =
            selection::transition(&ctx.selection, &self.renderers, event)?;

        if new_state != ctx.selection {
            tracing::debug!(from = ?ctx.selection, to = ?new_state, run_id = %event.run_id, "Tool selection advanced");
        }
        ctx.selection = new_state;

        for effect in effects {
            match effect {
                SelectionEffect::PublishDisplay(artifact) => sinks.display.update(Some(artifact))?,
                SelectionEffect::CloseDisplay => sinks.display.done(),
            }
        }
        Ok(())
    }
}

/// Outcome of routing one turn's feed
#[derive(Debug, Default)]
pub struct RouterSummary {
    /// Events delivered to handlers, duplicates excluded
    pub events: usize,
    pub handler_failures: usize,
    /// Set when the feed terminated abnormally
    pub feed_error: Option<FeedError>,
}

pub struct EventRouter {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl EventRouter {
    pub fn new(handlers: Vec<Box<dyn EventHandler>>) -> Self {
        Self { handlers }
    }

    /// Tool selection first, then token streaming
    pub fn standard(renderers: ToolRenderers) -> Self {
        Self::new(vec![
            Box::new(ToolSelectionHandler::new(renderers)),
            Box::new(TokenStreamHandler),
        ])
    }

    /// Route the feed to completion. Consumes the turn context; every
    /// stream is closed on return, whether the feed ended or failed.
    pub async fn run(mut self, mut feed: EventFeed, mut ctx: TurnContext, sinks: TurnSinks) -> RouterSummary {
        let mut summary = RouterSummary::default();

        while let Some(item) = feed.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) if e.kind.is_terminal() => {
                    tracing::error!(error = %e, kind = ?e.kind, "Pipeline feed failed");
                    sinks.report_feed_error(&e);
                    summary.feed_error = Some(e);
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable pipeline event");
                    continue;
                }
            };

            if ctx.is_duplicate_end(&event) {
                tracing::debug!(kind = ?event.kind, run_id = %event.run_id, "Dropping duplicate end event");
                continue;
            }
            summary.events += 1;

            for handler in &mut self.handlers {
                if let Err(e) = handler.handle(&event, &mut ctx, &sinks) {
                    summary.handler_failures += 1;
                    tracing::warn!(
                        handler = handler.name(),
                        kind = ?event.kind,
                        run_id = %event.run_id,
                        error = %e,
                        "Event handler failed"
                    );
                }
            }
        }

        ctx.close_streams();
        sinks.close();
        summary
    }
}

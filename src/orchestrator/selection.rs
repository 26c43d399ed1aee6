//! Tool selection state machine
//!
//! `Idle -> Selected -> Finalized`, driven only by end events. Selection is
//! irrevocable for the rest of the turn: later proposals never replace the
//! artifact already shown.

use super::state::SelectionState;
use crate::feed::{EventKind, Payload, StreamEvent};
use crate::render::{Artifact, SelectionError, ToolRenderers};
use serde_json::Value;

static NO_RESULT: Value = Value::Null;

/// Side effects on the turn's display stream
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEffect {
    PublishDisplay(Artifact),
    CloseDisplay,
}

#[derive(Debug)]
pub struct SelectionTransition {
    pub new_state: SelectionState,
    pub effects: Vec<SelectionEffect>,
}

impl SelectionTransition {
    fn unchanged(state: SelectionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }
}

/// Pure transition function. An error leaves the state as it was.
pub fn transition(
    state: &SelectionState,
    renderers: &ToolRenderers,
    event: &StreamEvent,
) -> Result<SelectionTransition, SelectionError> {
    match (state, event.kind) {
        (SelectionState::Idle, EventKind::ModelInvocationEnd) => {
            let Payload::ToolCalls(calls) = &event.payload else {
                return Err(SelectionError::NoToolCalls);
            };
            // Text-only reply
            let Some(first) = calls.first() else {
                return Ok(SelectionTransition::unchanged(*state));
            };
            let kind = renderers.resolve(&first.kind)?;
            Ok(SelectionTransition {
                new_state: SelectionState::Selected { kind },
                effects: vec![SelectionEffect::PublishDisplay(renderers.loading(kind))],
            })
        }

        (SelectionState::Selected { kind }, EventKind::ToolInvocationEnd) => {
            let result = match &event.payload {
                Payload::ToolResult(result) => result,
                _ => &NO_RESULT,
            };
            Ok(SelectionTransition {
                new_state: SelectionState::Finalized { kind: *kind },
                effects: vec![
                    SelectionEffect::PublishDisplay(renderers.finalize(*kind, result)),
                    SelectionEffect::CloseDisplay,
                ],
            })
        }

        // Progress events, tokens, late proposals, and results with no
        // selection all leave the state alone
        _ => Ok(SelectionTransition::unchanged(*state)),
    }
}

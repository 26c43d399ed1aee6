//! Property-based tests for turn orchestration
//!
//! Selection happens at most once per turn whatever the feed looks like, and
//! per-run text is the in-order concatenation of that run's deltas.

use super::*;
use crate::feed::testing::scripted_feed;
use crate::feed::{EventKind, StreamEvent, ToolCallProposal};
use crate::render::Artifact;
use crate::stream::TranscriptEntry;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashMap;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tool_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("product-details".to_string()),
        Just("product-comparison".to_string()),
        Just("product-tiles".to_string()),
        Just("product-carousel".to_string()),
        Just("weather".to_string()),
    ]
}

fn arb_run_id() -> impl Strategy<Value = String> {
    prop_oneof![Just("r1".to_string()), Just("r2".to_string()), Just("r3".to_string())]
}

fn arb_event() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        arb_run_id().prop_map(StreamEvent::model_progress),
        (arb_run_id(), prop::collection::vec(arb_tool_name(), 0..3)).prop_map(|(run, names)| {
            StreamEvent::model_end(
                run,
                names
                    .into_iter()
                    .map(|name| ToolCallProposal::new(name, json!({})))
                    .collect(),
            )
        }),
        arb_run_id().prop_map(StreamEvent::tool_progress),
        (arb_run_id(), "[a-zA-Z]{0,8}")
            .prop_map(|(run, name)| StreamEvent::tool_end(run, json!({"name": name}))),
        (arb_run_id(), "[a-z ]{1,6}").prop_map(|(run, text)| StreamEvent::token(run, text)),
    ]
}

fn route(events: Vec<StreamEvent>) -> (RouterSummary, Option<Artifact>, bool, Vec<TranscriptEntry>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let (sinks, display, transcript) = TurnSinks::channel();
        let summary = EventRouter::standard(ToolRenderers::default())
            .run(scripted_feed(events), TurnContext::new(), sinks)
            .await;
        (summary, display.get(), display.is_done(), transcript.get())
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn selection_advances_at_most_once(events in prop::collection::vec(arb_event(), 0..24)) {
        let renderers = ToolRenderers::default();
        let mut state = SelectionState::Idle;
        let mut selections = 0;
        let mut finalizations = 0;
        let mut publishes = 0;

        for event in &events {
            let Ok(result) = transition(&state, &renderers, event) else {
                continue;
            };
            match (state, result.new_state) {
                (SelectionState::Idle, SelectionState::Selected { .. }) => selections += 1,
                (SelectionState::Selected { kind: a }, SelectionState::Finalized { kind: b }) => {
                    prop_assert_eq!(a, b);
                    finalizations += 1;
                }
                (before, after) => prop_assert_eq!(before, after),
            }
            publishes += result
                .effects
                .iter()
                .filter(|e| matches!(e, SelectionEffect::PublishDisplay(_)))
                .count();
            state = result.new_state;
        }

        prop_assert!(selections <= 1);
        prop_assert!(finalizations <= selections);
        prop_assert_eq!(publishes, selections + finalizations);
    }

    #[test]
    fn run_text_is_in_order_concatenation(events in prop::collection::vec(arb_event(), 0..24)) {
        let mut expected: Vec<(String, String)> = Vec::new();
        for event in &events {
            if event.kind != EventKind::TokenChunk {
                continue;
            }
            let crate::feed::Payload::TextDelta(delta) = &event.payload else {
                continue;
            };
            match expected.iter_mut().find(|(run, _)| *run == event.run_id) {
                Some((_, text)) => text.push_str(delta),
                None => expected.push((event.run_id.clone(), delta.clone())),
            }
        }

        let (_, _, _, transcript) = route(events);
        let actual: Vec<String> = transcript
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::AiMessage(reader) => {
                    assert!(reader.is_done());
                    Some(reader.get())
                }
                TranscriptEntry::Error { .. } => None,
            })
            .collect();
        let expected: Vec<String> = expected.into_iter().map(|(_, text)| text).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn streams_always_close(events in prop::collection::vec(arb_event(), 0..24)) {
        let mut distinct_ends = HashMap::new();
        for event in &events {
            if event.kind.is_end() {
                *distinct_ends.entry((event.kind, event.run_id.clone())).or_insert(0) += 1;
            }
        }
        let duplicates: usize = distinct_ends.values().map(|n| n - 1).sum();

        let total = events.len();
        let (summary, _, display_done, _) = route(events);
        prop_assert!(display_done);
        prop_assert_eq!(summary.events, total - duplicates);
        prop_assert!(summary.feed_error.is_none());
    }
}

//! Property-based tests for the carousel machine
//!
//! Random interleavings of navigation, hover, item replacement and timer
//! firings must keep the index in range and never leave two timers pending.

use super::*;
use proptest::prelude::*;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Step {
    /// Advance the clock, firing the pending timer if it is due
    Wait(u64),
    Event(CarouselEvent),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u64..15_000).prop_map(Step::Wait),
        Just(Step::Event(CarouselEvent::Next)),
        Just(Step::Event(CarouselEvent::Prev)),
        (0usize..8).prop_map(|i| Step::Event(CarouselEvent::JumpTo(i))),
        Just(Step::Event(CarouselEvent::PointerEnter)),
        Just(Step::Event(CarouselEvent::PointerLeave)),
        (0usize..6).prop_map(|len| Step::Event(CarouselEvent::ItemsReplaced { len })),
        Just(Step::Event(CarouselEvent::ClearManualNavigation)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn invariants_hold(len in 0usize..6, steps in prop::collection::vec(arb_step(), 0..40)) {
        let timing = CarouselTiming::default();
        let mut now = tokio::time::Instant::now();
        let mut state = transition(&CarouselState::new(len), CarouselEvent::ItemsReplaced { len }, now, &timing).new_state;
        // Timer as tracked by a driver applying effects
        let mut armed: Option<(u64, tokio::time::Instant)> = state.timer.map(|t| (t.id, t.deadline));

        for step in steps {
            let event = match step {
                Step::Wait(ms) => {
                    let target = now + Duration::from_millis(ms);
                    match armed {
                        Some((id, deadline)) if deadline <= target => {
                            now = deadline;
                            // Firing consumes the driver's slot
                            armed = None;
                            CarouselEvent::TimerFired { id }
                        }
                        _ => {
                            now = target;
                            continue;
                        }
                    }
                }
                Step::Event(event) => event,
            };

            let result = transition(&state, event, now, &timing);
            let arms = result.effects.iter().filter(|e| matches!(e, CarouselEffect::ArmTimer { .. })).count();
            prop_assert!(arms <= 1);

            for effect in &result.effects {
                match *effect {
                    CarouselEffect::CancelTimer { id } => {
                        prop_assert_eq!(armed.map(|(pending, _)| pending), Some(id));
                        armed = None;
                    }
                    CarouselEffect::ArmTimer { id, deadline } => {
                        // Re-arming always cancels first
                        prop_assert!(armed.is_none());
                        prop_assert!(deadline > now);
                        armed = Some((id, deadline));
                    }
                }
            }
            state = result.new_state;

            prop_assert_eq!(state.timer.map(|t| (t.id, t.deadline)), armed);
            if state.len == 0 {
                prop_assert_eq!(state.current_index, 0);
            } else {
                prop_assert!(state.current_index < state.len);
            }
            if state.mode() == CarouselMode::PausedByHover {
                prop_assert!(state.timer.is_none());
            }
            if let Some(timer) = state.timer {
                if timer.purpose == TimerPurpose::Advance {
                    prop_assert!(state.len > 1);
                    prop_assert_eq!(state.mode(), CarouselMode::Autoplaying);
                }
            }
        }
    }

    #[test]
    fn autoplay_only_ever_steps_by_one(len in 2usize..6, ticks in 1usize..20) {
        let timing = CarouselTiming::default();
        let mut now = tokio::time::Instant::now();
        let mut state = transition(&CarouselState::new(len), CarouselEvent::ItemsReplaced { len }, now, &timing).new_state;

        for _ in 0..ticks {
            let timer = state.timer.expect("autoplay keeps a timer armed");
            prop_assert_eq!(timer.deadline, now + timing.interval);
            now = timer.deadline;
            let before = state.current_index;
            state = transition(&state, CarouselEvent::TimerFired { id: timer.id }, now, &timing).new_state;
            prop_assert_eq!(state.current_index, (before + 1) % len);
        }
    }
}

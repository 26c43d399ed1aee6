//! Pure autoplay state machine for the rotating display
//!
//! Time is an input: every transition receives `now` and returns the timer
//! effects the driver must apply. There is exactly one timer slot, so at
//! most one timer is ever pending.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselTiming {
    /// Delay between autoplay advances
    pub interval: Duration,
    /// Autoplay suppression after manual navigation
    pub cooldown: Duration,
}

impl Default for CarouselTiming {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPurpose {
    /// Autoplay tick
    Advance,
    /// End of the manual-navigation cooldown
    CooldownEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: u64,
    pub purpose: TimerPurpose,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CarouselMode {
    Autoplaying,
    PausedByHover,
    Cooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselEvent {
    TimerFired { id: u64 },
    Next,
    Prev,
    JumpTo(usize),
    PointerEnter,
    PointerLeave,
    ItemsReplaced { len: usize },
    ClearManualNavigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselEffect {
    ArmTimer { id: u64, deadline: Instant },
    CancelTimer { id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselState {
    pub len: usize,
    pub current_index: usize,
    /// False while the pointer hovers the carousel
    pub autoplay_enabled: bool,
    pub last_manual_navigation_at: Option<Instant>,
    pub timer: Option<PendingTimer>,
    next_timer_id: u64,
}

/// Externally visible view of the carousel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CarouselSnapshot {
    pub current_index: usize,
    pub len: usize,
    pub mode: CarouselMode,
    /// Seconds until autoplay resumes after manual navigation
    pub cooldown_remaining_secs: Option<f64>,
}

impl CarouselState {
    /// Idle state with no timer; feed `ItemsReplaced` to start autoplay
    pub fn new(len: usize) -> Self {
        Self {
            len,
            current_index: 0,
            autoplay_enabled: true,
            last_manual_navigation_at: None,
            timer: None,
            next_timer_id: 0,
        }
    }

    pub fn mode(&self) -> CarouselMode {
        if !self.autoplay_enabled {
            CarouselMode::PausedByHover
        } else if self.last_manual_navigation_at.is_some() {
            CarouselMode::Cooldown
        } else {
            CarouselMode::Autoplaying
        }
    }

    pub fn snapshot(&self, now: Instant, timing: &CarouselTiming) -> CarouselSnapshot {
        let cooldown_remaining_secs = self.last_manual_navigation_at.map(|at| {
            at.checked_add(timing.cooldown)
                .map_or(timing.cooldown, |end| end.saturating_duration_since(now))
                .as_secs_f64()
        });
        CarouselSnapshot {
            current_index: self.current_index,
            len: self.len,
            mode: self.mode(),
            cooldown_remaining_secs,
        }
    }

    fn record_manual_navigation(&mut self, index: usize, now: Instant) {
        self.current_index = index;
        self.last_manual_navigation_at = Some(now);
    }

    /// Next autoplay tick, if autoplay can advance at all
    fn advance_deadline(&self, now: Instant, timing: &CarouselTiming) -> Option<(TimerPurpose, Instant)> {
        if self.len <= 1 || timing.interval.is_zero() {
            return None;
        }
        now.checked_add(timing.interval)
            .map(|deadline| (TimerPurpose::Advance, deadline))
    }

    /// Cancel the pending timer, then arm whichever timer the state calls
    /// for: none while hovered, the cooldown end while cooling down, or the
    /// next autoplay tick.
    fn rearm(&mut self, now: Instant, timing: &CarouselTiming, effects: &mut Vec<CarouselEffect>) {
        if let Some(timer) = self.timer.take() {
            effects.push(CarouselEffect::CancelTimer { id: timer.id });
        }
        if !self.autoplay_enabled {
            return;
        }

        let next = match self.last_manual_navigation_at {
            Some(at) => match at.checked_add(timing.cooldown) {
                Some(end) if now < end => Some((TimerPurpose::CooldownEnd, end)),
                Some(_) => {
                    self.last_manual_navigation_at = None;
                    self.advance_deadline(now, timing)
                }
                // A cooldown past the clock's range never ends
                None => None,
            },
            None => self.advance_deadline(now, timing),
        };

        if let Some((purpose, deadline)) = next {
            let id = self.next_timer_id;
            self.next_timer_id += 1;
            self.timer = Some(PendingTimer { id, purpose, deadline });
            effects.push(CarouselEffect::ArmTimer { id, deadline });
        }
    }
}

#[derive(Debug)]
pub struct CarouselTransition {
    pub new_state: CarouselState,
    pub effects: Vec<CarouselEffect>,
}

/// Pure transition function
pub fn transition(
    state: &CarouselState,
    event: CarouselEvent,
    now: Instant,
    timing: &CarouselTiming,
) -> CarouselTransition {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match event {
        CarouselEvent::TimerFired { id } => {
            // Stale timers were already cancelled; ignore them
            if let Some(timer) = next.timer.filter(|t| t.id == id) {
                next.timer = None;
                match timer.purpose {
                    TimerPurpose::Advance if next.len > 1 => {
                        next.current_index = (next.current_index + 1) % next.len;
                    }
                    TimerPurpose::Advance => {}
                    TimerPurpose::CooldownEnd => next.last_manual_navigation_at = None,
                }
                next.rearm(now, timing, &mut effects);
            }
        }

        CarouselEvent::Next if next.len > 0 => {
            let index = (next.current_index + 1) % next.len;
            next.record_manual_navigation(index, now);
            next.rearm(now, timing, &mut effects);
        }

        CarouselEvent::Prev if next.len > 0 => {
            let index = (next.current_index + next.len - 1) % next.len;
            next.record_manual_navigation(index, now);
            next.rearm(now, timing, &mut effects);
        }

        CarouselEvent::JumpTo(index) if index < next.len && index != next.current_index => {
            next.record_manual_navigation(index, now);
            next.rearm(now, timing, &mut effects);
        }

        CarouselEvent::PointerEnter => {
            next.autoplay_enabled = false;
            next.rearm(now, timing, &mut effects);
        }

        CarouselEvent::PointerLeave => {
            next.autoplay_enabled = true;
            next.rearm(now, timing, &mut effects);
        }

        CarouselEvent::ItemsReplaced { len } => {
            // Same item count with a timer already pending: keep its deadline
            if len != next.len || next.timer.is_none() {
                next.len = len;
                next.current_index = next.current_index.min(len.saturating_sub(1));
                next.rearm(now, timing, &mut effects);
            }
        }

        CarouselEvent::ClearManualNavigation => {
            next.last_manual_navigation_at = None;
            next.rearm(now, timing, &mut effects);
        }

        // Navigation on an empty carousel, or a jump to the current or an
        // out-of-range index
        CarouselEvent::Next | CarouselEvent::Prev | CarouselEvent::JumpTo(_) => {}
    }

    CarouselTransition {
        new_state: next,
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    fn started(len: usize, now: Instant) -> CarouselState {
        transition(&CarouselState::new(len), CarouselEvent::ItemsReplaced { len }, now, &CarouselTiming::default())
            .new_state
    }

    fn fire(state: &CarouselState, now: Instant) -> CarouselState {
        let id = state.timer.expect("timer pending").id;
        transition(state, CarouselEvent::TimerFired { id }, now, &CarouselTiming::default()).new_state
    }

    fn apply(state: &CarouselState, event: CarouselEvent, now: Instant) -> CarouselTransition {
        transition(state, event, now, &CarouselTiming::default())
    }

    #[test]
    fn test_autoplay_cycles_through_items() {
        let t0 = Instant::now();
        let mut state = started(4, t0);
        let mut seen = vec![state.current_index];
        for tick in 1..=4 {
            let timer = state.timer.unwrap();
            assert_eq!(timer.purpose, TimerPurpose::Advance);
            assert_eq!(timer.deadline, t0 + 5 * SEC * tick);
            state = fire(&state, timer.deadline);
            seen.push(state.current_index);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 0]);
        assert_eq!(state.mode(), CarouselMode::Autoplaying);
    }

    #[test]
    fn test_single_item_never_arms() {
        let state = started(1, Instant::now());
        assert!(state.timer.is_none());
        assert!(started(0, Instant::now()).timer.is_none());
    }

    #[test]
    fn test_manual_next_cancels_tick_and_enters_cooldown() {
        let t0 = Instant::now();
        let state = started(4, t0);
        let old_id = state.timer.unwrap().id;

        let result = apply(&state, CarouselEvent::Next, t0 + 2 * SEC);
        let state = result.new_state;
        assert_eq!(state.current_index, 1);
        assert_eq!(state.mode(), CarouselMode::Cooldown);

        let timer = state.timer.unwrap();
        assert_eq!(timer.purpose, TimerPurpose::CooldownEnd);
        assert_eq!(timer.deadline, t0 + 12 * SEC);
        assert_eq!(
            result.effects,
            vec![
                CarouselEffect::CancelTimer { id: old_id },
                CarouselEffect::ArmTimer {
                    id: timer.id,
                    deadline: timer.deadline
                },
            ]
        );

        // Cooldown ends, autoplay resumes from the manual position
        let state = fire(&state, t0 + 12 * SEC);
        assert_eq!(state.mode(), CarouselMode::Autoplaying);
        assert_eq!(state.timer.unwrap().deadline, t0 + 17 * SEC);
        let state = fire(&state, t0 + 17 * SEC);
        assert_eq!(state.current_index, 2);
    }

    #[test]
    fn test_prev_wraps_and_jump_rules() {
        let t0 = Instant::now();
        let state = started(3, t0);
        let state = apply(&state, CarouselEvent::Prev, t0).new_state;
        assert_eq!(state.current_index, 2);

        let noop = apply(&state, CarouselEvent::JumpTo(2), t0 + SEC);
        assert!(noop.effects.is_empty());
        assert_eq!(noop.new_state, state);

        let out_of_range = apply(&state, CarouselEvent::JumpTo(7), t0 + SEC);
        assert!(out_of_range.effects.is_empty());

        let jumped = apply(&state, CarouselEvent::JumpTo(0), t0 + SEC).new_state;
        assert_eq!(jumped.current_index, 0);
        assert_eq!(jumped.last_manual_navigation_at, Some(t0 + SEC));
    }

    #[test]
    fn test_hover_during_cooldown_keeps_original_deadline() {
        let t0 = Instant::now();
        let state = apply(&started(4, t0), CarouselEvent::Next, t0).new_state;

        let hovered = apply(&state, CarouselEvent::PointerEnter, t0 + 3 * SEC).new_state;
        assert_eq!(hovered.mode(), CarouselMode::PausedByHover);
        assert!(hovered.timer.is_none());

        let left = apply(&hovered, CarouselEvent::PointerLeave, t0 + 6 * SEC).new_state;
        assert_eq!(left.mode(), CarouselMode::Cooldown);
        let timer = left.timer.unwrap();
        assert_eq!(timer.purpose, TimerPurpose::CooldownEnd);
        assert_eq!(timer.deadline, t0 + 10 * SEC);
    }

    #[test]
    fn test_leave_after_cooldown_expired_resumes_autoplay() {
        let t0 = Instant::now();
        let state = apply(&started(4, t0), CarouselEvent::Next, t0).new_state;
        let hovered = apply(&state, CarouselEvent::PointerEnter, t0 + SEC).new_state;
        let left = apply(&hovered, CarouselEvent::PointerLeave, t0 + 30 * SEC).new_state;
        assert_eq!(left.mode(), CarouselMode::Autoplaying);
        assert_eq!(left.last_manual_navigation_at, None);
        assert_eq!(left.timer.unwrap().deadline, t0 + 35 * SEC);
    }

    #[test]
    fn test_stale_timer_is_ignored() {
        let t0 = Instant::now();
        let state = started(4, t0);
        let stale = state.timer.unwrap().id;
        let state = apply(&state, CarouselEvent::Next, t0 + SEC).new_state;
        let result = apply(&state, CarouselEvent::TimerFired { id: stale }, t0 + 5 * SEC);
        assert!(result.effects.is_empty());
        assert_eq!(result.new_state.current_index, 1);
    }

    #[test]
    fn test_items_replaced_clamps_index() {
        let t0 = Instant::now();
        let state = apply(&started(5, t0), CarouselEvent::JumpTo(4), t0).new_state;
        let shrunk = apply(&state, CarouselEvent::ItemsReplaced { len: 2 }, t0 + SEC).new_state;
        assert_eq!(shrunk.current_index, 1);
        let empty = apply(&shrunk, CarouselEvent::ItemsReplaced { len: 0 }, t0 + SEC).new_state;
        assert_eq!(empty.current_index, 0);
        assert!(apply(&empty, CarouselEvent::Next, t0 + SEC).effects.is_empty());
    }

    #[test]
    fn test_same_item_count_keeps_pending_tick() {
        let t0 = Instant::now();
        let state = started(4, t0);
        let deadline = state.timer.unwrap().deadline;

        let refreshed = apply(&state, CarouselEvent::ItemsReplaced { len: 4 }, t0 + 3 * SEC);
        assert!(refreshed.effects.is_empty());
        assert_eq!(refreshed.new_state.timer.unwrap().deadline, deadline);

        let grown = apply(&state, CarouselEvent::ItemsReplaced { len: 6 }, t0 + 3 * SEC).new_state;
        assert_eq!(grown.timer.unwrap().deadline, t0 + 8 * SEC);
    }

    #[test]
    fn test_oversized_cooldown_never_panics() {
        let t0 = Instant::now();
        let timing = CarouselTiming {
            interval: DEFAULT_INTERVAL,
            cooldown: Duration::from_secs(u64::MAX),
        };
        let state = transition(&started(4, t0), CarouselEvent::Next, t0, &timing).new_state;
        assert_eq!(state.current_index, 1);
        assert_eq!(state.mode(), CarouselMode::Cooldown);
        assert!(state.timer.is_none());
        assert!(state.snapshot(t0 + SEC, &timing).cooldown_remaining_secs.is_some());
    }

    #[test]
    fn test_zero_or_oversized_interval_disables_autoplay() {
        let t0 = Instant::now();
        for interval in [Duration::ZERO, Duration::from_secs(u64::MAX)] {
            let timing = CarouselTiming {
                interval,
                cooldown: DEFAULT_COOLDOWN,
            };
            let state = transition(&CarouselState::new(4), CarouselEvent::ItemsReplaced { len: 4 }, t0, &timing)
                .new_state;
            assert!(state.timer.is_none());
        }
    }

    #[test]
    fn test_clear_manual_navigation_resumes_autoplay() {
        let t0 = Instant::now();
        let state = apply(&started(4, t0), CarouselEvent::Next, t0).new_state;
        let cleared = apply(&state, CarouselEvent::ClearManualNavigation, t0 + SEC).new_state;
        assert_eq!(cleared.mode(), CarouselMode::Autoplaying);
        assert_eq!(cleared.timer.unwrap().purpose, TimerPurpose::Advance);
    }

    #[test]
    fn test_snapshot_reports_remaining_cooldown() {
        let t0 = Instant::now();
        let timing = CarouselTiming::default();
        let state = apply(&started(4, t0), CarouselEvent::Next, t0).new_state;
        let snapshot = state.snapshot(t0 + 4 * SEC, &timing);
        assert_eq!(snapshot.mode, CarouselMode::Cooldown);
        let remaining = snapshot.cooldown_remaining_secs.unwrap();
        assert!((remaining - 6.0).abs() < 1e-9);
        assert_eq!(started(4, t0).snapshot(t0, &timing).cooldown_remaining_secs, None);
    }
}

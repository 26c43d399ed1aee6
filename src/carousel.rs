//! Carousel autoplay
//!
//! The pure machine in [`machine`] decides; [`CarouselHandle`] runs it on a
//! tokio task that owns the single timer and serializes every command, so
//! ticks and user navigation can never race.

mod machine;

#[cfg(test)]
mod proptests;

pub use machine::{
    transition, CarouselEffect, CarouselEvent, CarouselMode, CarouselSnapshot, CarouselState,
    CarouselTiming, CarouselTransition, PendingTimer, TimerPurpose,
};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

struct Command {
    event: CarouselEvent,
    reply: oneshot::Sender<CarouselSnapshot>,
}

/// Control handle for a running carousel; cheap to clone. The task stops
/// once every handle is dropped.
#[derive(Clone)]
pub struct CarouselHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<CarouselState>,
    timing: CarouselTiming,
}

impl CarouselHandle {
    pub fn spawn(len: usize, timing: CarouselTiming) -> Self {
        let now = Instant::now();
        let CarouselTransition { new_state, effects } =
            transition(&CarouselState::new(len), CarouselEvent::ItemsReplaced { len }, now, &timing);

        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(new_state.clone());
        let mut timer = None;
        apply_effects(&mut timer, &effects);

        tokio::spawn(run(rx, state_tx, new_state, timer, timing));
        Self {
            commands,
            state,
            timing,
        }
    }

    pub fn snapshot(&self) -> CarouselSnapshot {
        self.state.borrow().snapshot(Instant::now(), &self.timing)
    }

    /// Watch raw state changes
    pub fn subscribe(&self) -> watch::Receiver<CarouselState> {
        self.state.clone()
    }

    pub fn timing(&self) -> CarouselTiming {
        self.timing
    }

    /// Apply one event and return the resulting snapshot
    pub async fn send(&self, event: CarouselEvent) -> CarouselSnapshot {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command { event, reply }).is_err() {
            tracing::warn!(?event, "Carousel task stopped; ignoring command");
            return self.snapshot();
        }
        match response.await {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    pub async fn replace_items(&self, len: usize) -> CarouselSnapshot {
        self.send(CarouselEvent::ItemsReplaced { len }).await
    }

    pub async fn next(&self) -> CarouselSnapshot {
        self.send(CarouselEvent::Next).await
    }

    pub async fn prev(&self) -> CarouselSnapshot {
        self.send(CarouselEvent::Prev).await
    }

    pub async fn jump_to(&self, index: usize) -> CarouselSnapshot {
        self.send(CarouselEvent::JumpTo(index)).await
    }

    pub async fn pointer_enter(&self) -> CarouselSnapshot {
        self.send(CarouselEvent::PointerEnter).await
    }

    pub async fn pointer_leave(&self) -> CarouselSnapshot {
        self.send(CarouselEvent::PointerLeave).await
    }

    pub async fn clear_manual_navigation(&self) -> CarouselSnapshot {
        self.send(CarouselEvent::ClearManualNavigation).await
    }
}

fn apply_effects(timer: &mut Option<(u64, Instant)>, effects: &[CarouselEffect]) {
    for effect in effects {
        match *effect {
            CarouselEffect::CancelTimer { id } => {
                if timer.is_some_and(|(pending, _)| pending == id) {
                    *timer = None;
                }
            }
            CarouselEffect::ArmTimer { id, deadline } => *timer = Some((id, deadline)),
        }
    }
}

async fn run(
    mut commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<CarouselState>,
    mut state: CarouselState,
    mut timer: Option<(u64, Instant)>,
    timing: CarouselTiming,
) {
    loop {
        let (event, reply) = match timer {
            Some((id, deadline)) => tokio::select! {
                () = tokio::time::sleep_until(deadline) => (CarouselEvent::TimerFired { id }, None),
                command = commands.recv() => match command {
                    Some(Command { event, reply }) => (event, Some(reply)),
                    None => break,
                },
            },
            None => match commands.recv().await {
                Some(Command { event, reply }) => (event, Some(reply)),
                None => break,
            },
        };

        let now = Instant::now();
        let CarouselTransition { new_state, effects } = transition(&state, event, now, &timing);
        apply_effects(&mut timer, &effects);

        if new_state.current_index != state.current_index || new_state.mode() != state.mode() {
            tracing::debug!(
                ?event,
                index = new_state.current_index,
                mode = ?new_state.mode(),
                "Carousel transitioned"
            );
        }
        state = new_state;
        state_tx.send_replace(state.clone());

        if let Some(reply) = reply {
            let _ = reply.send(state.snapshot(now, &timing));
        }
    }
    tracing::debug!("Carousel task stopped");
}

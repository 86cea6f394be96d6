//! Tick routing and deferred auto-advance.
//!
//! The clock lives outside the core. It delivers plain one-second ticks and
//! this module decides which of the two tick streams, if any, a tick feeds.
//! Only one stream is ever live: the countdown while an unfrozen pre-roll
//! is showing, the main timer while running. The live stream is held as a
//! single [`TimerHandle`]; every transition that leaves its phase drops it,
//! and every (re)entry arms a new handle with a fresh generation so a host
//! driving a real interval can tell when to restart its second boundary.

use crate::session::{Event, Phase, SessionState};
use std::time::Duration;

/// Delay between a step completing and the automatic move to the next one
pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_secs(1);

/// Which tick stream is live
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveTimer {
    None,
    Countdown,
    Main,
}

impl ActiveTimer {
    pub fn for_state(state: &SessionState) -> Self {
        match state.phase() {
            Phase::Countdown { frozen: false, .. } => ActiveTimer::Countdown,
            Phase::Running => ActiveTimer::Main,
            _ => ActiveTimer::None,
        }
    }

    /// The event one clock tick turns into
    pub fn tick_event(self) -> Option<Event> {
        match self {
            ActiveTimer::Countdown => Some(Event::CountdownTick),
            ActiveTimer::Main => Some(Event::SessionTick),
            ActiveTimer::None => None,
        }
    }
}

/// The one armed interval for the current step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerHandle {
    pub kind: ActiveTimer,
    pub step_index: usize,
    pub generation: u64,
}

/// Owns the live timer handle
#[derive(Debug, Default)]
pub struct TickScheduler {
    handle: Option<TimerHandle>,
    generations: u64,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the handle in line with `prev -> next`
    ///
    /// Returns true when a handle was torn down or armed.
    pub fn sync(&mut self, prev: &SessionState, next: &SessionState) -> bool {
        let was = ActiveTimer::for_state(prev);
        let now = ActiveTimer::for_state(next);
        let same_step = prev.step_index() == next.step_index();

        if was == now && same_step && (now == ActiveTimer::None) == self.handle.is_none() {
            return false;
        }

        if let Some(old) = self.handle.take() {
            tracing::debug!(
                "Stopped {:?} timer #{} on step {}",
                old.kind,
                old.generation,
                old.step_index
            );
        }

        if now != ActiveTimer::None {
            self.generations += 1;
            let handle = TimerHandle {
                kind: now,
                step_index: next.step_index(),
                generation: self.generations,
            };
            tracing::debug!(
                "Armed {:?} timer #{} on step {}",
                handle.kind,
                handle.generation,
                handle.step_index
            );
            self.handle = Some(handle);
        }

        true
    }

    /// Drop any live handle
    pub fn clear(&mut self) {
        self.handle = None;
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        self.handle
    }

    pub fn active(&self) -> ActiveTimer {
        self.handle.map_or(ActiveTimer::None, |h| h.kind)
    }
}

/// A one-shot "advance from this step" command
///
/// Issued when a step completes with auto-advance on. It only fires if the
/// session is still on `step_index` and the token is the one pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoAdvance {
    pub step_index: usize,
    pub id: u64,
    pub delay: Duration,
}

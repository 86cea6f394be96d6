//! Step navigation: next, previous, go-to and restart.
//!
//! Every move lands in Idle with the timer cleared. The one exception is an
//! automatic advance after a completed step, which immediately starts the
//! next timed step (countdown first when it is eligible).

use crate::session::{self, SessionState, Transition};
use crate::signals::Signal;
use crate::{ExpandedStep, Settings};

/// Move to the following step, or to the Complete position after the last
pub fn next(
    state: SessionState,
    steps: &[ExpandedStep],
    settings: &Settings,
    auto_advance: bool,
) -> Transition {
    if state.is_complete() {
        return Transition::to(state);
    }

    let target = state.step_index() + 1;
    let Some(step) = steps.get(target) else {
        tracing::debug!("Moved past last step, routine complete");
        return Transition::to(SessionState::complete(steps.len())).signal(Signal::RoutineCompleted);
    };

    let landed = SessionState::idle_at(target, steps.len());

    if auto_advance && settings.auto_advance_enabled && step.is_timed() {
        tracing::debug!("Auto-advancing into step {} ({})", target, step.name);
        return session::start(landed, step, settings);
    }

    Transition::to(landed)
}

/// Step back one; no-op on the first step
pub fn previous(state: SessionState, steps: &[ExpandedStep]) -> Transition {
    match state.step_index().checked_sub(1) {
        Some(target) if target < steps.len() => {
            Transition::to(SessionState::idle_at(target, steps.len()))
        }
        _ => Transition::to(state),
    }
}

/// Jump to `index`; out-of-range targets are ignored
pub fn go_to(state: SessionState, steps: &[ExpandedStep], index: usize) -> Transition {
    if index >= steps.len() {
        tracing::debug!(
            "Ignoring go-to {} outside 0..{}",
            index,
            steps.len()
        );
        return Transition::to(state);
    }
    Transition::to(SessionState::idle_at(index, steps.len()))
}

/// Idle at the first step of the same sequence
pub fn restart(steps: &[ExpandedStep]) -> Transition {
    Transition::to(SessionState::new(steps.len()))
}

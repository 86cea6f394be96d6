//! Signals raised by the session for its collaborators.
//!
//! The session never plays sound or draws anything. It raises named
//! signals and hands them to registered observers; the audio collaborator
//! decides which tone, if any, goes with each one.

use crate::session::SessionState;
use std::sync::mpsc::Sender;

/// A discrete event worth telling the outside world about
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Countdown now shows `n` (3, 2 or 1)
    CountdownTick(u8),
    /// Countdown reached its end and the main timer engaged
    CountdownFinished,
    /// `n` seconds left on the running timer (3, 2 or 1)
    FinalSeconds(u32),
    /// The timed step at `step_index` ran to its full duration
    StepCompleted { step_index: usize },
    /// The session moved past the last step
    RoutineCompleted,
}

/// Receives every signal along with the state it produced
pub trait SessionObserver {
    fn on_signal(&mut self, signal: Signal, state: &SessionState);
}

impl<F> SessionObserver for F
where
    F: FnMut(Signal, &SessionState),
{
    fn on_signal(&mut self, signal: Signal, state: &SessionState) {
        self(signal, state)
    }
}

/// Forwards signals over an mpsc channel
///
/// A receiver that went away is not an error for the session; the signal
/// is dropped.
pub struct ChannelObserver {
    tx: Sender<Signal>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<Signal>) -> Self {
        Self { tx }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_signal(&mut self, signal: Signal, _state: &SessionState) {
        if self.tx.send(signal).is_err() {
            tracing::debug!("Signal receiver dropped, discarding {:?}", signal);
        }
    }
}

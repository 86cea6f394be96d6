//! Session state and the timer half of the state machine.
//!
//! `SessionState` is a plain value. Every event produces a new state via
//! [`reduce`], together with the signals the transition raised and whether
//! a deferred auto-advance should be scheduled. Nothing here touches real
//! time; ticks arrive as events.
//!
//! ```text
//! Idle --start--> Countdown(3) --tick--> Countdown(2) --tick--> Countdown(1) --tick--> Running
//!   \--start (no countdown / rest step)----------------------------------------------> Running
//! Running --tick (elapsed reaches duration)--> Paused + StepCompleted
//! Running <--pause/resume--> Paused          Countdown(n) <--pause/resume--> frozen Countdown(n)
//! {Countdown, Running, Paused} --reset--> Idle
//! any --navigate--> Idle@j                   index == len --> Complete
//! ```

use crate::navigation;
use crate::signals::Signal;
use crate::{ExpandedStep, Settings};

/// Length of the pre-roll before a timed step starts
pub const COUNTDOWN_SECONDS: u8 = 3;

/// Remaining seconds at which `FinalSeconds` is raised
const FINAL_SECONDS: u32 = 3;

/// Where the current step is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not started
    Idle,
    /// Pre-roll showing `seconds`; `frozen` while paused
    Countdown { seconds: u8, frozen: bool },
    /// Main timer ticking
    Running,
    /// Main timer engaged but stopped (by the user or by completion)
    Paused,
    /// Past the last step
    Complete,
}

/// Snapshot of a session over one expanded routine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionState {
    step_index: usize,
    elapsed_seconds: u32,
    phase: Phase,
}

impl SessionState {
    /// Fresh session over `total_steps` steps, Idle at the first one
    pub fn new(total_steps: usize) -> Self {
        Self::idle_at(0, total_steps)
    }

    /// Idle at `step_index`, or Complete when that is the end position
    pub(crate) fn idle_at(step_index: usize, total_steps: usize) -> Self {
        if step_index >= total_steps {
            return Self::complete(total_steps);
        }
        Self {
            step_index,
            elapsed_seconds: 0,
            phase: Phase::Idle,
        }
    }

    pub(crate) fn complete(total_steps: usize) -> Self {
        Self {
            step_index: total_steps,
            elapsed_seconds: 0,
            phase: Phase::Complete,
        }
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Value shown by the 3-2-1 pre-roll, if one is active
    pub fn countdown_seconds(&self) -> Option<u8> {
        match self.phase {
            Phase::Countdown { seconds, .. } => Some(seconds),
            _ => None,
        }
    }

    pub fn is_paused(&self) -> bool {
        match self.phase {
            Phase::Running => false,
            Phase::Countdown { frozen, .. } => frozen,
            Phase::Idle | Phase::Paused | Phase::Complete => true,
        }
    }

    /// True once the main (non-countdown) timer has been engaged for this step
    pub fn timer_started(&self) -> bool {
        matches!(self.phase, Phase::Running | Phase::Paused)
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// Either the countdown or the main timer is ticking
    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            Phase::Running | Phase::Countdown { frozen: false, .. }
        )
    }

    fn with_phase(self, phase: Phase) -> Self {
        Self { phase, ..self }
    }
}

/// Everything that can happen to a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Begin the current timed step (countdown first when eligible)
    Start,
    /// Freeze the countdown or stop the main timer
    Pause,
    /// Continue a frozen countdown or a paused timer
    Resume,
    /// Play/pause button: start, pause or resume depending on the phase
    Toggle,
    /// Back to Idle on the current step
    Reset,
    /// One second of the main timer
    SessionTick,
    /// One second of the countdown
    CountdownTick,
    /// Move forward; `auto_advance` is set when fired after a completion
    Next { auto_advance: bool },
    Previous,
    GoTo(usize),
    /// Back to Idle at the first step
    Restart,
}

impl Event {
    /// User-driven moves that leave any pending auto-advance stale, even
    /// when they land on the step it was scheduled from
    pub fn cancels_auto_advance(&self) -> bool {
        matches!(
            self,
            Event::Reset
                | Event::Previous
                | Event::GoTo(_)
                | Event::Restart
                | Event::Next {
                    auto_advance: false
                }
        )
    }
}

/// Result of applying one event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub signals: Vec<Signal>,
    /// The step just completed and auto-advance is enabled
    pub schedule_auto_advance: bool,
}

impl Transition {
    pub(crate) fn to(state: SessionState) -> Self {
        Self {
            state,
            signals: Vec::new(),
            schedule_auto_advance: false,
        }
    }

    pub(crate) fn signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }
}

/// Apply `event` to `state` over `steps`
///
/// Events that make no sense in the current state (a tick while idle, a
/// pause on a rep card, navigation out of range) return the state unchanged.
pub fn reduce(
    state: SessionState,
    steps: &[ExpandedStep],
    settings: &Settings,
    event: Event,
) -> Transition {
    match event {
        Event::Next { auto_advance } => navigation::next(state, steps, settings, auto_advance),
        Event::Previous => navigation::previous(state, steps),
        Event::GoTo(index) => navigation::go_to(state, steps, index),
        Event::Restart => navigation::restart(steps),
        timer_event => {
            // Timer events only apply to timed steps
            match steps.get(state.step_index) {
                Some(step) if step.is_timed() => reduce_timer(state, step, settings, timer_event),
                _ => Transition::to(state),
            }
        }
    }
}

fn reduce_timer(
    state: SessionState,
    step: &ExpandedStep,
    settings: &Settings,
    event: Event,
) -> Transition {
    match (state.phase, event) {
        (Phase::Idle, Event::Start | Event::Toggle) => start(state, step, settings),

        (Phase::Countdown { seconds, frozen: false }, Event::Pause | Event::Toggle) => {
            Transition::to(state.with_phase(Phase::Countdown {
                seconds,
                frozen: true,
            }))
        }
        (Phase::Countdown { seconds, frozen: true }, Event::Resume | Event::Toggle) => {
            Transition::to(state.with_phase(Phase::Countdown {
                seconds,
                frozen: false,
            }))
        }
        (Phase::Countdown { seconds, frozen: false }, Event::CountdownTick) => {
            countdown_tick(state, seconds)
        }

        (Phase::Running, Event::Pause | Event::Toggle) => {
            Transition::to(state.with_phase(Phase::Paused))
        }
        (Phase::Paused, Event::Resume | Event::Toggle) => {
            Transition::to(state.with_phase(Phase::Running))
        }
        (Phase::Running, Event::SessionTick) => session_tick(state, step, settings),

        (Phase::Countdown { .. } | Phase::Running | Phase::Paused, Event::Reset) => {
            Transition::to(SessionState {
                elapsed_seconds: 0,
                phase: Phase::Idle,
                ..state
            })
        }

        _ => Transition::to(state),
    }
}

/// Leave Idle: pre-roll when enabled and the step is not a rest, else run
pub(crate) fn start(state: SessionState, step: &ExpandedStep, settings: &Settings) -> Transition {
    if settings.countdown_enabled && step.countdown_eligible() {
        Transition::to(state.with_phase(Phase::Countdown {
            seconds: COUNTDOWN_SECONDS,
            frozen: false,
        }))
        .signal(Signal::CountdownTick(COUNTDOWN_SECONDS))
    } else {
        Transition::to(state.with_phase(Phase::Running))
    }
}

fn countdown_tick(state: SessionState, seconds: u8) -> Transition {
    if seconds > 1 {
        let next = seconds - 1;
        Transition::to(state.with_phase(Phase::Countdown {
            seconds: next,
            frozen: false,
        }))
        .signal(Signal::CountdownTick(next))
    } else {
        // Straight from 1 to the main timer; 0 is never shown
        Transition::to(SessionState {
            elapsed_seconds: 0,
            phase: Phase::Running,
            ..state
        })
        .signal(Signal::CountdownFinished)
    }
}

fn session_tick(state: SessionState, step: &ExpandedStep, settings: &Settings) -> Transition {
    let duration = step.duration().unwrap_or(0);

    // Resumed after it already finished: stop again without a second completion
    if state.elapsed_seconds >= duration {
        return Transition::to(state.with_phase(Phase::Paused));
    }

    let elapsed = state.elapsed_seconds + 1;
    let next = SessionState {
        elapsed_seconds: elapsed,
        ..state
    };

    if elapsed >= duration {
        let mut transition = Transition::to(next.with_phase(Phase::Paused)).signal(
            Signal::StepCompleted {
                step_index: state.step_index,
            },
        );
        transition.schedule_auto_advance = settings.auto_advance_enabled;
        return transition;
    }

    let remaining = duration - elapsed;
    let transition = Transition::to(next);
    if remaining <= FINAL_SECONDS {
        transition.signal(Signal::FinalSeconds(remaining))
    } else {
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StepKind;

    fn timed_step(duration: u32) -> ExpandedStep {
        ExpandedStep {
            section: "Main".into(),
            name: "Plank".into(),
            kind: StepKind::Timed { duration },
            set_number: Some(1),
            total_sets: Some(1),
            instructions: None,
            feel: None,
            is_rest: false,
            is_injected_rest: false,
        }
    }

    fn reps_step() -> ExpandedStep {
        ExpandedStep {
            kind: StepKind::Reps {
                reps: "10 reps".into(),
            },
            set_number: None,
            ..timed_step(0)
        }
    }

    fn countdown_on() -> Settings {
        Settings {
            countdown_enabled: true,
            ..Default::default()
        }
    }

    fn apply(
        state: SessionState,
        steps: &[ExpandedStep],
        settings: &Settings,
        events: &[Event],
    ) -> (SessionState, Vec<Signal>) {
        let mut state = state;
        let mut signals = Vec::new();
        for &event in events {
            let transition = reduce(state, steps, settings, event);
            assert!(
                !(transition.state.countdown_seconds().is_some()
                    && transition.state.timer_started()),
                "countdown and main timer active together after {:?}",
                event
            );
            state = transition.state;
            signals.extend(transition.signals);
        }
        (state, signals)
    }

    #[test]
    fn test_new_state_is_idle() {
        let state = SessionState::new(3);
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.is_paused());
        assert!(!state.timer_started());
        assert_eq!(state.countdown_seconds(), None);
    }

    #[test]
    fn test_empty_routine_starts_complete() {
        let state = SessionState::new(0);
        assert!(state.is_complete());
        assert_eq!(state.step_index(), 0);
    }

    #[test]
    fn test_start_without_countdown_runs() {
        let steps = vec![timed_step(5)];
        let (state, signals) = apply(
            SessionState::new(1),
            &steps,
            &Settings::default(),
            &[Event::Start],
        );

        assert_eq!(state.phase(), Phase::Running);
        assert!(state.timer_started());
        assert!(signals.is_empty());
    }

    #[test]
    fn test_countdown_reaches_running_without_zero() {
        let steps = vec![timed_step(5)];
        let settings = countdown_on();

        let mut state = reduce(SessionState::new(1), &steps, &settings, Event::Start).state;
        assert_eq!(state.countdown_seconds(), Some(3));

        let mut seen = Vec::new();
        for _ in 0..3 {
            state = reduce(state, &steps, &settings, Event::CountdownTick).state;
            seen.push(state.countdown_seconds());
        }

        assert_eq!(seen, vec![Some(2), Some(1), None]);
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.elapsed_seconds(), 0);
    }

    #[test]
    fn test_countdown_signals() {
        let steps = vec![timed_step(5)];
        let (_, signals) = apply(
            SessionState::new(1),
            &steps,
            &countdown_on(),
            &[
                Event::Start,
                Event::CountdownTick,
                Event::CountdownTick,
                Event::CountdownTick,
            ],
        );

        assert_eq!(
            signals,
            vec![
                Signal::CountdownTick(3),
                Signal::CountdownTick(2),
                Signal::CountdownTick(1),
                Signal::CountdownFinished,
            ]
        );
    }

    #[test]
    fn test_rest_step_skips_countdown() {
        let steps = vec![ExpandedStep::injected_rest("Main", 10)];
        let (state, _) = apply(SessionState::new(1), &steps, &countdown_on(), &[Event::Start]);
        assert_eq!(state.phase(), Phase::Running);
    }

    #[test]
    fn test_frozen_countdown_ignores_ticks() {
        let steps = vec![timed_step(5)];
        let (state, signals) = apply(
            SessionState::new(1),
            &steps,
            &countdown_on(),
            &[
                Event::Start,
                Event::CountdownTick,
                Event::Pause,
                Event::CountdownTick,
                Event::SessionTick,
            ],
        );

        assert_eq!(
            state.phase(),
            Phase::Countdown {
                seconds: 2,
                frozen: true
            }
        );
        assert!(state.is_paused());
        // No beep on freeze
        assert_eq!(signals.len(), 2);

        let (state, signals) = apply(state, &steps, &countdown_on(), &[Event::Resume]);
        assert_eq!(state.countdown_seconds(), Some(2));
        assert!(!state.is_paused());
        // No beep on resume either
        assert!(signals.is_empty());
    }

    #[test]
    fn test_session_tick_ignored_during_countdown() {
        let steps = vec![timed_step(5)];
        let (state, _) = apply(
            SessionState::new(1),
            &steps,
            &countdown_on(),
            &[Event::Start, Event::SessionTick, Event::SessionTick],
        );

        assert_eq!(state.countdown_seconds(), Some(3));
        assert_eq!(state.elapsed_seconds(), 0);
    }

    #[test]
    fn test_duration_ticks_complete_step_once() {
        let steps = vec![timed_step(5)];
        let settings = Settings::default();

        let mut events = vec![Event::Start];
        events.extend(std::iter::repeat(Event::SessionTick).take(5));
        let (state, signals) = apply(SessionState::new(1), &steps, &settings, &events);

        assert_eq!(state.phase(), Phase::Paused);
        assert_eq!(state.elapsed_seconds(), 5);
        let completions = signals
            .iter()
            .filter(|s| matches!(s, Signal::StepCompleted { .. }))
            .count();
        assert_eq!(completions, 1);

        // Paused step ignores further ticks
        let (after, more) = apply(state, &steps, &settings, &[Event::SessionTick]);
        assert_eq!(after, state);
        assert!(more.is_empty());
    }

    #[test]
    fn test_final_seconds_signals() {
        let steps = vec![timed_step(5)];
        let mut events = vec![Event::Start];
        events.extend(std::iter::repeat(Event::SessionTick).take(5));
        let (_, signals) = apply(SessionState::new(1), &steps, &Settings::default(), &events);

        assert_eq!(
            signals,
            vec![
                Signal::FinalSeconds(3),
                Signal::FinalSeconds(2),
                Signal::FinalSeconds(1),
                Signal::StepCompleted { step_index: 0 },
            ]
        );
    }

    #[test]
    fn test_completion_schedules_auto_advance_when_enabled() {
        let steps = vec![timed_step(1)];
        let running = reduce(
            SessionState::new(1),
            &steps,
            &Settings::default(),
            Event::Start,
        )
        .state;

        let off = reduce(running, &steps, &Settings::default(), Event::SessionTick);
        assert!(!off.schedule_auto_advance);

        let settings = Settings {
            auto_advance_enabled: true,
            ..Default::default()
        };
        let on = reduce(running, &steps, &settings, Event::SessionTick);
        assert!(on.schedule_auto_advance);
    }

    #[test]
    fn test_resume_after_completion_does_not_complete_again() {
        let steps = vec![timed_step(2)];
        let (state, signals) = apply(
            SessionState::new(1),
            &steps,
            &Settings::default(),
            &[
                Event::Start,
                Event::SessionTick,
                Event::SessionTick,
                Event::Resume,
                Event::SessionTick,
            ],
        );

        assert_eq!(state.phase(), Phase::Paused);
        assert_eq!(state.elapsed_seconds(), 2);
        assert_eq!(
            signals
                .iter()
                .filter(|s| matches!(s, Signal::StepCompleted { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_pause_and_resume_main_timer() {
        let steps = vec![timed_step(10)];
        let (state, _) = apply(
            SessionState::new(1),
            &steps,
            &Settings::default(),
            &[
                Event::Start,
                Event::SessionTick,
                Event::Pause,
                Event::SessionTick,
            ],
        );
        assert_eq!(state.phase(), Phase::Paused);
        assert_eq!(state.elapsed_seconds(), 1);

        let (state, _) = apply(
            state,
            &steps,
            &Settings::default(),
            &[Event::Resume, Event::SessionTick],
        );
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.elapsed_seconds(), 2);
    }

    #[test]
    fn test_toggle_walks_play_pause_cycle() {
        let steps = vec![timed_step(10)];
        let settings = countdown_on();
        let mut state = SessionState::new(1);
        let mut phases = Vec::new();

        for event in [
            Event::Toggle,
            Event::Toggle,
            Event::Toggle,
            Event::CountdownTick,
            Event::CountdownTick,
            Event::CountdownTick,
            Event::Toggle,
            Event::Toggle,
        ] {
            state = reduce(state, &steps, &settings, event).state;
            phases.push(state.phase());
        }

        assert_eq!(
            phases,
            vec![
                Phase::Countdown { seconds: 3, frozen: false },
                Phase::Countdown { seconds: 3, frozen: true },
                Phase::Countdown { seconds: 3, frozen: false },
                Phase::Countdown { seconds: 2, frozen: false },
                Phase::Countdown { seconds: 1, frozen: false },
                Phase::Running,
                Phase::Paused,
                Phase::Running,
            ]
        );
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let steps = vec![timed_step(10)];
        for events in [
            vec![Event::Start],
            vec![Event::Start, Event::SessionTick, Event::Pause],
        ] {
            let mut all = events.clone();
            all.push(Event::Reset);
            let (state, _) = apply(SessionState::new(1), &steps, &Settings::default(), &all);
            assert_eq!(state, SessionState::new(1));
        }

        let (state, _) = apply(
            SessionState::new(1),
            &steps,
            &countdown_on(),
            &[Event::Start, Event::Reset],
        );
        assert_eq!(state, SessionState::new(1));
    }

    #[test]
    fn test_reps_step_never_starts() {
        let steps = vec![reps_step()];
        let (state, signals) = apply(
            SessionState::new(1),
            &steps,
            &countdown_on(),
            &[Event::Start, Event::Toggle, Event::SessionTick, Event::CountdownTick],
        );

        assert_eq!(state, SessionState::new(1));
        assert!(signals.is_empty());
    }

    #[test]
    fn test_timer_events_ignored_when_complete() {
        let steps = vec![timed_step(3)];
        let complete = SessionState::complete(1);
        let (state, signals) = apply(
            complete,
            &steps,
            &Settings::default(),
            &[Event::Start, Event::SessionTick, Event::Reset],
        );

        assert_eq!(state, complete);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_user_navigation_cancels_auto_advance() {
        for event in [
            Event::Reset,
            Event::Previous,
            Event::GoTo(0),
            Event::Restart,
            Event::Next {
                auto_advance: false,
            },
        ] {
            assert!(event.cancels_auto_advance(), "{:?}", event);
        }
        for event in [
            Event::Start,
            Event::Pause,
            Event::Resume,
            Event::Toggle,
            Event::SessionTick,
            Event::CountdownTick,
            Event::Next { auto_advance: true },
        ] {
            assert!(!event.cancels_auto_advance(), "{:?}", event);
        }
    }
}

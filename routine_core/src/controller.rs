//! Session controller.
//!
//! Owns one expanded routine, the current [`SessionState`], the live timer
//! handle and any pending auto-advance. All mutation happens synchronously
//! in [`SessionController::dispatch`]; observers are told about signals
//! after the new state is in place.

use crate::expand::{expand_exercises, progress_percent};
use crate::scheduler::{ActiveTimer, AutoAdvance, TickScheduler, TimerHandle, AUTO_ADVANCE_DELAY};
use crate::session::{reduce, Event, SessionState};
use crate::signals::{SessionObserver, Signal};
use crate::{ExpandedStep, Routine, Settings, SettingsUpdate};

/// Read-only snapshot for rendering
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView<'a> {
    pub step: Option<&'a ExpandedStep>,
    pub step_index: usize,
    pub total_steps: usize,
    pub elapsed_seconds: u32,
    /// Seconds left on the main timer, for timed steps
    pub remaining_seconds: Option<u32>,
    pub countdown_seconds: Option<u8>,
    pub is_paused: bool,
    pub timer_started: bool,
    pub is_complete: bool,
    pub progress_percent: f64,
}

pub struct SessionController {
    steps: Vec<ExpandedStep>,
    state: SessionState,
    settings: Settings,
    scheduler: TickScheduler,
    pending_auto_advance: Option<AutoAdvance>,
    auto_advance_ids: u64,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl SessionController {
    /// Controller over already expanded steps, Idle at step 0
    pub fn new(steps: Vec<ExpandedStep>, settings: Settings) -> Self {
        let state = SessionState::new(steps.len());
        Self {
            steps,
            state,
            settings,
            scheduler: TickScheduler::new(),
            pending_auto_advance: None,
            auto_advance_ids: 0,
            observers: Vec::new(),
        }
    }

    /// Expand `routine` and start a session over it
    pub fn from_routine(routine: &Routine, settings: Settings) -> Self {
        Self::new(expand_exercises(&routine.exercises), settings)
    }

    /// Replace the routine; the session starts over at step 0
    pub fn load(&mut self, routine: &Routine) {
        self.load_steps(expand_exercises(&routine.exercises));
    }

    pub fn load_steps(&mut self, steps: Vec<ExpandedStep>) {
        tracing::info!("Loaded routine with {} steps", steps.len());
        self.steps = steps;
        self.state = SessionState::new(self.steps.len());
        self.scheduler.clear();
        self.pending_auto_advance = None;
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn steps(&self) -> &[ExpandedStep] {
        &self.steps
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings take effect on the next decision; the current phase is kept
    pub fn update_settings(&mut self, update: SettingsUpdate) {
        self.settings.apply(update);
        tracing::debug!("Settings now {:?}", self.settings);
    }

    pub fn current_step(&self) -> Option<&ExpandedStep> {
        self.steps.get(self.state.step_index())
    }

    pub fn active_timer(&self) -> ActiveTimer {
        self.scheduler.active()
    }

    pub fn timer_handle(&self) -> Option<TimerHandle> {
        self.scheduler.handle()
    }

    pub fn pending_auto_advance(&self) -> Option<AutoAdvance> {
        self.pending_auto_advance
    }

    /// Apply one event and notify observers of the signals it raised
    pub fn dispatch(&mut self, event: Event) -> &SessionState {
        let prev = self.state;
        let transition = reduce(prev, &self.steps, &self.settings, event);
        self.state = transition.state;

        if prev != self.state {
            tracing::debug!(
                "{:?}: step {} {:?} -> step {} {:?}",
                event,
                prev.step_index(),
                prev.phase(),
                self.state.step_index(),
                self.state.phase()
            );
        }

        self.scheduler.sync(&prev, &self.state);

        if prev.step_index() != self.state.step_index() || event.cancels_auto_advance() {
            if let Some(stale) = self.pending_auto_advance.take() {
                tracing::debug!("Cancelled auto-advance #{} from step {}", stale.id, stale.step_index);
            }
        }

        if transition.schedule_auto_advance {
            self.auto_advance_ids += 1;
            let token = AutoAdvance {
                step_index: self.state.step_index(),
                id: self.auto_advance_ids,
                delay: AUTO_ADVANCE_DELAY,
            };
            tracing::debug!(
                "Scheduled auto-advance #{} from step {}",
                token.id,
                token.step_index
            );
            self.pending_auto_advance = Some(token);
        }

        self.notify(&transition.signals);
        &self.state
    }

    fn notify(&mut self, signals: &[Signal]) {
        for &signal in signals {
            for observer in self.observers.iter_mut() {
                observer.on_signal(signal, &self.state);
            }
        }
    }

    /// Fire a deferred auto-advance
    ///
    /// Returns false, leaving the session untouched, when the token is not
    /// the pending one or the session has moved off its step.
    pub fn fire_auto_advance(&mut self, token: AutoAdvance) -> bool {
        if self.pending_auto_advance != Some(token) {
            tracing::debug!("Discarding stale auto-advance #{}", token.id);
            return false;
        }
        self.pending_auto_advance = None;

        if self.state.step_index() != token.step_index {
            tracing::debug!(
                "Discarding auto-advance #{}: issued for step {}, now on {}",
                token.id,
                token.step_index,
                self.state.step_index()
            );
            return false;
        }

        self.dispatch(Event::Next { auto_advance: true });
        true
    }

    /// One clock tick, routed to whichever stream is live
    pub fn tick(&mut self) {
        if let Some(event) = self.scheduler.active().tick_event() {
            self.dispatch(event);
        }
    }

    pub fn countdown_tick(&mut self) {
        self.dispatch(Event::CountdownTick);
    }

    pub fn session_tick(&mut self) {
        self.dispatch(Event::SessionTick);
    }

    pub fn start(&mut self) {
        self.dispatch(Event::Start);
    }

    pub fn pause(&mut self) {
        self.dispatch(Event::Pause);
    }

    pub fn resume(&mut self) {
        self.dispatch(Event::Resume);
    }

    pub fn toggle(&mut self) {
        self.dispatch(Event::Toggle);
    }

    pub fn reset(&mut self) {
        self.dispatch(Event::Reset);
    }

    pub fn next(&mut self, auto_advance: bool) {
        self.dispatch(Event::Next { auto_advance });
    }

    pub fn previous(&mut self) {
        self.dispatch(Event::Previous);
    }

    pub fn go_to(&mut self, index: usize) {
        self.dispatch(Event::GoTo(index));
    }

    pub fn restart(&mut self) {
        self.dispatch(Event::Restart);
    }

    pub fn view(&self) -> SessionView<'_> {
        let step = self.current_step();
        let remaining_seconds = step
            .and_then(ExpandedStep::duration)
            .map(|d| d.saturating_sub(self.state.elapsed_seconds()));

        SessionView {
            step,
            step_index: self.state.step_index(),
            total_steps: self.steps.len(),
            elapsed_seconds: self.state.elapsed_seconds(),
            remaining_seconds,
            countdown_seconds: self.state.countdown_seconds(),
            is_paused: self.state.is_paused(),
            timer_started: self.state.timer_started(),
            is_complete: self.state.is_complete(),
            progress_percent: progress_percent(self.state.step_index(), self.steps.len()),
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("steps", &self.steps.len())
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("pending_auto_advance", &self.pending_auto_advance)
            .finish()
    }
}

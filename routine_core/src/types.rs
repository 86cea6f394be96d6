//! Core domain types for the routine player.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises as authored in a routine
//! - Expanded steps, the unit the session walks
//! - Player settings read by the session state machine

use serde::{Deserialize, Serialize};

// ============================================================================
// Routine Input Types
// ============================================================================

/// What an exercise asks of the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExerciseKind {
    /// Hold or repeat for a fixed number of seconds per set
    Timed { duration: u32 },
    /// Free-text repetition target, e.g. "10 reps" or "8 each side"
    Reps { reps: String },
}

/// A single exercise as written by the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub section: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: ExerciseKind,
    pub sets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_between_sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_after_exercise: Option<u32>,
}

/// A complete routine as handed over by the configuration collaborator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Routine {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

// ============================================================================
// Expanded Step Types
// ============================================================================

/// Display kind of an expanded step. Rests are always `Timed`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Timed { duration: u32 },
    Reps { reps: String },
}

/// One card of the flattened routine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpandedStep {
    pub section: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: StepKind,
    /// Present only when the exercise was split into one card per set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feel: Option<String>,
    #[serde(default)]
    pub is_rest: bool,
    #[serde(default)]
    pub is_injected_rest: bool,
}

impl ExpandedStep {
    /// Build a rest card synthesized by the expander
    pub fn injected_rest(section: &str, duration: u32) -> Self {
        Self {
            section: section.to_string(),
            name: "Rest".to_string(),
            kind: StepKind::Timed { duration },
            set_number: None,
            total_sets: None,
            instructions: None,
            feel: None,
            is_rest: true,
            is_injected_rest: true,
        }
    }

    /// Duration in seconds, `None` for rep-based steps
    pub fn duration(&self) -> Option<u32> {
        match self.kind {
            StepKind::Timed { duration } => Some(duration),
            StepKind::Reps { .. } => None,
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self.kind, StepKind::Timed { .. })
    }

    /// Whether starting this step may go through the 3-2-1 pre-roll
    pub fn countdown_eligible(&self) -> bool {
        self.is_timed() && !self.is_rest
    }

    /// Set label shown under the exercise name
    ///
    /// - rests: empty
    /// - combined rep card: "3 sets of 10 reps"
    /// - per-set card: "Set 2 of 3"
    pub fn set_label(&self) -> String {
        if self.is_rest {
            return String::new();
        }

        match (&self.kind, self.set_number, self.total_sets) {
            (StepKind::Reps { reps }, None, Some(total)) => format!("{} sets of {}", total, reps),
            (_, Some(set), Some(total)) => format!("Set {} of {}", set, total),
            _ => String::new(),
        }
    }

    /// Short summary used in the timeline, e.g. "30s • Set 1/3" or "10 reps"
    pub fn timeline_meta(&self) -> String {
        match &self.kind {
            StepKind::Timed { duration } => match (self.set_number, self.total_sets) {
                (Some(set), Some(total)) if total > 1 => {
                    format!("{}s • Set {}/{}", duration, set, total)
                }
                _ => format!("{}s", duration),
            },
            StepKind::Reps { reps } => reps.clone(),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Player settings. The session reads these on every decision and never
/// writes them.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub sound_enabled: bool,
    #[serde(default)]
    pub countdown_enabled: bool,
    #[serde(default)]
    pub auto_advance_enabled: bool,
}

/// Partial settings change; `None` leaves the current value alone
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub sound_enabled: Option<bool>,
    pub countdown_enabled: Option<bool>,
    pub auto_advance_enabled: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.sound_enabled.is_none()
            && self.countdown_enabled.is_none()
            && self.auto_advance_enabled.is_none()
    }
}

impl Settings {
    /// Merge a partial update into these settings
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(v) = update.sound_enabled {
            self.sound_enabled = v;
        }
        if let Some(v) = update.countdown_enabled {
            self.countdown_enabled = v;
        }
        if let Some(v) = update.auto_advance_enabled {
            self.auto_advance_enabled = v;
        }
    }
}

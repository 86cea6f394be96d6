//! Routine expansion.
//!
//! Turns the compact exercise list of a routine into the flat sequence of
//! cards the session walks:
//! - Timed exercises always get one card per set
//! - Rep exercises are split per set only when `rest_between_sets` is given,
//!   otherwise they collapse into a single "N sets of ..." card
//! - Rests are injected between sets and after the exercise
//!
//! A rest value of 0 is treated the same as an absent one: no card is
//! injected, so a zero-length rest never shows up.

use crate::{Exercise, ExerciseKind, ExpandedStep, StepKind};

/// Expand exercises into individual steps with injected rest periods
pub fn expand_exercises(exercises: &[Exercise]) -> Vec<ExpandedStep> {
    let mut steps = Vec::new();

    for exercise in exercises {
        if exercise.sets == 0 {
            tracing::warn!("Exercise '{}' has no sets, skipping", exercise.name);
            continue;
        }

        let between = rest_seconds(exercise.rest_between_sets);

        match (&exercise.kind, between) {
            (ExerciseKind::Reps { reps }, None) => {
                steps.push(content_step(
                    exercise,
                    StepKind::Reps { reps: reps.clone() },
                    None,
                ));
            }
            (kind, between) => {
                let step_kind = match kind {
                    ExerciseKind::Timed { duration } => StepKind::Timed {
                        duration: *duration,
                    },
                    ExerciseKind::Reps { reps } => StepKind::Reps { reps: reps.clone() },
                };

                for set in 1..=exercise.sets {
                    steps.push(content_step(exercise, step_kind.clone(), Some(set)));

                    if let Some(rest) = between.filter(|_| set < exercise.sets) {
                        steps.push(ExpandedStep::injected_rest(&exercise.section, rest));
                    }
                }
            }
        }

        if let Some(rest) = rest_seconds(exercise.rest_after_exercise) {
            steps.push(ExpandedStep::injected_rest(&exercise.section, rest));
        }
    }

    tracing::info!(
        "Expanded {} exercises into {} steps",
        exercises.len(),
        steps.len()
    );

    steps
}

fn rest_seconds(value: Option<u32>) -> Option<u32> {
    value.filter(|&secs| secs > 0)
}

fn content_step(exercise: &Exercise, kind: StepKind, set_number: Option<u32>) -> ExpandedStep {
    ExpandedStep {
        section: exercise.section.clone(),
        name: exercise.name.clone(),
        kind,
        set_number,
        total_sets: Some(exercise.sets),
        instructions: exercise.instructions.clone(),
        feel: exercise.feel.clone(),
        is_rest: false,
        is_injected_rest: false,
    }
}

/// Format seconds as `M:SS`
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Sum of all timed step durations, rests included
pub fn total_duration(steps: &[ExpandedStep]) -> u32 {
    steps.iter().filter_map(ExpandedStep::duration).sum()
}

/// Progress through the routine as a percentage, counting the current step
pub fn progress_percent(step_index: usize, total_steps: usize) -> f64 {
    if total_steps == 0 {
        return 0.0;
    }
    ((step_index + 1) as f64 / total_steps as f64) * 100.0
}

/// Group step indices by section, preserving first-appearance order
pub fn group_by_section(steps: &[ExpandedStep]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        let section = if step.section.is_empty() {
            "Exercises"
        } else {
            step.section.as_str()
        };

        match groups.iter_mut().find(|(name, _)| name == section) {
            Some((_, indices)) => indices.push(index),
            None => groups.push((section.to_string(), vec![index])),
        }
    }

    groups
}

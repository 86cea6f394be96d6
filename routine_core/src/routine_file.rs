//! Routine files and the built-in routine.
//!
//! Routine files are TOML:
//!
//! ```toml
//! title = "Ankle rehab"
//! subtitle = "Daily"
//!
//! [[exercises]]
//! section = "Warm-up"
//! name = "Ankle circles"
//! type = "timed"
//! duration = 30
//! sets = 2
//! rest_between_sets = 10
//! ```
//!
//! This is the configuration collaborator: it rejects structurally broken
//! routines so the expander and the session only ever see valid input.

use crate::{Error, Exercise, ExerciseKind, Result, Routine};
use std::path::Path;

impl Routine {
    /// Parse routine TOML without validating it
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read, parse and validate a routine file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let routine = Self::parse(&contents)?;

        let errors = routine.validate();
        if !errors.is_empty() {
            tracing::warn!("Rejected routine {:?}: {} problems", path, errors.len());
            return Err(Error::Routine(errors.join("; ")));
        }

        tracing::info!(
            "Loaded routine '{}' ({} exercises) from {:?}",
            routine.title,
            routine.exercises.len(),
            path
        );
        Ok(routine)
    }

    /// Validate the routine and return a list of errors
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Missing required field: title".to_string());
        }
        if self.exercises.is_empty() {
            errors.push("Routine has no exercises".to_string());
        }

        for (i, exercise) in self.exercises.iter().enumerate() {
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise #{} missing name", i + 1));
            }
            let label = if exercise.name.is_empty() {
                format!("#{}", i + 1)
            } else {
                format!("\"{}\"", exercise.name)
            };

            if exercise.sets == 0 {
                errors.push(format!("Exercise {} must have at least one set", label));
            }
            match &exercise.kind {
                ExerciseKind::Timed { duration: 0 } => {
                    errors.push(format!("Exercise {} has a zero duration", label));
                }
                ExerciseKind::Reps { reps } if reps.trim().is_empty() => {
                    errors.push(format!("Exercise {} has empty reps", label));
                }
                _ => {}
            }
        }

        errors
    }
}

/// The routine played when no routine file is configured
pub fn default_routine() -> Routine {
    fn exercise(section: &str, name: &str, kind: ExerciseKind, sets: u32) -> Exercise {
        Exercise {
            section: section.into(),
            name: name.into(),
            kind,
            sets,
            instructions: None,
            feel: None,
            rest_between_sets: None,
            rest_after_exercise: None,
        }
    }

    Routine {
        title: "Ankle Routine".into(),
        subtitle: "Mobility, strength and balance".into(),
        exercises: vec![
            Exercise {
                instructions: Some("Draw slow circles with the toes, both directions".into()),
                rest_after_exercise: Some(10),
                ..exercise(
                    "Warm-up",
                    "Ankle circles",
                    ExerciseKind::Timed { duration: 30 },
                    2,
                )
            },
            Exercise {
                instructions: Some("Trace each letter with the big toe".into()),
                ..exercise(
                    "Warm-up",
                    "Alphabet tracing",
                    ExerciseKind::Reps {
                        reps: "A to Z".into(),
                    },
                    1,
                )
            },
            Exercise {
                instructions: Some("Rise onto the toes, lower over three seconds".into()),
                feel: Some("Calf working, no pain at the joint".into()),
                rest_between_sets: Some(30),
                ..exercise(
                    "Strength",
                    "Calf raises",
                    ExerciseKind::Reps {
                        reps: "15 reps".into(),
                    },
                    3,
                )
            },
            Exercise {
                instructions: Some("Loop a band round the forefoot and push down".into()),
                ..exercise(
                    "Strength",
                    "Banded plantar flexion",
                    ExerciseKind::Reps {
                        reps: "12 reps".into(),
                    },
                    2,
                )
            },
            Exercise {
                instructions: Some("Stand on one leg, eyes forward".into()),
                feel: Some("Small corrections through the foot".into()),
                rest_between_sets: Some(15),
                rest_after_exercise: Some(20),
                ..exercise(
                    "Balance",
                    "Single-leg stand",
                    ExerciseKind::Timed { duration: 45 },
                    2,
                )
            },
            exercise(
                "Cool-down",
                "Calf stretch",
                ExerciseKind::Timed { duration: 40 },
                1,
            ),
        ],
    }
}

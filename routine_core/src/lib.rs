#![forbid(unsafe_code)]

//! Core domain model and session logic for the routine player.
//!
//! This crate provides:
//! - Domain types (exercises, expanded steps, settings)
//! - Routine expansion into a flat step sequence
//! - The session state machine (countdown, timer, navigation)
//! - Tick routing and deferred auto-advance
//! - Collaborators: routine files, configuration, logging

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod expand;
pub mod session;
pub mod navigation;
pub mod scheduler;
pub mod signals;
pub mod controller;
pub mod routine_file;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use expand::{expand_exercises, format_time, group_by_section, total_duration};
pub use session::{Event, Phase, SessionState};
pub use scheduler::{ActiveTimer, AutoAdvance, TimerHandle, AUTO_ADVANCE_DELAY};
pub use signals::{ChannelObserver, SessionObserver, Signal};
pub use controller::{SessionController, SessionView};
pub use routine_file::default_routine;

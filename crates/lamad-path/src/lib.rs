//! Lamad Path - learning path model and progression
//!
//! A path is an ordered list of steps that unlock one at a time. Only step
//! completion is stored as truth; lock state and progress are recomputed from
//! it on every load via [`derive_statuses`] and [`progress_percent`].

pub mod error;
pub mod progression;
pub mod types;

pub use error::{ProgressionError, Result};
pub use progression::{
    complete_step, complete_step_at, derive_statuses, initial_statuses, is_path_complete,
    pause_step, progress_percent, start_step, StepCompletion,
};
pub use types::*;

//! Progression rejections

use thiserror::Error;

use crate::types::StepStatus;

/// Result type for progression operations
pub type Result<T> = std::result::Result<T, ProgressionError>;

/// Why a step transition was rejected. The input steps are never modified
/// when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressionError {
    /// No step with this id on the path
    #[error("Step not found: {0}")]
    StepNotFound(String),

    /// Predecessor not completed yet
    #[error("Step {0} is locked")]
    StepLocked(String),

    /// Completion is terminal
    #[error("Step {0} is already completed")]
    AlreadyCompleted(String),

    /// Transition not allowed from the step's derived status
    #[error("Step {step_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        step_id: String,
        from: StepStatus,
        to: StepStatus,
    },
}

impl ProgressionError {
    /// Whether the rejection is a state conflict rather than a missing step.
    pub fn is_conflict(&self) -> bool {
        !matches!(self, ProgressionError::StepNotFound(_))
    }
}

//! Sequential progression state machine.
//!
//! Steps unlock strictly in order:
//!
//! ```text
//! locked ──(predecessor completed)──▶ available ⇄ in-progress
//!                                         │            │
//!                                         └────────────┴──▶ completed (terminal)
//! ```
//!
//! All functions are pure: they read a slice and return a new vector, so
//! concurrent derivations from the same snapshot cannot interfere.

use chrono::{DateTime, Utc};

use crate::error::{ProgressionError, Result};
use crate::types::{LearningStep, StepStatus};

/// Outcome of a successful [`complete_step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepCompletion {
    pub steps: Vec<LearningStep>,
    /// `round(100 * completed / n)`
    pub progress: u8,
    /// Every step is now completed
    pub path_complete: bool,
}

/// Compute each step's status from the durable completion flags.
///
/// A completed step stays completed. Any other step is `available` when it is
/// first or its derived predecessor is completed, and `locked` otherwise. A
/// stored `in-progress` does not survive derivation. Idempotent.
pub fn derive_statuses(steps: &[LearningStep]) -> Vec<LearningStep> {
    gate(steps)
        .into_iter()
        .map(|step| match step.status {
            StepStatus::InProgress => LearningStep {
                status: StepStatus::Available,
                ..step
            },
            _ => step,
        })
        .collect()
}

/// Apply the lock rule, leaving `in-progress` on unlocked steps in place so
/// transitions can see work started on the same snapshot.
fn gate(steps: &[LearningStep]) -> Vec<LearningStep> {
    let mut gated = Vec::with_capacity(steps.len());
    let mut predecessor_completed = true;

    for step in steps {
        let status = match step.status {
            StepStatus::Completed => StepStatus::Completed,
            _ if !predecessor_completed => StepStatus::Locked,
            StepStatus::InProgress => StepStatus::InProgress,
            _ => StepStatus::Available,
        };
        predecessor_completed = status == StepStatus::Completed;
        gated.push(LearningStep {
            status,
            ..step.clone()
        });
    }

    gated
}

/// Statuses for a freshly created path: orders renumbered from 1, first step
/// available, everything else locked, no completion timestamps.
pub fn initial_statuses(steps: &[LearningStep]) -> Vec<LearningStep> {
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| LearningStep {
            order: index as u32 + 1,
            status: if index == 0 {
                StepStatus::Available
            } else {
                StepStatus::Locked
            },
            completed_at: None,
            ..step.clone()
        })
        .collect()
}

/// `round(100 * completed / n)`, half rounding up. Zero for an empty path.
pub fn progress_percent(steps: &[LearningStep]) -> u8 {
    let total = steps.len() as u64;
    if total == 0 {
        return 0;
    }
    let completed = steps.iter().filter(|s| s.is_completed()).count() as u64;
    ((200 * completed + total) / (2 * total)) as u8
}

/// True iff every step's derived status is completed.
pub fn is_path_complete(steps: &[LearningStep]) -> bool {
    derive_statuses(steps).iter().all(LearningStep::is_completed)
}

/// Complete `step_id` now. See [`complete_step_at`].
pub fn complete_step(steps: &[LearningStep], step_id: &str) -> Result<StepCompletion> {
    complete_step_at(steps, step_id, Utc::now())
}

/// Mark a step completed and unlock its immediate successor.
///
/// Rejected when the step is unknown, locked, or already completed. Only the
/// next step's lock state is touched; later steps are reconciled by
/// [`derive_statuses`] on the next load.
pub fn complete_step_at(
    steps: &[LearningStep],
    step_id: &str,
    at: DateTime<Utc>,
) -> Result<StepCompletion> {
    let index = position(steps, step_id)?;

    match gate(steps)[index].status {
        StepStatus::Locked => return Err(ProgressionError::StepLocked(step_id.to_string())),
        StepStatus::Completed => {
            return Err(ProgressionError::AlreadyCompleted(step_id.to_string()))
        }
        StepStatus::Available | StepStatus::InProgress => {}
    }

    let mut next = steps.to_vec();
    next[index].status = StepStatus::Completed;
    next[index].completed_at = Some(at);

    if let Some(following) = next.get_mut(index + 1) {
        if following.status == StepStatus::Locked {
            following.status = StepStatus::Available;
        }
    }

    let progress = progress_percent(&next);
    let path_complete = is_path_complete(&next);

    Ok(StepCompletion {
        steps: next,
        progress,
        path_complete,
    })
}

/// `available -> in-progress`
pub fn start_step(steps: &[LearningStep], step_id: &str) -> Result<Vec<LearningStep>> {
    transition(steps, step_id, StepStatus::InProgress)
}

/// `in-progress -> available`
pub fn pause_step(steps: &[LearningStep], step_id: &str) -> Result<Vec<LearningStep>> {
    transition(steps, step_id, StepStatus::Available)
}

fn transition(steps: &[LearningStep], step_id: &str, to: StepStatus) -> Result<Vec<LearningStep>> {
    let index = position(steps, step_id)?;
    let mut next = gate(steps);
    let from = next[index].status;

    if !from.can_transition_to(to) {
        return Err(match from {
            StepStatus::Locked => ProgressionError::StepLocked(step_id.to_string()),
            StepStatus::Completed => ProgressionError::AlreadyCompleted(step_id.to_string()),
            _ => ProgressionError::InvalidTransition {
                step_id: step_id.to_string(),
                from,
                to,
            },
        });
    }

    next[index].status = to;
    Ok(next)
}

fn position(steps: &[LearningStep], step_id: &str) -> Result<usize> {
    steps
        .iter()
        .position(|s| s.id == step_id)
        .ok_or_else(|| ProgressionError::StepNotFound(step_id.to_string()))
}

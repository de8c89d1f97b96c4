//! Learning path data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::{derive_statuses, initial_statuses, is_path_complete, progress_percent};

/// Status of a single step.
///
/// Only `Completed` is durable; the other states are re-derived from the
/// completion flags of preceding steps whenever a path is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    #[default]
    Locked,
    Available,
    InProgress,
    Completed,
}

impl StepStatus {
    /// Whether the learner may work on a step in this state.
    pub fn is_unlocked(&self) -> bool {
        !matches!(self, StepStatus::Locked)
    }

    /// Caller-driven transitions. `Locked -> Available` is not listed here
    /// because only a predecessor's completion may cause it.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Available, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::Available)
                | (StepStatus::Available, StepStatus::Completed)
                | (StepStatus::InProgress, StepStatus::Completed)
        )
    }
}

/// Path lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStatus {
    #[default]
    Active,
    Completed,
    Paused,
}

/// Kind of learning resource attached to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Video,
    Article,
    Course,
    Book,
    Exercise,
    Documentation,
    #[serde(other)]
    Other,
}

/// Difficulty level of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// Immutable reference to external learning material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// One step of a learning path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStep {
    pub id: String,
    /// 1-based, matches the position in the path
    pub order: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl LearningStep {
    pub fn new(order: u32, title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            order,
            title: title.into(),
            description: None,
            status: StepStatus::Locked,
            completed_at: None,
            resources: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Total estimated time across resources.
    pub fn duration_minutes(&self) -> u32 {
        self.resources.iter().map(|r| r.duration_minutes).sum()
    }
}

/// A learner's path through a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub steps: Vec<LearningStep>,
    /// 0..=100
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub status: PathStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearningPath {
    /// Create a fresh path. Step order and statuses are normalized: the first
    /// step is available and the rest are locked.
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>, steps: Vec<LearningStep>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name: name.into(),
            description: None,
            topic: None,
            steps: initial_statuses(&steps),
            progress: 0,
            status: PathStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Re-derive step statuses and progress from the durable completion
    /// flags. Called on every load; stored lock state is never trusted.
    pub fn refresh(&mut self) {
        self.steps = derive_statuses(&self.steps);
        self.progress = progress_percent(&self.steps);
        if !self.steps.is_empty() && is_path_complete(&self.steps) {
            self.status = PathStatus::Completed;
        }
    }

    /// Consuming form of [`refresh`](Self::refresh).
    pub fn refreshed(mut self) -> Self {
        self.refresh();
        self
    }

    pub fn step(&self, step_id: &str) -> Option<&LearningStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    /// First step that is unlocked but not completed.
    pub fn current_step(&self) -> Option<&LearningStep> {
        self.steps
            .iter()
            .find(|s| s.status.is_unlocked() && !s.is_completed())
    }
}

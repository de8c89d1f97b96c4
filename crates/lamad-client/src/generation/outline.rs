//! Path outlines produced by the generator

use lamad_path::{Difficulty, LearningStep, Resource, ResourceKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::extract::parse_json_object;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOutline {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutline {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceOutline>,
}

/// Structure the generator is asked to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOutline {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<StepOutline>,
}

impl PathOutline {
    /// Deterministic outline used when the generator output is unusable.
    pub fn fallback(topic: &str) -> Self {
        let step = |title: String, description: &str, kind: ResourceKind, minutes: u32, difficulty| StepOutline {
            title,
            description: Some(description.to_string()),
            resources: vec![ResourceOutline {
                kind,
                title: None,
                url: format!(
                    "https://www.google.com/search?q={}",
                    topic.trim().replace(' ', "+")
                ),
                duration_minutes: minutes,
                difficulty,
            }],
        };

        Self {
            name: format!("Learning path: {}", topic.trim()),
            description: Some(format!("A starter path for learning {}.", topic.trim())),
            steps: vec![
                step(
                    format!("Introduction to {}", topic.trim()),
                    "Get an overview of the core ideas and vocabulary.",
                    ResourceKind::Article,
                    30,
                    Difficulty::Beginner,
                ),
                step(
                    format!("{} fundamentals", topic.trim()),
                    "Work through the fundamental concepts in depth.",
                    ResourceKind::Video,
                    60,
                    Difficulty::Beginner,
                ),
                step(
                    format!("Hands-on {} practice", topic.trim()),
                    "Apply what you learned in small exercises.",
                    ResourceKind::Exercise,
                    90,
                    Difficulty::Intermediate,
                ),
                step(
                    format!("Build a {} project", topic.trim()),
                    "Consolidate the material by building something end to end.",
                    ResourceKind::Exercise,
                    180,
                    Difficulty::Advanced,
                ),
            ],
        }
    }

    /// Steps with fresh ids, ready to be placed on a path.
    pub fn into_steps(self) -> Vec<LearningStep> {
        self.steps
            .into_iter()
            .enumerate()
            .map(|(index, outline)| {
                let step = LearningStep::new(index as u32 + 1, outline.title);
                let resources = outline
                    .resources
                    .into_iter()
                    .enumerate()
                    .map(|(r, res)| Resource {
                        id: format!("{}-r{}", step.id, r + 1),
                        kind: res.kind,
                        title: res.title,
                        url: res.url,
                        duration_minutes: res.duration_minutes,
                        difficulty: res.difficulty,
                    })
                    .collect();
                let step = step.with_resources(resources);
                match outline.description {
                    Some(description) => step.with_description(description),
                    None => step,
                }
            })
            .collect()
    }
}

/// Parse generator output, falling back to [`PathOutline::fallback`] when no
/// usable outline can be extracted. The flag reports whether the fallback was
/// used.
pub fn parse_outline_or_fallback(raw: &str, topic: &str) -> (PathOutline, bool) {
    match parse_json_object::<PathOutline>(raw) {
        Ok(outline) if !outline.steps.is_empty() && !outline.name.trim().is_empty() => {
            (outline, false)
        }
        Ok(_) => {
            warn!(topic, "generated outline is empty, using fallback");
            (PathOutline::fallback(topic), true)
        }
        Err(e) => {
            warn!(topic, error = %e, "generated outline unparseable, using fallback");
            (PathOutline::fallback(topic), true)
        }
    }
}

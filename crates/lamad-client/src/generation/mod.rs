//! Text-generation collaborator.
//!
//! The service returns free text that usually, but not always, contains a
//! JSON object. [`extract`] pulls out the first balanced object and
//! [`outline`] turns it into a path outline, substituting a deterministic
//! default when the text cannot be parsed.

pub mod extract;
pub mod mock;
pub mod outline;

pub use extract::{extract_json_object, parse_json_object};
pub use mock::MockGenerator;
pub use outline::{parse_outline_or_fallback, PathOutline, ResourceOutline, StepOutline};

use async_trait::async_trait;
use lamad_sync::LamadError;

/// Text-generation errors
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Service is not reachable
    #[error("Generator unavailable: {0}")]
    Unavailable(String),
}

impl From<GenerationError> for LamadError {
    fn from(err: GenerationError) -> Self {
        LamadError::Unknown(err.to_string())
    }
}

/// Turns a prompt into raw text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
